//! Adaptive replacement cache.
//!
//! Resident entries live in two recency lists: `t1` for keys seen once and
//! `t2` for keys seen at least twice. Two ghost lists (`b1`, `b2`) remember
//! keys recently evicted from each side. A hit in a ghost list moves the
//! target size `p` of `t1` towards the side that would have kept it.

use lru::LruCache;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Slot {
    value: Arc<[u8]>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            // A deadline past what Instant can represent never expires.
            expires_at: (!ttl.is_zero())
                .then(|| Instant::now().checked_add(ttl))
                .flatten(),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub(crate) struct AdaptiveCache {
    capacity: usize,
    p: usize,
    t1: LruCache<String, Slot>,
    t2: LruCache<String, Slot>,
    b1: LruCache<String, ()>,
    b2: LruCache<String, ()>,
}

impl AdaptiveCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            p: 0,
            t1: LruCache::unbounded(),
            t2: LruCache::unbounded(),
            b1: LruCache::unbounded(),
            b2: LruCache::unbounded(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.t1.len() + self.t2.len()
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<Arc<[u8]>> {
        let now = Instant::now();

        if let Some(slot) = self.t1.pop(key) {
            if slot.is_expired(now) {
                return None;
            }
            let value = slot.value.clone();
            self.t2.put(key.to_string(), slot);
            return Some(value);
        }

        let expired = match self.t2.get(key) {
            Some(slot) if !slot.is_expired(now) => return Some(slot.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.t2.pop(key);
        }
        None
    }

    pub(crate) fn set(&mut self, key: &str, value: Vec<u8>, ttl: Duration) {
        let slot = Slot::new(value, ttl);

        // Resident: refresh and promote.
        if self.t1.pop(key).is_some() || self.t2.contains(key) {
            self.t2.put(key.to_string(), slot);
            return;
        }

        // Ghost hit on the recency side: grow t1's target.
        if self.b1.contains(key) {
            let delta = (self.b2.len() / self.b1.len()).max(1);
            self.p = (self.p + delta).min(self.capacity);
            self.b1.pop(key);
            if self.is_full() {
                self.replace(false);
            }
            self.t2.put(key.to_string(), slot);
            return;
        }

        // Ghost hit on the frequency side: shrink t1's target.
        if self.b2.contains(key) {
            let delta = (self.b1.len() / self.b2.len()).max(1);
            self.p = self.p.saturating_sub(delta);
            self.b2.pop(key);
            if self.is_full() {
                self.replace(true);
            }
            self.t2.put(key.to_string(), slot);
            return;
        }

        // New key.
        let l1 = self.t1.len() + self.b1.len();
        if l1 >= self.capacity {
            if self.t1.len() < self.capacity {
                self.b1.pop_lru();
                if self.is_full() {
                    self.replace(false);
                }
            } else {
                self.t1.pop_lru();
            }
        } else {
            let total = l1 + self.t2.len() + self.b2.len();
            if total >= self.capacity {
                if total >= 2 * self.capacity {
                    self.b2.pop_lru();
                }
                if self.is_full() {
                    self.replace(false);
                }
            }
        }
        self.t1.put(key.to_string(), slot);
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    fn replace(&mut self, hit_in_b2: bool) {
        let t1_len = self.t1.len();
        let from_t1 = t1_len > 0 && (t1_len > self.p || (hit_in_b2 && t1_len == self.p));

        if from_t1 || self.t2.is_empty() {
            if let Some((key, _)) = self.t1.pop_lru() {
                self.b1.put(key, ());
            }
        } else if let Some((key, _)) = self.t2.pop_lru() {
            self.b2.put(key, ());
        }
    }

    pub(crate) fn clear(&mut self) {
        self.p = 0;
        self.t1.clear();
        self.t2.clear();
        self.b1.clear();
        self.b2.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(cache: &mut AdaptiveCache, key: &str) {
        cache.set(key, key.as_bytes().to_vec(), Duration::ZERO);
    }

    #[test]
    fn test_capacity_bound() {
        let mut cache = AdaptiveCache::new(4);
        for i in 0..100 {
            set(&mut cache, &format!("k{i}"));
            assert!(cache.len() <= 4);
        }
        assert!(cache.b1.len() + cache.t1.len() <= 4);
        assert!(cache.len() + cache.b1.len() + cache.b2.len() <= 8);
    }

    #[test]
    fn test_frequent_keys_survive_scan() {
        let mut cache = AdaptiveCache::new(4);
        set(&mut cache, "hot1");
        set(&mut cache, "hot2");
        assert!(cache.get("hot1").is_some());
        assert!(cache.get("hot2").is_some());

        for i in 0..20 {
            set(&mut cache, &format!("scan{i}"));
        }

        assert_eq!(cache.get("hot1").as_deref(), Some(&b"hot1"[..]));
        assert_eq!(cache.get("hot2").as_deref(), Some(&b"hot2"[..]));
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let mut cache = AdaptiveCache::new(2);
        cache.set("k", b"one".to_vec(), Duration::ZERO);
        cache.set("k", b"two".to_vec(), Duration::ZERO);
        assert_eq!(cache.get("k").as_deref(), Some(&b"two"[..]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ghost_hit_adapts_target() {
        let mut cache = AdaptiveCache::new(2);
        set(&mut cache, "a");
        set(&mut cache, "b");
        assert!(cache.get("a").is_some());
        set(&mut cache, "c");
        assert!(cache.b1.contains("b"));

        set(&mut cache, "b");
        assert_eq!(cache.p, 1);
        assert!(cache.t2.contains("b"));
        assert!(cache.b2.contains("a"));
        assert!(cache.t1.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unrepresentable_deadline_never_expires() {
        let mut cache = AdaptiveCache::new(2);
        cache.set("k", b"v".to_vec(), Duration::MAX);
        assert_eq!(cache.get("k").as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let mut cache = AdaptiveCache::new(2);
        cache.set("k", b"v".to_vec(), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
    }
}
