use std::collections::HashSet;

use lru_cache::LruCache;

use crate::protocol::ObjectId;

/// Evicts the least recently accessed object
pub struct Lru {
    max_size: usize,
    // Sized one past max_size so insertion never drops an entry on its own.
    // Victims are chosen explicitly so they can be reported.
    cache: LruCache<ObjectId, ()>,
    // Lookups on the cache itself promote the entry
    resident: HashSet<ObjectId>
}

impl Lru {
    pub fn new(max_size: usize) -> Lru {
        Lru {
            max_size,
            cache: LruCache::new(max_size + 1),
            resident: HashSet::new()
        }
    }

    pub fn get(&mut self, oid: ObjectId) -> Vec<ObjectId> {
        if self.cache.get_mut(&oid).is_some() {
            return Vec::new();
        }
        self.cache.insert(oid, ());
        self.resident.insert(oid);

        let mut evicted = Vec::new();
        while self.cache.len() > self.max_size {
            match self.cache.remove_lru() {
                Some((victim, _)) => {
                    self.resident.remove(&victim);
                    evicted.push(victim);
                },
                None => break
            }
        }
        evicted
    }

    pub fn remove(&mut self, oid: ObjectId) {
        if self.resident.remove(&oid) {
            self.cache.remove(&oid);
        }
    }

    pub fn contains(&self, oid: ObjectId) -> bool {
        self.resident.contains(&oid)
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_refreshes() {
        let mut p = Lru::new(3);
        for oid in 1 ..= 3 {
            assert!(p.get(oid).is_empty());
        }
        p.get(1);
        assert_eq!(p.get(4), vec![2]);
        assert_eq!(p.get(5), vec![3]);
        assert!(p.contains(1));
        assert!(!p.contains(2));
    }

    #[test]
    fn removal_frees_a_slot() {
        let mut p = Lru::new(2);
        p.get(1);
        p.get(2);
        p.remove(2);
        assert_eq!(p.len(), 1);
        assert!(p.get(3).is_empty());
        assert_eq!(p.get(4), vec![1]);
    }
}
