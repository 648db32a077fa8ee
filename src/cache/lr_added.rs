use std::collections::{HashSet, VecDeque};

use crate::protocol::ObjectId;

/// Evicts objects in the order they were admitted
///
/// Re-accessing a resident object does not change its position. Removal
/// scans the admission queue.
pub struct LrAdded {
    max_size: usize,
    resident: HashSet<ObjectId>,
    order: VecDeque<ObjectId>
}

impl LrAdded {
    pub fn new(max_size: usize) -> LrAdded {
        LrAdded {
            max_size,
            resident: HashSet::new(),
            order: VecDeque::new()
        }
    }

    pub fn get(&mut self, oid: ObjectId) -> Vec<ObjectId> {
        if !self.resident.insert(oid) {
            return Vec::new();
        }
        self.order.push_back(oid);

        let mut evicted = Vec::new();
        while self.resident.len() > self.max_size {
            match self.order.pop_front() {
                Some(victim) => {
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
            if let Some(idx) = self.order.iter().position(|o| *o == oid) {
                self.order.remove(idx);
            }
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
    fn fifo_order() {
        let mut p = LrAdded::new(3);
        for oid in 1 ..= 3 {
            assert!(p.get(oid).is_empty());
        }
        p.get(1);
        assert_eq!(p.get(4), vec![1]);
        assert_eq!(p.get(5), vec![2]);
        assert!(p.contains(3));
        assert!(!p.contains(1));
    }

    #[test]
    fn removal_frees_a_slot() {
        let mut p = LrAdded::new(2);
        p.get(1);
        p.get(2);
        p.remove(1);
        p.remove(9);
        assert_eq!(p.len(), 1);
        assert!(p.get(3).is_empty());
        assert_eq!(p.get(4), vec![2]);
    }
}
