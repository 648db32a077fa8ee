//! Sequential reads through the cache with read-ahead
//!
//! Before each object is returned the next `read_ahead` objects of the
//! iteration are prefetched, so a scan finds them resident when it gets
//! there. A failed prefetch is logged and retried by the get that reaches it.

use log::{debug, warn};

use crate::protocol::ObjectId;
use super::{CacheError, CacheManager, ObjectStore};

enum Order {
    /// Every id from `first` through `last` inclusive
    Range { first: ObjectId, last: ObjectId },
    /// Ids in the caller's order
    List(Vec<ObjectId>)
}

impl Order {
    fn id(&self, index: u64) -> Option<ObjectId> {
        match self {
            Order::Range { first, last } => {
                if first <= last && index <= last - first {
                    Some(first + index)
                } else {
                    None
                }
            },
            Order::List(ids) => ids.get(index as usize).cloned()
        }
    }
}

pub struct ReadAhead<'a, S: ObjectStore> {
    cache: &'a CacheManager<S>,
    order: Order,
    read_ahead: u64,
    next: u64,
    /// Index one past the last prefetch issued
    prefetched: u64
}

impl<'a, S: ObjectStore> ReadAhead<'a, S> {
    fn new(cache: &'a CacheManager<S>, order: Order, read_ahead: usize) -> ReadAhead<'a, S> {
        // A window as large as the cache would evict the object about to be read
        let limit = cache.max_size().saturating_sub(1);
        if read_ahead > limit {
            debug!("Read-ahead of {} reduced to {} for a cache of {}", read_ahead, limit, cache.max_size());
        }
        ReadAhead {
            cache,
            order,
            read_ahead: read_ahead.min(limit) as u64,
            next: 0,
            prefetched: 0
        }
    }

    /// Iterates `first..=last`. Empty when `first > last`.
    pub fn range(cache: &'a CacheManager<S>, first: ObjectId, last: ObjectId, read_ahead: usize) -> ReadAhead<'a, S> {
        ReadAhead::new(cache, Order::Range { first, last }, read_ahead)
    }

    /// Iterates the given ids in the given order
    pub fn ordered(cache: &'a CacheManager<S>, ids: Vec<ObjectId>, read_ahead: usize) -> ReadAhead<'a, S> {
        ReadAhead::new(cache, Order::List(ids), read_ahead)
    }

    fn fill_window(&mut self) {
        let start = self.prefetched.max(self.next + 1);
        let end = self.next.saturating_add(self.read_ahead);
        let mut index = start;
        while index <= end {
            let oid = match self.order.id(index) {
                Some(oid) => oid,
                None => break
            };
            if let Err(e) = self.cache.prefetch(oid) {
                warn!("Read-ahead of object {} failed: {}", oid, e);
            }
            index += 1;
        }
        self.prefetched = self.prefetched.max(index);
    }
}

impl<'a, S: ObjectStore> Iterator for ReadAhead<'a, S> {
    type Item = Result<(ObjectId, Vec<u8>), CacheError>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = self.order.id(self.next)?;
        self.fill_window();
        self.next += 1;
        Some(self.cache.get(oid).map(|data| (oid, data)))
    }
}

impl<S: ObjectStore> CacheManager<S> {
    /// Reads `first..=last` in id order, prefetching `read_ahead` objects ahead
    pub fn scan(&self, first: ObjectId, last: ObjectId, read_ahead: usize) -> ReadAhead<'_, S> {
        ReadAhead::range(self, first, last, read_ahead)
    }
}
