//! Request handler backed by the registered memory pool
//!
//! The pool is created by the first request the handler sees, whatever its
//! type. If creation fails every later Alloc is answered with a zeroed
//! acknowledgement.
//!
//! Keyed allocations are shared. Every Alloc naming the key takes a hold on
//! the region for the requesting connection and every Dealloc gives one back.
//! The region is freed when the last hold is returned. Holds of a connection
//! that goes away are dropped but the region itself survives, so a later
//! client can re-acquire it by key. A re-acquire asking for more bytes than
//! the region holds is refused.

use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::transport::{ConnId, Transport};
use super::pool::{MemoryPool, PoolStats};
use super::{AllocReply, Context, RequestHandler};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Allocation {
    id: u64,
    offset: usize,
    size: u64,
    key: Option<String>,
    owner: ConnId,
    holds: HashMap<ConnId, u32>
}

enum PoolSlot {
    Uninitialized,
    Ready(MemoryPool),
    Failed
}

pub struct StoreHandler {
    pool_size: usize,
    pool: PoolSlot,
    next_id: u64,
    allocations: HashMap<u64, Allocation>,
    by_addr: HashMap<u64, u64>,
    by_key: HashMap<String, u64>
}

impl StoreHandler {
    pub fn new(pool_size: usize) -> StoreHandler {
        StoreHandler {
            pool_size,
            pool: PoolSlot::Uninitialized,
            next_id: 1,
            allocations: HashMap::new(),
            by_addr: HashMap::new(),
            by_key: HashMap::new()
        }
    }

    fn ensure_pool(&mut self, transport: &dyn Transport) {
        if let PoolSlot::Uninitialized = self.pool {
            self.pool = match MemoryPool::create(transport, self.pool_size) {
                Ok(p) => PoolSlot::Ready(p),
                Err(e) => {
                    error!("Failed to create memory pool of {} bytes: {}", self.pool_size, e);
                    PoolSlot::Failed
                }
            };
        }
    }

    fn reply_for(pool: &MemoryPool, a: &Allocation) -> AllocReply {
        AllocReply {
            mr_id: a.id,
            remote_addr: pool.remote_addr(a.offset),
            peer_capability: pool.region().rkey as u64
        }
    }

    fn release(&mut self, id: u64) -> bool {
        let pool = match &mut self.pool {
            PoolSlot::Ready(p) => p,
            _ => return false
        };
        let a = match self.allocations.remove(&id) {
            Some(a) => a,
            None => return false
        };

        self.by_addr.remove(&pool.remote_addr(a.offset));
        if let Some(k) = &a.key {
            self.by_key.remove(k);
        }
        if let Err(e) = pool.release(a.offset) {
            warn!("Allocation {} was not live in the pool: {}", id, e);
        }
        debug!("Released allocation {} ({} bytes)", id, a.size);
        true
    }
}

impl RequestHandler for StoreHandler {
    fn prepare(&mut self, ctx: &Context) {
        self.ensure_pool(ctx.transport);
    }

    fn alloc(&mut self, ctx: &Context, size: u64, key: &str) -> AllocReply {
        let pool = match &mut self.pool {
            PoolSlot::Ready(p) => p,
            _ => return AllocReply::default()
        };

        if let Some(id) = self.by_key.get(key) {
            if let Some(a) = self.allocations.get_mut(id) {
                if size > a.size {
                    warn!("{} asked for {} bytes of keyed allocation {:?} which holds {}",
                        ctx.conn, size, key, a.size);
                    return AllocReply::default();
                }
                *a.holds.entry(ctx.conn).or_insert(0) += 1;
                debug!("{} re-acquired keyed allocation {:?}", ctx.conn, key);
                return StoreHandler::reply_for(pool, a);
            }
        }

        let block = match pool.allocate(size) {
            Ok(b) => b,
            Err(e) => {
                warn!("{} allocation of {} bytes failed: {}", ctx.conn, size, e);
                return AllocReply::default();
            }
        };

        let id = self.next_id;
        self.next_id += 1;

        let mut a = Allocation {
            id,
            offset: block.offset,
            size,
            key: if key.is_empty() { None } else { Some(key.to_string()) },
            owner: ctx.conn,
            holds: HashMap::new()
        };
        if a.key.is_some() {
            a.holds.insert(ctx.conn, 1);
        }
        let reply = StoreHandler::reply_for(pool, &a);

        self.by_addr.insert(reply.remote_addr, id);
        if let Some(k) = &a.key {
            self.by_key.insert(k.clone(), id);
        }
        self.allocations.insert(id, a);
        reply
    }

    fn dealloc(&mut self, ctx: &Context, addr: u64) -> bool {
        let id = match self.by_addr.get(&addr) {
            Some(id) => *id,
            None => {
                debug!("{} deallocated unknown address {:#x}", ctx.conn, addr);
                return false;
            }
        };
        let a = match self.allocations.get_mut(&id) {
            Some(a) => a,
            None => return false
        };

        if a.key.is_some() {
            match a.holds.get(&ctx.conn).cloned().unwrap_or(0) {
                // Regions whose holders have all gone away may be freed by anyone
                0 if a.holds.is_empty() => (),
                0 => {
                    debug!("{} holds no share of keyed allocation {}", ctx.conn, id);
                    return false;
                },
                1 => {
                    a.holds.remove(&ctx.conn);
                },
                n => {
                    a.holds.insert(ctx.conn, n - 1);
                }
            }
            if !a.holds.is_empty() {
                debug!("{} returned a hold on allocation {}, {} holders remain", ctx.conn, id, a.holds.len());
                return true;
            }
        }

        self.release(id)
    }

    fn disconnected(&mut self, ctx: &Context) {
        for a in self.allocations.values_mut() {
            a.holds.remove(&ctx.conn);
        }

        let owned: Vec<u64> = self.allocations.values()
            .filter(|a| a.owner == ctx.conn && a.key.is_none())
            .map(|a| a.id)
            .collect();

        if !owned.is_empty() {
            info!("Releasing {} allocations held by {}", owned.len(), ctx.conn);
        }
        for id in owned {
            self.release(id);
        }
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        match &self.pool {
            PoolSlot::Ready(p) => Some(p.stats()),
            _ => None
        }
    }

    fn shutdown(&mut self, transport: &dyn Transport) {
        self.allocations.clear();
        self.by_addr.clear();
        self.by_key.clear();
        if let PoolSlot::Ready(p) = std::mem::replace(&mut self.pool, PoolSlot::Failed) {
            p.close(transport);
        }
    }
}
