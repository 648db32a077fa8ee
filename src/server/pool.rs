//! Registered memory pool
//!
//! The pool is a single page-aligned buffer registered once with the
//! transport. Requests are carved out of it first-fit. Released blocks are
//! merged with free neighbours so the free list never holds two adjacent
//! ranges.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{info, warn};

use crate::transport::{AccessFlags, AlignedBuffer, MemoryRegion, Transport, TransportError};

/// Allocation sizes are rounded up to a multiple of this
pub const GRANULE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub capacity: u64,
    pub allocated: u64,
    pub live_allocations: usize
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    Exhausted {
        requested: u64
    },
    UnknownBlock(usize),
    Creation(TransportError)
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Exhausted{requested} => write!(f, "Exhausted(requested:{})", requested),
            PoolError::UnknownBlock(o) => write!(f, "UnknownBlock(offset:{})", o),
            PoolError::Creation(e) => write!(f, "Creation({})", e),
        }
    }
}

impl std::error::Error for PoolError {}

impl From<TransportError> for PoolError {
    fn from(e: TransportError) -> PoolError {
        PoolError::Creation(e)
    }
}

/// A reserved range within the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub offset: usize,
    pub len: usize
}

fn round_up(size: u64) -> Option<usize> {
    let size = if size == 0 { 1 } else { size };
    let g = GRANULE as u64;
    let rounded = size.checked_add(g - 1)? / g * g;
    if rounded > usize::max_value() as u64 {
        None
    } else {
        Some(rounded as usize)
    }
}

/// First-fit allocator over the offsets `[0, capacity)`
#[derive(Debug)]
pub struct FreeList {
    capacity: usize,
    free: BTreeMap<usize, usize>,
    live: HashMap<usize, usize>,
    allocated: usize
}

impl FreeList {
    pub fn new(capacity: usize) -> FreeList {
        let mut free = BTreeMap::new();
        if capacity > 0 {
            free.insert(0, capacity);
        }
        FreeList {
            capacity,
            free,
            live: HashMap::new(),
            allocated: 0
        }
    }

    pub fn allocate(&mut self, size: u64) -> Result<Block, PoolError> {
        let len = match round_up(size) {
            Some(n) => n,
            None => return Err(PoolError::Exhausted{ requested: size })
        };

        let found = self.free.iter().find(|(_, flen)| **flen >= len).map(|(o, l)| (*o, *l));

        match found {
            None => Err(PoolError::Exhausted{ requested: size }),
            Some((offset, flen)) => {
                self.free.remove(&offset);
                if flen > len {
                    self.free.insert(offset + len, flen - len);
                }
                self.live.insert(offset, len);
                self.allocated += len;
                Ok(Block { offset, len })
            }
        }
    }

    pub fn release(&mut self, offset: usize) -> Result<(), PoolError> {
        let len = match self.live.remove(&offset) {
            Some(l) => l,
            None => return Err(PoolError::UnknownBlock(offset))
        };
        self.allocated -= len;

        let mut start = offset;
        let mut end = offset + len;

        let prev = self.free.range(..offset).next_back().map(|(o, l)| (*o, *l));
        if let Some((poff, plen)) = prev {
            if poff + plen == offset {
                self.free.remove(&poff);
                start = poff;
            }
        }

        if let Some(nlen) = self.free.remove(&end) {
            end += nlen;
        }

        self.free.insert(start, end - start);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    pub fn free_ranges(&self) -> usize {
        self.free.len()
    }
}

/// Pool buffer plus its registration
pub struct MemoryPool {
    buffer: AlignedBuffer,
    region: MemoryRegion,
    blocks: FreeList
}

impl MemoryPool {
    pub fn create(transport: &dyn Transport, size: usize) -> Result<MemoryPool, PoolError> {
        let mut buffer = AlignedBuffer::new(size)?;
        let access = AccessFlags::LOCAL_WRITE | AccessFlags::REMOTE_READ | AccessFlags::REMOTE_WRITE;
        let region = unsafe { transport.register_memory(buffer.as_mut_ptr(), size, access)? };

        info!("Created memory pool of {} bytes at {:#x}", size, region.addr);

        Ok(MemoryPool {
            buffer,
            region,
            blocks: FreeList::new(size)
        })
    }

    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }

    pub fn allocate(&mut self, size: u64) -> Result<Block, PoolError> {
        self.blocks.allocate(size)
    }

    pub fn release(&mut self, offset: usize) -> Result<(), PoolError> {
        self.blocks.release(offset)
    }

    /// Address at which the block is visible to remote peers
    pub fn remote_addr(&self, block_offset: usize) -> u64 {
        self.buffer.addr() + block_offset as u64
    }

    /// Pool offset of a remote address, if it falls within the pool
    pub fn offset_of(&self, remote_addr: u64) -> Option<usize> {
        let base = self.buffer.addr();
        if remote_addr >= base && remote_addr < base + self.buffer.len() as u64 {
            Some((remote_addr - base) as usize)
        } else {
            None
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.blocks.capacity() as u64,
            allocated: self.blocks.allocated() as u64,
            live_allocations: self.blocks.live_allocations()
        }
    }

    /// Deregisters the pool. The buffer is freed when the pool is dropped.
    pub fn close(self, transport: &dyn Transport) {
        if let Err(e) = transport.deregister_memory(&self.region) {
            warn!("Failed to deregister memory pool: {}", e);
        }
    }
}
