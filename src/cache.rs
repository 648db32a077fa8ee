//! Client-side object cache
//!
//! An `EvictionPolicy` tracks which objects are resident and chooses victims
//! when an admission would exceed its capacity. `CacheManager` keeps the
//! cached bytes and fronts an `ObjectStore`. `ReadAhead` scans a range of
//! objects through a manager, prefetching ahead of the reader.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::client::ClientError;
use crate::protocol::ObjectId;
use crate::storage::StorageError;

pub mod iter;
pub mod lr_added;
pub mod lru;
pub mod manager;

pub use iter::ReadAhead;
pub use manager::CacheManager;

#[derive(Debug)]
pub enum CacheError {
    /// A cache must be able to hold at least one object
    CacheCapacity,
    NoSuchId(ObjectId),
    Client(ClientError),
    Storage(StorageError)
}

impl CacheError {
    pub(crate) fn from_client(oid: ObjectId, e: ClientError) -> CacheError {
        match e {
            ClientError::NoSuchId => CacheError::NoSuchId(oid),
            e => CacheError::Client(e)
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::CacheCapacity => write!(f, "CacheCapacity"),
            CacheError::NoSuchId(oid) => write!(f, "NoSuchId({})", oid),
            CacheError::Client(e) => write!(f, "Client({})", e),
            CacheError::Storage(e) => write!(f, "Storage({})", e),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<ClientError> for CacheError {
    fn from(e: ClientError) -> CacheError {
        CacheError::Client(e)
    }
}

impl From<StorageError> for CacheError {
    fn from(e: StorageError) -> CacheError {
        CacheError::Storage(e)
    }
}

/// Remote object access fronted by the cache
pub trait ObjectStore: Send + Sync {
    fn get(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError>;

    fn put(&self, oid: ObjectId, data: &[u8]) -> Result<(), CacheError>;

    fn remove(&self, oid: ObjectId) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Evicts the earliest admitted object
    LRAdded,
    /// Evicts the least recently accessed object
    LRU
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<PolicyKind, String> {
        match s.to_ascii_lowercase().as_str() {
            "lradded" => Ok(PolicyKind::LRAdded),
            "lru" => Ok(PolicyKind::LRU),
            _ => Err(format!("unknown eviction policy {:?}", s))
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::LRAdded => write!(f, "lradded"),
            PolicyKind::LRU => write!(f, "lru"),
        }
    }
}

pub enum EvictionPolicy {
    LRAdded(lr_added::LrAdded),
    LRU(lru::Lru)
}

impl EvictionPolicy {
    pub fn new(kind: PolicyKind, max_size: usize) -> Result<EvictionPolicy, CacheError> {
        if max_size == 0 {
            return Err(CacheError::CacheCapacity);
        }
        Ok(match kind {
            PolicyKind::LRAdded => EvictionPolicy::LRAdded(lr_added::LrAdded::new(max_size)),
            PolicyKind::LRU => EvictionPolicy::LRU(lru::Lru::new(max_size)),
        })
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            EvictionPolicy::LRAdded(_) => PolicyKind::LRAdded,
            EvictionPolicy::LRU(_) => PolicyKind::LRU,
        }
    }

    /// Registers an access. Returns the objects evicted to make room.
    pub fn get(&mut self, oid: ObjectId) -> Vec<ObjectId> {
        match self {
            EvictionPolicy::LRAdded(p) => p.get(oid),
            EvictionPolicy::LRU(p) => p.get(oid),
        }
    }

    /// Writes never change residency
    pub fn put(&mut self, _oid: ObjectId) -> Vec<ObjectId> {
        Vec::new()
    }

    pub fn prefetch(&mut self, oid: ObjectId) -> Vec<ObjectId> {
        self.get(oid)
    }

    pub fn remove(&mut self, oid: ObjectId) {
        match self {
            EvictionPolicy::LRAdded(p) => p.remove(oid),
            EvictionPolicy::LRU(p) => p.remove(oid),
        }
    }

    pub fn contains(&self, oid: ObjectId) -> bool {
        match self {
            EvictionPolicy::LRAdded(p) => p.contains(oid),
            EvictionPolicy::LRU(p) => p.contains(oid),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EvictionPolicy::LRAdded(p) => p.len(),
            EvictionPolicy::LRU(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        match self {
            EvictionPolicy::LRAdded(p) => p.max_size(),
            EvictionPolicy::LRU(p) => p.max_size(),
        }
    }
}
