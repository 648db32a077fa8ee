//! Durable object storage behind the cache

use std::fmt;
use std::io;
use std::sync::Mutex;

use crate::cache::{CacheError, ObjectStore};
use crate::protocol::ObjectId;

pub mod memory;
pub mod rocks;

pub use memory::MemoryBackend;
pub use rocks::RocksBackend;

#[derive(Debug)]
pub enum StorageError {
    NotFound(ObjectId),
    Corrupt(ObjectId),
    /// The backend was used before `init` succeeded
    Uninitialized,
    WriteFailed(ObjectId),
    Db(rocksdb::Error),
    Io(io::Error)
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(oid) => write!(f, "NotFound({})", oid),
            StorageError::Corrupt(oid) => write!(f, "Corrupt({})", oid),
            StorageError::Uninitialized => write!(f, "Uninitialized"),
            StorageError::WriteFailed(oid) => write!(f, "WriteFailed({})", oid),
            StorageError::Db(e) => write!(f, "Db({})", e),
            StorageError::Io(e) => write!(f, "Io({})", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> StorageError {
        StorageError::Db(e)
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> StorageError {
        StorageError::Io(e)
    }
}

pub trait StorageBackend: Send {
    fn init(&mut self) -> Result<(), StorageError>;

    /// Returns false if the object could not be stored
    fn put(&mut self, oid: ObjectId, data: &[u8]) -> bool;

    fn exists(&self, oid: ObjectId) -> bool;

    fn get(&self, oid: ObjectId) -> Result<Vec<u8>, StorageError>;

    /// Returns false if the object did not exist
    fn delete(&mut self, oid: ObjectId) -> bool;

    /// Size in bytes of the stored object, 0 if absent
    fn size(&self, oid: ObjectId) -> u64;
}

/// Presents a storage backend as an `ObjectStore`
pub struct BackendStore<B: StorageBackend> {
    backend: Mutex<B>
}

impl<B: StorageBackend> BackendStore<B> {
    pub fn new(mut backend: B) -> Result<BackendStore<B>, StorageError> {
        backend.init()?;
        Ok(BackendStore {
            backend: Mutex::new(backend)
        })
    }

    pub fn into_inner(self) -> B {
        self.backend.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<B: StorageBackend> ObjectStore for BackendStore<B> {
    fn get(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError> {
        let b = self.backend.lock().unwrap_or_else(|e| e.into_inner());
        match b.get(oid) {
            Ok(data) => Ok(data),
            Err(StorageError::NotFound(_)) => Err(CacheError::NoSuchId(oid)),
            Err(e) => Err(e.into())
        }
    }

    fn put(&self, oid: ObjectId, data: &[u8]) -> Result<(), CacheError> {
        let mut b = self.backend.lock().unwrap_or_else(|e| e.into_inner());
        if b.put(oid, data) {
            Ok(())
        } else {
            Err(CacheError::Storage(StorageError::WriteFailed(oid)))
        }
    }

    fn remove(&self, oid: ObjectId) -> Result<(), CacheError> {
        let mut b = self.backend.lock().unwrap_or_else(|e| e.into_inner());
        if b.delete(oid) {
            Ok(())
        } else {
            Err(CacheError::NoSuchId(oid))
        }
    }
}
