use std::collections::HashMap;

use crate::protocol::ObjectId;
use super::{StorageBackend, StorageError};

/// Keeps every object in process memory
#[derive(Default)]
pub struct MemoryBackend {
    content: HashMap<ObjectId, Vec<u8>>
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn init(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn put(&mut self, oid: ObjectId, data: &[u8]) -> bool {
        self.content.insert(oid, data.to_vec());
        true
    }

    fn exists(&self, oid: ObjectId) -> bool {
        self.content.contains_key(&oid)
    }

    fn get(&self, oid: ObjectId) -> Result<Vec<u8>, StorageError> {
        match self.content.get(&oid) {
            Some(d) => Ok(d.clone()),
            None => Err(StorageError::NotFound(oid))
        }
    }

    fn delete(&mut self, oid: ObjectId) -> bool {
        self.content.remove(&oid).is_some()
    }

    fn size(&self, oid: ObjectId) -> u64 {
        self.content.get(&oid).map_or(0, |d| d.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract() {
        let mut b = MemoryBackend::new();
        b.init().unwrap();

        assert!(!b.exists(1));
        assert_eq!(b.size(1), 0);
        match b.get(1) {
            Err(StorageError::NotFound(1)) => (),
            other => panic!("unexpected {:?}", other)
        }

        assert!(b.put(1, b"hello"));
        assert!(b.exists(1));
        assert_eq!(b.size(1), 5);
        assert_eq!(b.get(1).unwrap(), b"hello".to_vec());

        assert!(b.put(1, b""));
        assert_eq!(b.size(1), 0);
        assert!(b.exists(1));

        assert!(b.delete(1));
        assert!(!b.delete(1));
        assert!(b.is_empty());
    }
}
