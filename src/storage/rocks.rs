use std::fs;
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use log::{error, info, warn};
use rocksdb::{Options, WriteOptions, DB};

use crate::data::{DataMut, RawData};
use crate::protocol::ObjectId;
use super::{StorageBackend, StorageError};

/// Keeps objects in a RocksDB database
///
/// Keys are big-endian object ids so the key order matches id order. Each
/// value is a record of the varint-prefixed object bytes followed by a
/// little-endian CRC32 of those bytes. A record that fails to parse or whose
/// checksum does not match is reported as `StorageError::Corrupt`.
pub struct RocksBackend {
    path: PathBuf,
    sync_writes: bool,
    db: Option<DB>
}

fn checksum(data: &[u8]) -> u32 {
    let mut h = Hasher::new();
    h.update(data);
    h.finalize()
}

fn key(oid: ObjectId) -> [u8; 8] {
    oid.to_be_bytes()
}

fn encode_record(data: &[u8]) -> Vec<u8> {
    let mut m = DataMut::with_capacity(data.len() + 14);
    m.put_varint_prefixed_slice(data);
    m.put_u32_le(checksum(data));
    m.finalize()
}

fn decode_record(oid: ObjectId, record: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut r = RawData::new(record);
    let (content, stored) = match (r.get_varint_prefixed_slice(), r.get_u32_le()) {
        (Ok(c), Ok(s)) => (c, s),
        _ => {
            warn!("Object {} has a malformed record of {} bytes", oid, record.len());
            return Err(StorageError::Corrupt(oid));
        }
    };
    if r.remaining() != 0 || stored != checksum(content) {
        warn!("Checksum mismatch on object {}", oid);
        return Err(StorageError::Corrupt(oid));
    }
    Ok(content.to_vec())
}

impl RocksBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> RocksBackend {
        RocksBackend {
            path: path.as_ref().to_path_buf(),
            sync_writes: false,
            db: None
        }
    }

    /// Every put is flushed to the write-ahead log before it returns
    pub fn sync_writes(mut self, sync: bool) -> RocksBackend {
        self.sync_writes = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn db(&self) -> Result<&DB, StorageError> {
        self.db.as_ref().ok_or(StorageError::Uninitialized)
    }

    fn record(&self, oid: ObjectId) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db()?.get(&key(oid))?.map(|v| v.to_vec()))
    }

    fn write(&self, oid: ObjectId, data: &[u8]) -> Result<(), StorageError> {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        self.db()?.put_opt(&key(oid), &encode_record(data), &opts)?;
        Ok(())
    }
}

impl StorageBackend for RocksBackend {
    fn init(&mut self) -> Result<(), StorageError> {
        if self.db.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        self.db = Some(DB::open(&opts, &self.path)?);

        info!("Opened object database at {:?}", self.path);
        Ok(())
    }

    fn put(&mut self, oid: ObjectId, data: &[u8]) -> bool {
        match self.write(oid, data) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to store object {} in {:?}: {}", oid, self.path, e);
                false
            }
        }
    }

    fn exists(&self, oid: ObjectId) -> bool {
        match self.record(oid) {
            Ok(r) => r.is_some(),
            Err(e) => {
                warn!("Lookup of object {} failed: {}", oid, e);
                false
            }
        }
    }

    fn get(&self, oid: ObjectId) -> Result<Vec<u8>, StorageError> {
        match self.record(oid)? {
            Some(record) => decode_record(oid, &record),
            None => Err(StorageError::NotFound(oid))
        }
    }

    fn delete(&mut self, oid: ObjectId) -> bool {
        let removed = self.record(oid).and_then(|r| match r {
            Some(_) => {
                self.db()?.delete(&key(oid))?;
                Ok(true)
            },
            None => Ok(false)
        });
        match removed {
            Ok(found) => found,
            Err(e) => {
                error!("Failed to delete object {} from {:?}: {}", oid, self.path, e);
                false
            }
        }
    }

    fn size(&self, oid: ObjectId) -> u64 {
        match self.record(oid) {
            Ok(Some(record)) => RawData::new(&record).get_varint().unwrap_or(0),
            _ => 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn open(dir: &TempDir) -> RocksBackend {
        let mut b = RocksBackend::new(dir.path().join("objects"));
        b.init().unwrap();
        b
    }

    #[test]
    fn contract() {
        let dir = TempDir::new("farstore-rocks").unwrap();
        let mut b = open(&dir);

        assert!(!b.exists(7));
        assert_eq!(b.size(7), 0);
        match b.get(7) {
            Err(StorageError::NotFound(7)) => (),
            other => panic!("unexpected {:?}", other)
        }

        assert!(b.put(7, b"seven"));
        assert!(b.exists(7));
        assert_eq!(b.size(7), 5);
        assert_eq!(b.get(7).unwrap(), b"seven".to_vec());

        assert!(b.put(7, b"overwritten"));
        assert_eq!(b.get(7).unwrap(), b"overwritten".to_vec());
        assert_eq!(b.size(7), 11);

        assert!(b.delete(7));
        assert!(!b.delete(7));
        assert!(!b.exists(7));
    }

    #[test]
    fn empty_object() {
        let dir = TempDir::new("farstore-rocks").unwrap();
        let mut b = open(&dir);

        assert!(b.put(1, b""));
        assert!(b.exists(1));
        assert_eq!(b.size(1), 0);
        assert_eq!(b.get(1).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn uninitialized() {
        let dir = TempDir::new("farstore-rocks").unwrap();
        let mut b = RocksBackend::new(dir.path());

        assert!(!b.put(1, b"x"));
        assert!(!b.exists(1));
        match b.get(1) {
            Err(StorageError::Uninitialized) => (),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn survives_reopen() {
        let dir = TempDir::new("farstore-rocks").unwrap();
        {
            let mut b = open(&dir).sync_writes(true);
            assert!(b.put(u64::max_value(), b"last"));
            assert!(b.put(0, b"first"));
        }
        let b = open(&dir);
        assert_eq!(b.get(0).unwrap(), b"first".to_vec());
        assert_eq!(b.get(u64::max_value()).unwrap(), b"last".to_vec());
    }

    #[test]
    fn corruption_detected() {
        let dir = TempDir::new("farstore-rocks").unwrap();
        let mut b = open(&dir);
        assert!(b.put(3, b"payload"));

        let mut raw = b.record(3).unwrap().unwrap();
        raw[1] ^= 0xFF;
        b.db().unwrap().put(&key(3), &raw).unwrap();
        match b.get(3) {
            Err(StorageError::Corrupt(3)) => (),
            other => panic!("unexpected {:?}", other)
        }

        // Shorter than its own length prefix
        b.db().unwrap().put(&key(3), &[9u8, 1, 2]).unwrap();
        match b.get(3) {
            Err(StorageError::Corrupt(3)) => (),
            other => panic!("unexpected {:?}", other)
        }

        // Trailing bytes after the checksum
        let mut padded = encode_record(b"payload");
        padded.push(0);
        b.db().unwrap().put(&key(3), &padded).unwrap();
        match b.get(3) {
            Err(StorageError::Corrupt(3)) => (),
            other => panic!("unexpected {:?}", other)
        }
    }
}
