use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, warn};

use crate::protocol::ObjectId;
use crate::storage::{StorageBackend, StorageError};
use super::{CacheError, EvictionPolicy, ObjectStore, PolicyKind};

/// Misses in flight for one object
struct Fetch {
    generation: u64,
    fetchers: usize
}

struct Inner {
    entries: HashMap<ObjectId, Vec<u8>>,
    policy: EvictionPolicy,
    fetching: HashMap<ObjectId, Fetch>
}

impl Inner {
    fn begin_fetch(&mut self, oid: ObjectId) -> u64 {
        let f = self.fetching.entry(oid).or_insert(Fetch { generation: 0, fetchers: 0 });
        f.fetchers += 1;
        f.generation
    }

    /// Returns false if the object was written or removed since the fetch began
    fn end_fetch(&mut self, oid: ObjectId, generation: u64) -> bool {
        match self.fetching.get_mut(&oid) {
            Some(f) => {
                let current = f.generation == generation;
                f.fetchers -= 1;
                if f.fetchers == 0 {
                    self.fetching.remove(&oid);
                }
                current
            },
            None => false
        }
    }

    fn invalidate(&mut self, oid: ObjectId) {
        if let Some(f) = self.fetching.get_mut(&oid) {
            f.generation += 1;
        }
    }

    /// Inserts freshly fetched content and returns the evicted objects with
    /// their bytes. If another thread admitted `oid` while the fetch was in
    /// flight, its copy wins and the access is only registered.
    fn admit(&mut self, oid: ObjectId, data: Vec<u8>, prefetch: bool) -> (Vec<u8>, Vec<(ObjectId, Vec<u8>)>) {
        if let Some(existing) = self.entries.get(&oid) {
            let existing = existing.clone();
            self.policy.get(oid);
            return (existing, Vec::new());
        }

        let victims = if prefetch {
            self.policy.prefetch(oid)
        } else {
            self.policy.get(oid)
        };

        self.entries.insert(oid, data.clone());

        let mut evicted = Vec::with_capacity(victims.len());
        for victim in victims {
            if let Some(bytes) = self.entries.remove(&victim) {
                evicted.push((victim, bytes));
            }
        }
        (data, evicted)
    }
}

/// Caches object content in front of an `ObjectStore`
///
/// Residency is decided by the configured eviction policy. The cached bytes
/// and the policy share one lock which is never held across a call into the
/// store or the storage backend. A miss whose object is written or removed
/// while the fetch is in flight returns what it fetched but does not admit
/// it. When a backend is attached, evicted objects are written to it and
/// remote misses fall back to it.
pub struct CacheManager<S: ObjectStore> {
    store: S,
    inner: Mutex<Inner>,
    backend: Option<Mutex<Box<dyn StorageBackend>>>
}

impl<S: ObjectStore> CacheManager<S> {
    pub fn new(store: S, max_size: usize, kind: PolicyKind) -> Result<CacheManager<S>, CacheError> {
        let policy = EvictionPolicy::new(kind, max_size)?;
        Ok(CacheManager {
            store,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                policy,
                fetching: HashMap::new()
            }),
            backend: None
        })
    }

    /// Attaches a storage backend. The backend is initialized here.
    pub fn with_backend(mut self, mut backend: Box<dyn StorageBackend>) -> Result<CacheManager<S>, CacheError> {
        backend.init()?;
        self.backend = Some(Mutex::new(backend));
        Ok(self)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.lock().policy.kind()
    }

    pub fn max_size(&self) -> usize {
        self.lock().policy.max_size()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, oid: ObjectId) -> bool {
        self.lock().entries.contains_key(&oid)
    }

    pub fn get(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError> {
        let generation = {
            let mut inner = self.lock();
            if let Some(data) = inner.entries.get(&oid) {
                let data = data.clone();
                inner.policy.get(oid);
                return Ok(data);
            }
            inner.begin_fetch(oid)
        };

        let fetched = self.fetch(oid);

        let mut inner = self.lock();
        if !inner.end_fetch(oid, generation) {
            debug!("Object {} changed during its fetch, not caching it", oid);
            return fetched;
        }
        let (data, evicted) = inner.admit(oid, fetched?, false);
        drop(inner);

        self.write_back(evicted);
        Ok(data)
    }

    /// Writes through to the store. Refreshes the cached copy of a resident
    /// object but never admits a new one.
    pub fn put(&self, oid: ObjectId, data: &[u8]) -> Result<(), CacheError> {
        self.store.put(oid, data)?;

        let mut inner = self.lock();
        if let Some(cached) = inner.entries.get_mut(&oid) {
            cached.clear();
            cached.extend_from_slice(data);
        }
        inner.invalidate(oid);
        inner.policy.put(oid);
        Ok(())
    }

    pub fn prefetch(&self, oid: ObjectId) -> Result<(), CacheError> {
        let generation = {
            let mut inner = self.lock();
            if inner.entries.contains_key(&oid) {
                return Ok(());
            }
            inner.begin_fetch(oid)
        };

        let fetched = self.fetch(oid);

        let mut inner = self.lock();
        if !inner.end_fetch(oid, generation) {
            debug!("Object {} changed during its prefetch, not caching it", oid);
            return fetched.map(|_| ());
        }
        let (_, evicted) = inner.admit(oid, fetched?, true);
        drop(inner);

        self.write_back(evicted);
        Ok(())
    }

    /// Removes the object from the storage backend, the store and the cache.
    /// The store's result is returned.
    pub fn remove(&self, oid: ObjectId) -> Result<(), CacheError> {
        if let Some(backend) = &self.backend {
            if !lock_backend(backend).delete(oid) {
                debug!("Object {} was not in the storage backend", oid);
            }
        }
        let removed = self.store.remove(oid);

        let mut inner = self.lock();
        inner.entries.remove(&oid);
        inner.policy.remove(oid);
        inner.invalidate(oid);
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fetch(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError> {
        match self.store.get(oid) {
            Ok(data) => Ok(data),
            Err(CacheError::NoSuchId(_)) => {
                let backend = match &self.backend {
                    Some(b) => b,
                    None => return Err(CacheError::NoSuchId(oid))
                };
                match lock_backend(backend).get(oid) {
                    Ok(data) => {
                        debug!("Object {} loaded from storage backend", oid);
                        Ok(data)
                    },
                    Err(StorageError::NotFound(_)) => Err(CacheError::NoSuchId(oid)),
                    Err(e) => Err(e.into())
                }
            },
            Err(e) => Err(e)
        }
    }

    fn write_back(&self, evicted: Vec<(ObjectId, Vec<u8>)>) {
        for (oid, _) in &evicted {
            debug!("Evicted object {}", oid);
        }
        if let Some(backend) = &self.backend {
            let mut b = lock_backend(backend);
            for (oid, data) in evicted {
                if !b.put(oid, &data) {
                    warn!("Failed to write evicted object {} to storage backend", oid);
                }
            }
        }
    }
}

fn lock_backend(b: &Mutex<Box<dyn StorageBackend>>) -> std::sync::MutexGuard<'_, Box<dyn StorageBackend>> {
    b.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use crossbeam_channel::{unbounded, Receiver, Sender};
    use crate::storage::{MemoryBackend, StorageBackend};

    #[derive(Default)]
    struct CountingStore {
        content: Mutex<HashMap<ObjectId, Vec<u8>>>,
        gets: AtomicUsize
    }

    impl CountingStore {
        fn with(objects: &[(ObjectId, &[u8])]) -> CountingStore {
            let s = CountingStore::default();
            {
                let mut c = s.content.lock().unwrap();
                for (oid, data) in objects {
                    c.insert(*oid, data.to_vec());
                }
            }
            s
        }

        fn gets(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    impl ObjectStore for CountingStore {
        fn get(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.content.lock().unwrap().get(&oid).cloned().ok_or(CacheError::NoSuchId(oid))
        }

        fn put(&self, oid: ObjectId, data: &[u8]) -> Result<(), CacheError> {
            self.content.lock().unwrap().insert(oid, data.to_vec());
            Ok(())
        }

        fn remove(&self, oid: ObjectId) -> Result<(), CacheError> {
            match self.content.lock().unwrap().remove(&oid) {
                Some(_) => Ok(()),
                None => Err(CacheError::NoSuchId(oid))
            }
        }
    }

    /// Snapshots the object, then waits for the test to let the read finish
    struct GatedStore {
        content: Mutex<HashMap<ObjectId, Vec<u8>>>,
        entered: Sender<ObjectId>,
        release: Receiver<()>
    }

    impl GatedStore {
        fn new(objects: &[(ObjectId, &[u8])]) -> (GatedStore, Receiver<ObjectId>, Sender<()>) {
            let (entered_tx, entered_rx) = unbounded();
            let (release_tx, release_rx) = unbounded();
            let content = objects.iter().map(|(oid, data)| (*oid, data.to_vec())).collect();
            let store = GatedStore {
                content: Mutex::new(content),
                entered: entered_tx,
                release: release_rx
            };
            (store, entered_rx, release_tx)
        }
    }

    impl ObjectStore for GatedStore {
        fn get(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError> {
            let snapshot = self.content.lock().unwrap().get(&oid).cloned();
            self.entered.send(oid).unwrap();
            self.release.recv().unwrap();
            snapshot.ok_or(CacheError::NoSuchId(oid))
        }

        fn put(&self, oid: ObjectId, data: &[u8]) -> Result<(), CacheError> {
            self.content.lock().unwrap().insert(oid, data.to_vec());
            Ok(())
        }

        fn remove(&self, oid: ObjectId) -> Result<(), CacheError> {
            match self.content.lock().unwrap().remove(&oid) {
                Some(_) => Ok(()),
                None => Err(CacheError::NoSuchId(oid))
            }
        }
    }

    #[test]
    fn put_during_miss_is_not_overwritten() {
        let (store, entered, release) = GatedStore::new(&[(1, b"old")]);
        let m = Arc::new(CacheManager::new(store, 2, PolicyKind::LRU).unwrap());

        let reader = {
            let m = m.clone();
            thread::spawn(move || m.get(1))
        };
        assert_eq!(entered.recv().unwrap(), 1);
        m.put(1, b"new").unwrap();
        release.send(()).unwrap();

        // The racing reader sees the value it fetched but does not cache it
        assert_eq!(reader.join().unwrap().unwrap(), b"old".to_vec());
        assert!(!m.contains(1));

        release.send(()).unwrap();
        assert_eq!(m.get(1).unwrap(), b"new".to_vec());
        assert!(m.contains(1));
    }

    #[test]
    fn remove_during_miss_is_not_resurrected() {
        let (store, entered, release) = GatedStore::new(&[(1, b"doomed")]);
        let m = Arc::new(CacheManager::new(store, 2, PolicyKind::LRAdded).unwrap());

        let reader = {
            let m = m.clone();
            thread::spawn(move || m.prefetch(1))
        };
        assert_eq!(entered.recv().unwrap(), 1);
        m.remove(1).unwrap();
        release.send(()).unwrap();

        reader.join().unwrap().unwrap();
        assert!(!m.contains(1));

        release.send(()).unwrap();
        match m.get(1) {
            Err(CacheError::NoSuchId(1)) => (),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn overlapping_misses_admit_once() {
        let (store, entered, release) = GatedStore::new(&[(3, b"three")]);
        let m = Arc::new(CacheManager::new(store, 2, PolicyKind::LRU).unwrap());

        let readers: Vec<_> = (0 .. 2).map(|_| {
            let m = m.clone();
            thread::spawn(move || m.get(3))
        }).collect();
        entered.recv().unwrap();
        entered.recv().unwrap();
        release.send(()).unwrap();
        release.send(()).unwrap();

        for r in readers {
            assert_eq!(r.join().unwrap().unwrap(), b"three".to_vec());
        }
        assert_eq!(m.len(), 1);
        assert!(m.lock().fetching.is_empty());
    }

    #[test]
    fn zero_capacity_rejected() {
        match CacheManager::new(CountingStore::default(), 0, PolicyKind::LRU) {
            Err(CacheError::CacheCapacity) => (),
            _ => panic!("zero capacity accepted")
        }
    }

    #[test]
    fn hit_avoids_store() {
        let m = CacheManager::new(CountingStore::with(&[(1, b"one")]), 2, PolicyKind::LRU).unwrap();
        assert_eq!(m.get(1).unwrap(), b"one".to_vec());
        assert_eq!(m.get(1).unwrap(), b"one".to_vec());
        assert_eq!(m.store().gets(), 1);
        assert!(m.contains(1));
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let store = CountingStore::with(&[(1, b"a"), (2, b"b"), (3, b"c")]);
        let m = CacheManager::new(store, 2, PolicyKind::LRU).unwrap();
        m.get(1).unwrap();
        m.get(2).unwrap();
        m.get(1).unwrap();
        m.put(3, b"c2").unwrap();
        assert_eq!(m.len(), 2);
        assert!(!m.contains(3));

        assert_eq!(m.get(3).unwrap(), b"c2".to_vec());
        assert!(m.contains(1));
        assert!(!m.contains(2));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn lradded_evicts_first_admitted() {
        let store = CountingStore::with(&[(1, b"a"), (2, b"b"), (3, b"c")]);
        let m = CacheManager::new(store, 2, PolicyKind::LRAdded).unwrap();
        m.get(1).unwrap();
        m.get(2).unwrap();
        m.get(1).unwrap();
        m.get(3).unwrap();
        assert!(!m.contains(1));
        assert!(m.contains(2));
        assert!(m.contains(3));
    }

    #[test]
    fn put_refreshes_resident_copy() {
        let m = CacheManager::new(CountingStore::with(&[(1, b"old")]), 2, PolicyKind::LRU).unwrap();
        m.get(1).unwrap();
        m.put(1, b"new").unwrap();
        assert_eq!(m.get(1).unwrap(), b"new".to_vec());
        assert_eq!(m.store().gets(), 1);
    }

    #[test]
    fn prefetch_loads_once() {
        let m = CacheManager::new(CountingStore::with(&[(4, b"four")]), 2, PolicyKind::LRU).unwrap();
        m.prefetch(4).unwrap();
        m.prefetch(4).unwrap();
        assert_eq!(m.get(4).unwrap(), b"four".to_vec());
        assert_eq!(m.store().gets(), 1);
    }

    #[test]
    fn unknown_object() {
        let m = CacheManager::new(CountingStore::default(), 2, PolicyKind::LRU).unwrap();
        match m.get(9) {
            Err(CacheError::NoSuchId(9)) => (),
            other => panic!("unexpected {:?}", other)
        }
        assert!(m.is_empty());
    }

    #[test]
    fn remove_drops_everywhere() {
        let m = CacheManager::new(CountingStore::with(&[(1, b"a")]), 2, PolicyKind::LRU).unwrap();
        m.get(1).unwrap();
        m.remove(1).unwrap();
        assert!(!m.contains(1));
        match m.get(1) {
            Err(CacheError::NoSuchId(1)) => (),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn remove_tolerates_object_missing_from_backend() {
        let store = CountingStore::with(&[(1, b"a"), (2, b"b")]);
        let mut backend = MemoryBackend::new();
        backend.put(2, b"b");
        let m = CacheManager::new(store, 2, PolicyKind::LRU).unwrap()
            .with_backend(Box::new(backend)).unwrap();

        // Only the store has object 1; the store's result is what counts
        m.get(1).unwrap();
        m.remove(1).unwrap();
        assert!(!m.contains(1));

        m.remove(2).unwrap();
        match m.get(2) {
            Err(CacheError::NoSuchId(2)) => (),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn evicted_objects_reach_backend() {
        let store = CountingStore::with(&[(1, b"a"), (2, b"b")]);
        let m = CacheManager::new(store, 1, PolicyKind::LRAdded).unwrap()
            .with_backend(Box::new(MemoryBackend::new())).unwrap();

        m.get(1).unwrap();
        m.get(2).unwrap();
        assert!(!m.contains(1));

        // Once gone from the store, the backend copy still serves reads
        m.store().remove(1).unwrap();
        assert_eq!(m.get(1).unwrap(), b"a".to_vec());
    }
}
