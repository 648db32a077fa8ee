//! Client side of the allocation protocol
//!
//! Control requests (Alloc, Dealloc, KeepAlive, Sub, Flush, Lock) are sent
//! over the connection's send buffer and answered in order, so each pending
//! request is matched to the next acknowledgement received. One-sided reads
//! and writes go straight to server memory and are matched to their futures
//! by work request id.
//!
//! A dedicated completion thread drains the transport and fulfils futures.
//! When the connection drops every outstanding future resolves to
//! `GenericException`.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver};
use log::{debug, error, info, warn};

use crate::cache::{CacheError, ObjectStore};
use crate::config::{ClientConfig, ConfigError};
use crate::protocol::{self, DecodeError, Message, ObjectId, Tag};
use crate::transport::{AccessFlags, AlignedBuffer, CmEvent, ConnId, MemoryRegion, MessageBuffers, Opcode,
                       Transport, TransportError, WcStatus, WorkCompletion, WorkRequest};

pub mod future;
pub mod lease;

pub use future::{ErrorCode, Future, Promise};
pub use lease::{Grant, Lease};

#[derive(Debug)]
pub enum ClientError {
    GenericServerException,
    ServerMemoryExhausted,
    NoSuchId,
    Connection(String),
    Disconnected,
    Transport(TransportError),
    Protocol(DecodeError),
    Config(ConfigError),
    MessageTooLarge(usize),
    OutOfBounds {
        offset: u64,
        len: usize,
        size: u64
    }
}

impl ClientError {
    /// Code reported through a future for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::ServerMemoryExhausted => ErrorCode::ServerMemoryExhausted,
            ClientError::NoSuchId => ErrorCode::NoSuchId,
            _ => ErrorCode::GenericException
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::GenericServerException => write!(f, "GenericServerException"),
            ClientError::ServerMemoryExhausted => write!(f, "ServerMemoryExhausted"),
            ClientError::NoSuchId => write!(f, "NoSuchId"),
            ClientError::Connection(s) => write!(f, "Connection({})", s),
            ClientError::Disconnected => write!(f, "Disconnected"),
            ClientError::Transport(e) => write!(f, "Transport({})", e),
            ClientError::Protocol(e) => write!(f, "Protocol({})", e),
            ClientError::Config(e) => write!(f, "Config({})", e),
            ClientError::MessageTooLarge(n) => write!(f, "MessageTooLarge({} bytes)", n),
            ClientError::OutOfBounds{offset, len, size} => write!(f,
                "OutOfBounds(offset:{}, len:{}, size:{})", offset, len, size),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ErrorCode> for ClientError {
    fn from(code: ErrorCode) -> ClientError {
        match code {
            ErrorCode::ServerMemoryExhausted => ClientError::ServerMemoryExhausted,
            ErrorCode::NoSuchId => ClientError::NoSuchId,
            ErrorCode::Ok | ErrorCode::GenericException => ClientError::GenericServerException,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> ClientError {
        ClientError::Transport(e)
    }
}

impl From<ConfigError> for ClientError {
    fn from(e: ConfigError) -> ClientError {
        ClientError::Config(e)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A control request awaiting its acknowledgement
enum Pending {
    Alloc(Promise<Grant>),
    Dealloc(Promise<bool>),
    KeepAlive(Promise<u64>),
    Sub(Promise<ObjectId>),
    Flush(Promise<ObjectId>),
    Lock(Promise<u64>)
}

impl Pending {
    /// Fulfils the promise from `ack`. Returns the tag of a mismatched ack.
    fn resolve(self, ack: Message) -> Result<(), Tag> {
        match (self, ack) {
            (Pending::Alloc(p), Message::AllocAck{mr_id, remote_addr, peer_capability}) => {
                if remote_addr == 0 {
                    p.fail(ErrorCode::ServerMemoryExhausted);
                } else {
                    p.fulfill(Grant { mr_id, remote_addr, peer_capability });
                }
            },
            (Pending::Dealloc(p), Message::DeallocAck{result}) => {
                if result != 0 {
                    p.fulfill(true);
                } else {
                    p.fail(ErrorCode::NoSuchId);
                }
            },
            (Pending::KeepAlive(p), Message::KeepAliveAck{nonce}) => p.fulfill(nonce),
            (Pending::Sub(p), Message::SubAck{oid}) => p.fulfill(oid),
            (Pending::Flush(p), Message::FlushAck{oid}) => p.fulfill(oid),
            (Pending::Lock(p), Message::LockAck{id}) => p.fulfill(id),
            (p, other) => {
                p.fail(ErrorCode::GenericException);
                return Err(other.tag());
            }
        }
        Ok(())
    }

    fn fail(self, code: ErrorCode) {
        match self {
            Pending::Alloc(p) => p.fail(code),
            Pending::Dealloc(p) => p.fail(code),
            Pending::KeepAlive(p) => p.fail(code),
            Pending::Sub(p) => p.fail(code),
            Pending::Flush(p) => p.fail(code),
            Pending::Lock(p) => p.fail(code),
        }
    }
}

/// Registered local buffer backing one one-sided operation
struct Staging {
    buffer: AlignedBuffer,
    mr: MemoryRegion
}

impl Staging {
    fn new(transport: &dyn Transport, len: usize) -> Result<Staging, TransportError> {
        let mut buffer = AlignedBuffer::new(len)?;
        let mr = unsafe { transport.register_memory(buffer.as_mut_ptr(), len, AccessFlags::LOCAL_WRITE)? };
        Ok(Staging { buffer, mr })
    }

    fn release(self, transport: &dyn Transport) {
        let _ = transport.deregister_memory(&self.mr);
    }
}

enum OneSided {
    Write {
        promise: Promise<bool>,
        staging: Staging
    },
    Read {
        promise: Promise<Vec<u8>>,
        staging: Staging
    }
}

impl OneSided {
    fn finish(self, transport: &dyn Transport, status: WcStatus) {
        match self {
            OneSided::Write{promise, staging} => {
                staging.release(transport);
                if status == WcStatus::Success {
                    promise.fulfill(true);
                } else {
                    promise.fail(ErrorCode::GenericException);
                }
            },
            OneSided::Read{promise, staging} => {
                let data = staging.buffer.as_slice().to_vec();
                staging.release(transport);
                if status == WcStatus::Success {
                    promise.fulfill(data);
                } else {
                    promise.fail(ErrorCode::GenericException);
                }
            }
        }
    }
}

struct ControlChannel {
    buffers: Option<MessageBuffers>,
    pending: VecDeque<(u64, Pending)>,
    sent: u64,
    closed: bool
}

struct StoredObject {
    len: usize,
    lease: Lease
}

struct Shared {
    transport: Box<dyn Transport>,
    conn: ConnId,
    control: Mutex<ControlChannel>,
    ops: Mutex<HashMap<u64, OneSided>>,
    objects: Mutex<HashMap<ObjectId, StoredObject>>,
    next_wr: AtomicU64,
    closed: AtomicBool
}

impl Shared {
    fn issue(&self, msg: &Message, pending: Pending) -> Result<(), ClientError> {
        let frame = protocol::encode(msg);
        let mut ch = lock(&self.control);

        if ch.closed {
            return Err(ClientError::Disconnected);
        }
        let seq = ch.sent + 1;
        match &mut ch.buffers {
            Some(b) if frame.len() > b.slot_size() => return Err(ClientError::MessageTooLarge(frame.len())),
            Some(b) => b.send(&*self.transport, self.conn, seq, &frame)?,
            None => return Err(ClientError::Disconnected)
        }
        ch.sent = seq;
        ch.pending.push_back((seq, pending));
        debug!("{} sent {}", self.conn, msg);
        Ok(())
    }

    fn one_sided(&self, op: OneSided, make: impl FnOnce(u64, &Staging) -> WorkRequest) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Disconnected);
        }
        let wr_id = self.next_wr.fetch_add(1, Ordering::SeqCst);
        let wr = match &op {
            OneSided::Write{staging, ..} | OneSided::Read{staging, ..} => make(wr_id, staging)
        };

        lock(&self.ops).insert(wr_id, op);

        if let Err(e) = self.transport.post_send(self.conn, wr) {
            if let Some(op) = lock(&self.ops).remove(&wr_id) {
                op.finish(&*self.transport, WcStatus::LocalProtectionError);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Handles one completion. Returns false if the connection can no longer
    /// be trusted.
    fn completion(&self, wc: WorkCompletion) -> bool {
        match wc.opcode {
            Opcode::Recv => self.receive(wc),
            Opcode::Send => {
                if wc.status != WcStatus::Success {
                    warn!("{} send {} failed: {:?}", self.conn, wc.wr_id, wc.status);
                    let mut ch = lock(&self.control);
                    if let Some(idx) = ch.pending.iter().position(|(seq, _)| *seq == wc.wr_id) {
                        if let Some((_, p)) = ch.pending.remove(idx) {
                            p.fail(ErrorCode::GenericException);
                        }
                    }
                }
                true
            },
            Opcode::RdmaRead | Opcode::RdmaWrite => {
                let op = lock(&self.ops).remove(&wc.wr_id);
                match op {
                    Some(op) => {
                        if wc.status != WcStatus::Success {
                            warn!("{} {:?} {} failed: {:?}", self.conn, wc.opcode, wc.wr_id, wc.status);
                        }
                        op.finish(&*self.transport, wc.status);
                    },
                    None => warn!("{} completion for unknown operation {}", self.conn, wc.wr_id)
                }
                true
            }
        }
    }

    fn receive(&self, wc: WorkCompletion) -> bool {
        let mut ch = lock(&self.control);
        let slot = wc.wr_id as usize;

        let frame = match &ch.buffers {
            Some(b) => {
                let frame = if wc.status == WcStatus::Success {
                    b.received(slot, wc.byte_len).map(|f| f.to_vec())
                } else {
                    warn!("{} receive failed: {:?}", self.conn, wc.status);
                    None
                };
                if let Err(e) = b.repost(&*self.transport, self.conn, slot) {
                    warn!("{} failed to re-post receive slot {}: {}", self.conn, slot, e);
                }
                frame
            },
            None => None
        };

        let frame = match frame {
            Some(f) => f,
            None => return true
        };

        let ack = match protocol::decode(&frame) {
            Ok(m) => m,
            Err(e) => {
                error!("{} received an undecodable frame: {}", self.conn, e);
                return false;
            }
        };
        debug!("{} received {}", self.conn, ack);

        match ch.pending.pop_front() {
            Some((_, p)) => match p.resolve(ack) {
                Ok(()) => true,
                Err(tag) => {
                    error!("{} received out-of-order {}", self.conn, tag);
                    false
                }
            },
            None => {
                error!("{} received unsolicited {}", self.conn, ack);
                false
            }
        }
    }

    /// Fails every outstanding operation and refuses new ones
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let pending: Vec<Pending> = {
            let mut ch = lock(&self.control);
            ch.closed = true;
            ch.pending.drain(..).map(|(_, p)| p).collect()
        };
        for p in pending {
            p.fail(ErrorCode::GenericException);
        }

        let ops: Vec<OneSided> = lock(&self.ops).drain().map(|(_, op)| op).collect();
        for op in ops {
            op.finish(&*self.transport, WcStatus::RemoteInvalidRequest);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let ch = self.control.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(b) = ch.buffers.take() {
            b.release(&*self.transport);
        }
    }
}

fn drain_completions(shared: &Shared) {
    let cm = shared.transport.cm_events();
    let cq = shared.transport.completions();

    loop {
        select! {
            recv(cm) -> ev => match ev {
                Ok(CmEvent::Disconnected(c)) if c == shared.conn => return,
                Ok(ev) => debug!("{} ignoring {:?}", shared.conn, ev),
                Err(_) => return
            },
            recv(cq) -> wc => match wc {
                Ok(wc) => {
                    if !shared.completion(wc) {
                        return;
                    }
                },
                Err(_) => return
            }
        }
    }
}

fn await_event(
    cm: &Receiver<CmEvent>,
    conn: ConnId,
    timeout: Duration,
    step: &str,
    success: fn(&CmEvent) -> bool) -> Result<(), ClientError> {

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match cm.recv_timeout(remaining) {
            Ok(ev) if ev.conn() != conn => debug!("Ignoring {:?} while waiting for {}", ev, step),
            Ok(ev) if success(&ev) => return Ok(()),
            Ok(ev) => {
                warn!("{} failed during {}: {:?}", conn, step, ev);
                return Err(ClientError::Connection(format!("{} failed with {:?}", step, ev)));
            },
            Err(_) => {
                warn!("{} timed out during {}", conn, step);
                return Err(ClientError::Connection(format!("{} timed out", step)));
            }
        }
    }
}

/// Connection to one allocation server
pub struct StoreClient {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>
}

impl StoreClient {
    /// Resolves the server address and route, connects, pre-posts receive
    /// slots and starts the completion thread
    pub fn connect<T: Transport + 'static>(config: &ClientConfig, transport: T) -> Result<StoreClient, ClientError> {
        config.validate()?;
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let cm = transport.cm_events();

        let conn = transport.resolve_addr(&config.server_addr)?;
        await_event(&cm, conn, timeout, "address resolution", |ev| matches!(ev, CmEvent::AddrResolved(_)))?;

        transport.resolve_route(conn)?;
        await_event(&cm, conn, timeout, "route resolution", |ev| matches!(ev, CmEvent::RouteResolved(_)))?;

        let buffers = MessageBuffers::new(&transport, config.recv_slots, config.message_size)?;

        let established = transport.connect(conn)
            .map_err(ClientError::from)
            .and_then(|_| await_event(&cm, conn, timeout, "connection", |ev| matches!(ev, CmEvent::Established(_))))
            .and_then(|_| buffers.post_receives(&transport, conn).map_err(ClientError::from));

        if let Err(e) = established {
            buffers.release(&transport);
            let _ = transport.disconnect(conn);
            return Err(e);
        }

        info!("{} connected to {}", conn, config.server_addr);

        let shared = Arc::new(Shared {
            transport: Box::new(transport),
            conn,
            control: Mutex::new(ControlChannel {
                buffers: Some(buffers),
                pending: VecDeque::new(),
                sent: 0,
                closed: false
            }),
            ops: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            next_wr: AtomicU64::new(1),
            closed: AtomicBool::new(false)
        });

        let s = shared.clone();
        let thread = thread::Builder::new()
            .name("client-completions".into())
            .spawn(move || {
                drain_completions(&s);
                s.close();
                let _ = s.transport.disconnect(s.conn);
            })
            .map_err(|e| ClientError::Connection(format!("failed to start completion thread: {}", e)))?;

        Ok(StoreClient {
            shared,
            thread: Some(thread)
        })
    }

    pub fn conn(&self) -> ConnId {
        self.shared.conn
    }

    fn control<T: Clone>(&self, msg: Message, make: fn(Promise<T>) -> Pending) -> Future<T> {
        let (promise, fut) = future::pair();
        match self.shared.issue(&msg, make(promise)) {
            Ok(()) => fut,
            Err(e) => {
                warn!("{} could not send {}: {}", self.shared.conn, msg, e);
                Future::ready(Err(e.code()))
            }
        }
    }

    pub fn keep_alive(&self, nonce: u64) -> Future<u64> {
        self.control(Message::KeepAlive{ nonce }, Pending::KeepAlive)
    }

    pub fn subscribe(&self, oid: ObjectId, addr: &str) -> Future<ObjectId> {
        self.control(Message::Sub{ oid, addr: addr.to_string() }, Pending::Sub)
    }

    pub fn flush(&self, oid: ObjectId) -> Future<ObjectId> {
        self.control(Message::Flush{ oid }, Pending::Flush)
    }

    pub fn lock(&self, id: u64) -> Future<u64> {
        self.control(Message::Lock{ id }, Pending::Lock)
    }

    /// Requests the raw grant for an allocation
    pub fn allocate_async(&self, size: u64, key: &str) -> Future<Grant> {
        self.control(Message::Alloc{ size, key: key.to_string() }, Pending::Alloc)
    }

    pub fn allocate(&self, size: u64) -> Result<Lease, ClientError> {
        self.allocate_keyed(size, "")
    }

    /// Allocations with the same non-empty key share one server region
    ///
    /// Each call takes a hold on the region that the matching `deallocate`
    /// gives back. Asking for more bytes than the region was created with
    /// fails with `ServerMemoryExhausted`.
    pub fn allocate_keyed(&self, size: u64, key: &str) -> Result<Lease, ClientError> {
        let grant = self.allocate_async(size, key).get()?;
        Ok(Lease::new(grant, size))
    }

    /// Returns the lease to the caller if the server did not release it
    pub fn deallocate(&self, lease: Lease) -> Result<(), (Lease, ClientError)> {
        let mut f = self.control(Message::Dealloc{ addr: lease.remote_addr() }, Pending::Dealloc);
        match f.get() {
            Ok(_) => Ok(()),
            Err(e) => Err((lease, e))
        }
    }

    /// One-sided write of `data` at `offset` within the lease
    pub fn write(&self, lease: &Lease, offset: u64, data: &[u8]) -> Future<bool> {
        let transport = &*self.shared.transport;

        let issued = lease.locate(offset, data.len()).and_then(|remote_addr| {
            let mut staging = Staging::new(transport, data.len())?;
            staging.buffer.as_mut_slice().copy_from_slice(data);

            let (promise, fut) = future::pair();
            let rkey = lease.capability() as u32;
            self.shared.one_sided(OneSided::Write{ promise, staging }, |wr_id, s| WorkRequest::RdmaWrite {
                wr_id,
                local: s.mr.sge(0, s.buffer.len()),
                remote_addr,
                rkey
            })?;
            Ok(fut)
        });

        issued.unwrap_or_else(|e| {
            warn!("{} write failed: {}", self.shared.conn, e);
            Future::ready(Err(e.code()))
        })
    }

    /// One-sided read of `len` bytes at `offset` within the lease
    pub fn read(&self, lease: &Lease, offset: u64, len: usize) -> Future<Vec<u8>> {
        let transport = &*self.shared.transport;

        let issued = lease.locate(offset, len).and_then(|remote_addr| {
            let staging = Staging::new(transport, len)?;

            let (promise, fut) = future::pair();
            let rkey = lease.capability() as u32;
            self.shared.one_sided(OneSided::Read{ promise, staging }, |wr_id, s| WorkRequest::RdmaRead {
                wr_id,
                local: s.mr.sge(0, s.buffer.len()),
                remote_addr,
                rkey
            })?;
            Ok(fut)
        });

        issued.unwrap_or_else(|e| {
            warn!("{} read failed: {}", self.shared.conn, e);
            Future::ready(Err(e.code()))
        })
    }

    /// Stores `data` as object `oid`, allocating server memory as needed
    ///
    /// The object table is never locked across a server round trip.
    pub fn write_object(&self, oid: ObjectId, data: &[u8]) -> Future<bool> {
        let len = data.len();

        let previous = {
            let mut objects = lock(&self.shared.objects);
            let fits = objects.get(&oid).map_or(false, |o| o.lease.size() >= len as u64);
            if fits {
                if let Some(o) = objects.get_mut(&oid) {
                    o.len = len;
                    return self.write(&o.lease, 0, data);
                }
            }
            objects.remove(&oid)
        };

        if let Some(old) = previous {
            self.release(oid, old.lease);
        }

        let lease = match self.allocate(len as u64) {
            Ok(lease) => lease,
            Err(e) => return Future::ready(Err(e.code()))
        };
        let written = self.write(&lease, 0, data);

        // A concurrent writer may have stored the object meanwhile
        let displaced = lock(&self.shared.objects).insert(oid, StoredObject { len, lease });
        if let Some(d) = displaced {
            self.release(oid, d.lease);
        }
        written
    }

    fn release(&self, oid: ObjectId, lease: Lease) {
        if let Err((_, e)) = self.deallocate(lease) {
            warn!("Failed to release previous allocation of object {}: {}", oid, e);
        }
    }

    pub fn read_object(&self, oid: ObjectId) -> Future<Vec<u8>> {
        let objects = lock(&self.shared.objects);
        match objects.get(&oid) {
            Some(o) => self.read(&o.lease, 0, o.len),
            None => Future::ready(Err(ErrorCode::NoSuchId))
        }
    }

    pub fn remove_object(&self, oid: ObjectId) -> Future<bool> {
        let removed = lock(&self.shared.objects).remove(&oid);
        match removed {
            Some(o) => match self.deallocate(o.lease) {
                Ok(()) => Future::ready(Ok(true)),
                Err((lease, e)) => {
                    lock(&self.shared.objects).entry(oid).or_insert(StoredObject { len: o.len, lease });
                    Future::ready(Err(e.code()))
                }
            },
            None => Future::ready(Err(ErrorCode::NoSuchId))
        }
    }

    pub fn contains_object(&self, oid: ObjectId) -> bool {
        lock(&self.shared.objects).contains_key(&oid)
    }
}

impl Drop for StoreClient {
    fn drop(&mut self) {
        let _ = self.shared.transport.disconnect(self.shared.conn);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl ObjectStore for StoreClient {
    fn get(&self, oid: ObjectId) -> Result<Vec<u8>, CacheError> {
        self.read_object(oid).get().map_err(|e| CacheError::from_client(oid, e))
    }

    fn put(&self, oid: ObjectId, data: &[u8]) -> Result<(), CacheError> {
        self.write_object(oid, data).get().map(|_| ()).map_err(|e| CacheError::from_client(oid, e))
    }

    fn remove(&self, oid: ObjectId) -> Result<(), CacheError> {
        self.remove_object(oid).get().map(|_| ()).map_err(|e| CacheError::from_client(oid, e))
    }
}
