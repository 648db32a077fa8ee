//! Capability interface to a reliable-connected fabric
//!
//! A transport driver provides connection management events, memory
//! registration, two-sided send/receive and one-sided read/write against
//! registered remote memory. Results of posted work requests are delivered
//! asynchronously on the completion channel; connection state changes arrive
//! on the connection manager channel.

use std::fmt;

use bitflags::bitflags;
use crossbeam_channel::Receiver;

pub mod buffer;
pub mod loopback;
pub mod slots;

pub use buffer::AlignedBuffer;
pub use slots::MessageBuffers;

/// Identifies one side of a connection within a transport endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conn({})", self.0)
    }
}

bitflags! {
    pub struct AccessFlags: u32 {
        const LOCAL_WRITE  = 0b0001;
        const REMOTE_WRITE = 0b0010;
        const REMOTE_READ  = 0b0100;
    }
}

/// Handle to a registered memory range
///
/// `lkey` authorizes local use of the range in work requests. `rkey` is the
/// capability a peer presents to read or write the range remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub addr: u64,
    pub len: usize,
    pub lkey: u32,
    pub rkey: u32
}

impl MemoryRegion {
    /// Scatter/gather element covering `len` bytes at `offset` within this region
    pub fn sge(&self, offset: usize, len: usize) -> Sge {
        Sge {
            addr: self.addr + offset as u64,
            length: len,
            lkey: self.lkey
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sge {
    pub addr: u64,
    pub length: usize,
    pub lkey: u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkRequest {
    Send {
        wr_id: u64,
        local: Sge
    },
    RdmaWrite {
        wr_id: u64,
        local: Sge,
        remote_addr: u64,
        rkey: u32
    },
    RdmaRead {
        wr_id: u64,
        local: Sge,
        remote_addr: u64,
        rkey: u32
    }
}

impl WorkRequest {
    pub fn wr_id(&self) -> u64 {
        match self {
            WorkRequest::Send{wr_id, ..} => *wr_id,
            WorkRequest::RdmaWrite{wr_id, ..} => *wr_id,
            WorkRequest::RdmaRead{wr_id, ..} => *wr_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Send,
    Recv,
    RdmaWrite,
    RdmaRead
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WcStatus {
    Success,
    LocalLengthError,
    LocalProtectionError,
    RemoteAccessError,
    RemoteInvalidRequest
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkCompletion {
    pub wr_id: u64,
    pub conn: ConnId,
    pub opcode: Opcode,
    pub status: WcStatus,
    pub byte_len: usize
}

/// Connection manager events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmEvent {
    AddrResolved(ConnId),
    AddrError(ConnId),
    RouteResolved(ConnId),
    RouteError(ConnId),
    ConnectRequest(ConnId),
    Established(ConnId),
    Rejected(ConnId),
    Disconnected(ConnId)
}

impl CmEvent {
    pub fn conn(&self) -> ConnId {
        match self {
            CmEvent::AddrResolved(c) => *c,
            CmEvent::AddrError(c) => *c,
            CmEvent::RouteResolved(c) => *c,
            CmEvent::RouteError(c) => *c,
            CmEvent::ConnectRequest(c) => *c,
            CmEvent::Established(c) => *c,
            CmEvent::Rejected(c) => *c,
            CmEvent::Disconnected(c) => *c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    AddressInUse(String),
    UnknownConnection(ConnId),
    NotConnected(ConnId),
    InvalidState(ConnId),
    UnknownRegion(u32),
    OutOfBounds,
    AllocationFailed(usize)
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::AddressInUse(a) => write!(f, "AddressInUse({})", a),
            TransportError::UnknownConnection(c) => write!(f, "UnknownConnection({})", c),
            TransportError::NotConnected(c) => write!(f, "NotConnected({})", c),
            TransportError::InvalidState(c) => write!(f, "InvalidState({})", c),
            TransportError::UnknownRegion(k) => write!(f, "UnknownRegion({})", k),
            TransportError::OutOfBounds => write!(f, "OutOfBounds"),
            TransportError::AllocationFailed(n) => write!(f, "AllocationFailed({} bytes)", n),
        }
    }
}

impl std::error::Error for TransportError {}

pub trait Transport: Send + Sync {
    /// Accepts incoming connection requests for `addr`
    fn listen(&self, addr: &str) -> Result<(), TransportError>;

    /// Starts resolution of `addr`. The outcome arrives as `AddrResolved` or
    /// `AddrError` for the returned connection.
    fn resolve_addr(&self, addr: &str) -> Result<ConnId, TransportError>;

    /// Outcome arrives as `RouteResolved` or `RouteError`
    fn resolve_route(&self, conn: ConnId) -> Result<(), TransportError>;

    /// Outcome arrives as `Established` or `Rejected`
    fn connect(&self, conn: ConnId) -> Result<(), TransportError>;

    fn accept(&self, conn: ConnId) -> Result<(), TransportError>;

    fn reject(&self, conn: ConnId) -> Result<(), TransportError>;

    /// Both sides receive `Disconnected`
    fn disconnect(&self, conn: ConnId) -> Result<(), TransportError>;

    /// Registers `len` bytes at `addr` for use in work requests.
    ///
    /// # Safety
    ///
    /// The range must remain valid until it is deregistered. The fabric reads
    /// and writes it whenever work requests naming it complete.
    unsafe fn register_memory(
        &self,
        addr: *mut u8,
        len: usize,
        access: AccessFlags) -> Result<MemoryRegion, TransportError>;

    fn deregister_memory(&self, mr: &MemoryRegion) -> Result<(), TransportError>;

    fn post_recv(&self, conn: ConnId, wr_id: u64, sge: Sge) -> Result<(), TransportError>;

    fn post_send(&self, conn: ConnId, wr: WorkRequest) -> Result<(), TransportError>;

    fn cm_events(&self) -> Receiver<CmEvent>;

    fn completions(&self) -> Receiver<WorkCompletion>;
}
