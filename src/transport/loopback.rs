//! In-process fabric
//!
//! Endpoints created from the same `Fabric` can listen, connect to each other
//! and exchange two-sided messages through pre-posted receives. One-sided
//! reads and writes are executed by the fabric directly against the target's
//! registered memory and complete only on the initiator's completion channel,
//! so the target never observes them.
//!
//! Sends that arrive before the peer has posted a receive are held until one
//! is posted rather than failing the sender.

use std::collections::{HashMap, VecDeque};
use std::ptr;
use std::slice;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};

use super::{AccessFlags, CmEvent, ConnId, MemoryRegion, Opcode, Sge, Transport, TransportError,
            WcStatus, WorkCompletion, WorkRequest};

type EndpointId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QpState {
    Idle,
    AddrResolved,
    RouteResolved,
    Connecting,
    Connected
}

struct QueuePair {
    endpoint: EndpointId,
    state: QpState,
    target: Option<String>,
    peer: Option<ConnId>,
    recvs: VecDeque<(u64, Sge)>,
    unreceived: VecDeque<Vec<u8>>
}

impl QueuePair {
    fn new(endpoint: EndpointId) -> QueuePair {
        QueuePair {
            endpoint,
            state: QpState::Idle,
            target: None,
            peer: None,
            recvs: VecDeque::new(),
            unreceived: VecDeque::new()
        }
    }
}

struct Region {
    endpoint: EndpointId,
    addr: u64,
    len: usize,
    access: AccessFlags
}

impl Region {
    fn covers(&self, addr: u64, len: usize) -> bool {
        addr >= self.addr && addr.checked_add(len as u64).map_or(false, |end| end <= self.addr + self.len as u64)
    }
}

struct Port {
    cm: Sender<CmEvent>,
    cq: Sender<WorkCompletion>
}

#[derive(Default)]
struct FabricState {
    next_endpoint: u64,
    next_conn: u64,
    next_key: u32,
    ports: HashMap<EndpointId, Port>,
    listeners: HashMap<String, EndpointId>,
    qps: HashMap<ConnId, QueuePair>,
    regions: HashMap<u32, Region>
}

impl FabricState {
    fn new_conn(&mut self) -> ConnId {
        self.next_conn += 1;
        ConnId(self.next_conn)
    }

    fn cm(&self, endpoint: EndpointId, event: CmEvent) {
        if let Some(p) = self.ports.get(&endpoint) {
            let _ = p.cm.send(event);
        }
    }

    fn complete(&self, endpoint: EndpointId, wc: WorkCompletion) {
        if let Some(p) = self.ports.get(&endpoint) {
            let _ = p.cq.send(wc);
        }
    }

    fn owned_qp(&mut self, endpoint: EndpointId, conn: ConnId) -> Result<&mut QueuePair, TransportError> {
        match self.qps.get_mut(&conn) {
            Some(qp) if qp.endpoint == endpoint => Ok(qp),
            _ => Err(TransportError::UnknownConnection(conn))
        }
    }

    fn check_local(&self, endpoint: EndpointId, sge: &Sge, need: AccessFlags) -> bool {
        match self.regions.get(&sge.lkey) {
            Some(r) => r.endpoint == endpoint && r.covers(sge.addr, sge.length) && r.access.contains(need),
            None => false
        }
    }

    fn check_remote(&self, endpoint: EndpointId, addr: u64, len: usize, rkey: u32, need: AccessFlags) -> bool {
        match self.regions.get(&rkey) {
            Some(r) => r.endpoint == endpoint && r.covers(addr, len) && r.access.contains(need),
            None => false
        }
    }

    /// Copies a received message into a posted receive and completes it
    fn deliver(&self, endpoint: EndpointId, conn: ConnId, wr_id: u64, sge: Sge, bytes: &[u8]) -> bool {
        let fits = bytes.len() <= sge.length;
        if fits {
            unsafe { ptr::copy(bytes.as_ptr(), sge.addr as *mut u8, bytes.len()) };
        }
        self.complete(endpoint, WorkCompletion {
            wr_id,
            conn,
            opcode: Opcode::Recv,
            status: if fits { WcStatus::Success } else { WcStatus::LocalLengthError },
            byte_len: if fits { bytes.len() } else { 0 }
        });
        fits
    }

    fn drop_connection(&mut self, conn: ConnId) {
        if let Some(qp) = self.qps.remove(&conn) {
            self.cm(qp.endpoint, CmEvent::Disconnected(conn));
            if let Some(peer) = qp.peer {
                if let Some(pqp) = self.qps.remove(&peer) {
                    self.cm(pqp.endpoint, CmEvent::Disconnected(peer));
                }
            }
        }
    }
}

/// Shared fabric from which connected endpoints are created
#[derive(Clone, Default)]
pub struct Fabric {
    state: Arc<Mutex<FabricState>>
}

impl Fabric {
    pub fn new() -> Fabric {
        Fabric::default()
    }

    pub fn endpoint(&self) -> Endpoint {
        let (cm_tx, cm_rx) = unbounded();
        let (cq_tx, cq_rx) = unbounded();

        let mut s = self.state.lock().unwrap_or_else(|e| e.into_inner());
        s.next_endpoint += 1;
        let id = s.next_endpoint;
        s.ports.insert(id, Port { cm: cm_tx, cq: cq_tx });

        Endpoint {
            id,
            state: self.state.clone(),
            cm: cm_rx,
            cq: cq_rx
        }
    }
}

pub struct Endpoint {
    id: EndpointId,
    state: Arc<Mutex<FabricState>>,
    cm: Receiver<CmEvent>,
    cq: Receiver<WorkCompletion>
}

impl Endpoint {
    fn lock(&self) -> MutexGuard<'_, FabricState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        let id = self.id;
        let mut s = self.lock();

        let owned: Vec<ConnId> = s.qps.iter().filter(|(_, qp)| qp.endpoint == id).map(|(c, _)| *c).collect();
        for conn in owned {
            s.drop_connection(conn);
        }
        s.listeners.retain(|_, ep| *ep != id);
        s.regions.retain(|_, r| r.endpoint != id);
        s.ports.remove(&id);
    }
}

impl Transport for Endpoint {
    fn listen(&self, addr: &str) -> Result<(), TransportError> {
        let mut s = self.lock();
        if s.listeners.contains_key(addr) {
            return Err(TransportError::AddressInUse(addr.to_string()));
        }
        s.listeners.insert(addr.to_string(), self.id);
        Ok(())
    }

    fn resolve_addr(&self, addr: &str) -> Result<ConnId, TransportError> {
        let mut s = self.lock();
        let conn = s.new_conn();
        let mut qp = QueuePair::new(self.id);
        qp.target = Some(addr.to_string());

        // Failed resolutions leave nothing behind for the caller to release
        if s.listeners.contains_key(addr) {
            qp.state = QpState::AddrResolved;
            s.qps.insert(conn, qp);
            s.cm(self.id, CmEvent::AddrResolved(conn));
        } else {
            s.cm(self.id, CmEvent::AddrError(conn));
        }
        Ok(conn)
    }

    fn resolve_route(&self, conn: ConnId) -> Result<(), TransportError> {
        let mut s = self.lock();
        let listening = {
            let qp = s.owned_qp(self.id, conn)?;
            if qp.state != QpState::AddrResolved {
                return Err(TransportError::InvalidState(conn));
            }
            qp.target.clone()
        };
        let reachable = listening.map_or(false, |t| s.listeners.contains_key(&t));

        if reachable {
            s.owned_qp(self.id, conn)?.state = QpState::RouteResolved;
            s.cm(self.id, CmEvent::RouteResolved(conn));
        } else {
            s.qps.remove(&conn);
            s.cm(self.id, CmEvent::RouteError(conn));
        }
        Ok(())
    }

    fn connect(&self, conn: ConnId) -> Result<(), TransportError> {
        let mut s = self.lock();
        let target = {
            let qp = s.owned_qp(self.id, conn)?;
            if qp.state != QpState::RouteResolved {
                return Err(TransportError::InvalidState(conn));
            }
            qp.target.clone().unwrap_or_default()
        };

        let listener = match s.listeners.get(&target) {
            Some(ep) => *ep,
            None => {
                s.qps.remove(&conn);
                s.cm(self.id, CmEvent::Rejected(conn));
                return Ok(());
            }
        };

        let remote = s.new_conn();
        let mut rqp = QueuePair::new(listener);
        rqp.state = QpState::Connecting;
        rqp.peer = Some(conn);
        s.qps.insert(remote, rqp);

        let qp = s.owned_qp(self.id, conn)?;
        qp.state = QpState::Connecting;
        qp.peer = Some(remote);

        debug!("Loopback connect {} -> {} on {}", conn, remote, target);
        s.cm(listener, CmEvent::ConnectRequest(remote));
        Ok(())
    }

    fn accept(&self, conn: ConnId) -> Result<(), TransportError> {
        let mut s = self.lock();
        let peer = {
            let qp = s.owned_qp(self.id, conn)?;
            match (qp.state, qp.peer) {
                (QpState::Connecting, Some(p)) => p,
                _ => return Err(TransportError::InvalidState(conn))
            }
        };

        let peer_endpoint = match s.qps.get_mut(&peer) {
            Some(pqp) if pqp.state == QpState::Connecting => {
                pqp.state = QpState::Connected;
                pqp.endpoint
            },
            _ => return Err(TransportError::NotConnected(conn))
        };

        s.owned_qp(self.id, conn)?.state = QpState::Connected;
        s.cm(self.id, CmEvent::Established(conn));
        s.cm(peer_endpoint, CmEvent::Established(peer));
        Ok(())
    }

    fn reject(&self, conn: ConnId) -> Result<(), TransportError> {
        let mut s = self.lock();
        let peer = s.owned_qp(self.id, conn)?.peer;
        s.qps.remove(&conn);

        if let Some(peer) = peer {
            if let Some(pqp) = s.qps.get_mut(&peer) {
                pqp.state = QpState::RouteResolved;
                pqp.peer = None;
                let ep = pqp.endpoint;
                s.cm(ep, CmEvent::Rejected(peer));
            }
        }
        Ok(())
    }

    fn disconnect(&self, conn: ConnId) -> Result<(), TransportError> {
        let mut s = self.lock();
        s.owned_qp(self.id, conn)?;
        s.drop_connection(conn);
        Ok(())
    }

    unsafe fn register_memory(
        &self,
        addr: *mut u8,
        len: usize,
        access: AccessFlags) -> Result<MemoryRegion, TransportError> {

        let mut s = self.lock();
        s.next_key += 1;
        let key = s.next_key;
        s.regions.insert(key, Region {
            endpoint: self.id,
            addr: addr as u64,
            len,
            access
        });
        Ok(MemoryRegion {
            addr: addr as u64,
            len,
            lkey: key,
            rkey: key
        })
    }

    fn deregister_memory(&self, mr: &MemoryRegion) -> Result<(), TransportError> {
        let mut s = self.lock();
        let owned = s.regions.get(&mr.lkey).map_or(false, |r| r.endpoint == self.id);
        if !owned {
            return Err(TransportError::UnknownRegion(mr.lkey));
        }
        s.regions.remove(&mr.lkey);
        Ok(())
    }

    fn post_recv(&self, conn: ConnId, wr_id: u64, sge: Sge) -> Result<(), TransportError> {
        let mut s = self.lock();
        s.owned_qp(self.id, conn)?;

        if !s.check_local(self.id, &sge, AccessFlags::LOCAL_WRITE) {
            return Err(TransportError::UnknownRegion(sge.lkey));
        }

        let qp = s.owned_qp(self.id, conn)?;
        match qp.unreceived.pop_front() {
            Some(bytes) => {
                s.deliver(self.id, conn, wr_id, sge, &bytes);
            },
            None => qp.recvs.push_back((wr_id, sge))
        }
        Ok(())
    }

    fn post_send(&self, conn: ConnId, wr: WorkRequest) -> Result<(), TransportError> {
        let mut s = self.lock();
        let peer = {
            let qp = s.owned_qp(self.id, conn)?;
            match (qp.state, qp.peer) {
                (QpState::Connected, Some(p)) => p,
                _ => return Err(TransportError::NotConnected(conn))
            }
        };
        let peer_endpoint = match s.qps.get(&peer) {
            Some(pqp) => pqp.endpoint,
            None => return Err(TransportError::NotConnected(conn))
        };

        let wr_id = wr.wr_id();
        let done = |s: &FabricState, opcode: Opcode, status: WcStatus, byte_len: usize| {
            if status != WcStatus::Success {
                warn!("Loopback {:?} on {} failed: {:?}", opcode, conn, status);
            }
            s.complete(self.id, WorkCompletion { wr_id, conn, opcode, status, byte_len });
        };

        match wr {
            WorkRequest::Send{local, ..} => {
                if !s.check_local(self.id, &local, AccessFlags::empty()) {
                    done(&*s, Opcode::Send, WcStatus::LocalProtectionError, 0);
                    return Ok(());
                }
                let bytes = unsafe { slice::from_raw_parts(local.addr as *const u8, local.length).to_vec() };

                let posted = match s.qps.get_mut(&peer) {
                    Some(pqp) => match pqp.recvs.pop_front() {
                        Some(r) => Some(r),
                        None => {
                            pqp.unreceived.push_back(bytes.clone());
                            None
                        }
                    },
                    None => None
                };

                let status = match posted {
                    Some((rwr, rsge)) => {
                        if s.deliver(peer_endpoint, peer, rwr, rsge, &bytes) {
                            WcStatus::Success
                        } else {
                            WcStatus::RemoteInvalidRequest
                        }
                    },
                    None => WcStatus::Success
                };
                done(&*s, Opcode::Send, status, bytes.len());
            },

            WorkRequest::RdmaWrite{local, remote_addr, rkey, ..} => {
                if !s.check_local(self.id, &local, AccessFlags::empty()) {
                    done(&*s, Opcode::RdmaWrite, WcStatus::LocalProtectionError, 0);
                } else if !s.check_remote(peer_endpoint, remote_addr, local.length, rkey, AccessFlags::REMOTE_WRITE) {
                    done(&*s, Opcode::RdmaWrite, WcStatus::RemoteAccessError, 0);
                } else {
                    unsafe { ptr::copy(local.addr as *const u8, remote_addr as *mut u8, local.length) };
                    done(&*s, Opcode::RdmaWrite, WcStatus::Success, local.length);
                }
            },

            WorkRequest::RdmaRead{local, remote_addr, rkey, ..} => {
                if !s.check_local(self.id, &local, AccessFlags::LOCAL_WRITE) {
                    done(&*s, Opcode::RdmaRead, WcStatus::LocalProtectionError, 0);
                } else if !s.check_remote(peer_endpoint, remote_addr, local.length, rkey, AccessFlags::REMOTE_READ) {
                    done(&*s, Opcode::RdmaRead, WcStatus::RemoteAccessError, 0);
                } else {
                    unsafe { ptr::copy(remote_addr as *const u8, local.addr as *mut u8, local.length) };
                    done(&*s, Opcode::RdmaRead, WcStatus::Success, local.length);
                }
            },
        }
        Ok(())
    }

    fn cm_events(&self) -> Receiver<CmEvent> {
        self.cm.clone()
    }

    fn completions(&self) -> Receiver<WorkCompletion> {
        self.cq.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::AlignedBuffer;

    fn region(ep: &Endpoint, buf: &mut AlignedBuffer, access: AccessFlags) -> MemoryRegion {
        unsafe { ep.register_memory(buf.as_mut_ptr(), buf.len(), access).unwrap() }
    }

    fn connected(fabric: &Fabric) -> (Endpoint, ConnId, Endpoint, ConnId) {
        let server = fabric.endpoint();
        let client = fabric.endpoint();
        server.listen("node0").unwrap();

        let c = client.resolve_addr("node0").unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::AddrResolved(c));
        client.resolve_route(c).unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::RouteResolved(c));
        client.connect(c).unwrap();

        let s = match server.cm_events().recv().unwrap() {
            CmEvent::ConnectRequest(s) => s,
            e => panic!("unexpected {:?}", e)
        };
        server.accept(s).unwrap();
        assert_eq!(server.cm_events().recv().unwrap(), CmEvent::Established(s));
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::Established(c));

        (server, s, client, c)
    }

    #[test]
    fn unknown_address() {
        let fabric = Fabric::new();
        let client = fabric.endpoint();
        let c = client.resolve_addr("nowhere").unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::AddrError(c));
        assert_eq!(client.resolve_route(c), Err(TransportError::UnknownConnection(c)));
        assert!(fabric.state.lock().unwrap().qps.is_empty());
    }

    #[test]
    fn lost_route_releases_queue_pair() {
        let fabric = Fabric::new();
        let server = fabric.endpoint();
        let client = fabric.endpoint();
        server.listen("gone").unwrap();

        let c = client.resolve_addr("gone").unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::AddrResolved(c));
        drop(server);

        client.resolve_route(c).unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::RouteError(c));
        assert!(fabric.state.lock().unwrap().qps.is_empty());
        assert_eq!(client.connect(c), Err(TransportError::UnknownConnection(c)));
    }

    #[test]
    fn closed_connections_leave_no_queue_pairs() {
        let fabric = Fabric::new();
        for _ in 0 .. 3 {
            let (server, s, client, c) = connected(&fabric);
            assert_eq!(fabric.state.lock().unwrap().qps.len(), 2);
            client.disconnect(c).unwrap();
            assert_eq!(server.cm_events().recv().unwrap(), CmEvent::Disconnected(s));
            assert!(fabric.state.lock().unwrap().qps.is_empty());
        }
    }

    #[test]
    fn duplicate_listen() {
        let fabric = Fabric::new();
        let a = fabric.endpoint();
        let b = fabric.endpoint();
        a.listen("x").unwrap();
        assert!(b.listen("x").is_err());
    }

    #[test]
    fn send_waits_for_posted_receive() {
        let fabric = Fabric::new();
        let (server, s, client, c) = connected(&fabric);

        let mut sbuf = AlignedBuffer::new(64).unwrap();
        let mut rbuf = AlignedBuffer::new(64).unwrap();
        let smr = region(&client, &mut sbuf, AccessFlags::LOCAL_WRITE);
        let rmr = region(&server, &mut rbuf, AccessFlags::LOCAL_WRITE);

        sbuf.as_mut_slice()[..3].copy_from_slice(b"abc");
        client.post_send(c, WorkRequest::Send{ wr_id: 9, local: smr.sge(0, 3) }).unwrap();

        let wc = client.completions().recv().unwrap();
        assert_eq!((wc.wr_id, wc.opcode, wc.status), (9, Opcode::Send, WcStatus::Success));
        assert!(server.completions().try_recv().is_err());

        server.post_recv(s, 2, rmr.sge(0, 64)).unwrap();
        let wc = server.completions().recv().unwrap();
        assert_eq!((wc.wr_id, wc.opcode, wc.byte_len, wc.conn), (2, Opcode::Recv, 3, s));
        assert_eq!(&rbuf.as_slice()[..3], b"abc");
    }

    #[test]
    fn oversized_send() {
        let fabric = Fabric::new();
        let (server, s, client, c) = connected(&fabric);

        let mut sbuf = AlignedBuffer::new(64).unwrap();
        let mut rbuf = AlignedBuffer::new(64).unwrap();
        let smr = region(&client, &mut sbuf, AccessFlags::LOCAL_WRITE);
        let rmr = region(&server, &mut rbuf, AccessFlags::LOCAL_WRITE);

        server.post_recv(s, 0, rmr.sge(0, 4)).unwrap();
        client.post_send(c, WorkRequest::Send{ wr_id: 1, local: smr.sge(0, 8) }).unwrap();

        assert_eq!(server.completions().recv().unwrap().status, WcStatus::LocalLengthError);
        assert_eq!(client.completions().recv().unwrap().status, WcStatus::RemoteInvalidRequest);
    }

    #[test]
    fn one_sided_access() {
        let fabric = Fabric::new();
        let (server, _s, client, c) = connected(&fabric);

        let mut remote = AlignedBuffer::new(128).unwrap();
        let rw = region(&server, &mut remote,
            AccessFlags::LOCAL_WRITE | AccessFlags::REMOTE_READ | AccessFlags::REMOTE_WRITE);
        let ro = region(&server, &mut remote, AccessFlags::REMOTE_READ);

        let mut local = AlignedBuffer::new(16).unwrap();
        let lmr = region(&client, &mut local, AccessFlags::LOCAL_WRITE);
        local.as_mut_slice().copy_from_slice(&[5u8; 16]);

        client.post_send(c, WorkRequest::RdmaWrite{
            wr_id: 1, local: lmr.sge(0, 16), remote_addr: rw.addr + 100, rkey: rw.rkey }).unwrap();
        let wc = client.completions().recv().unwrap();
        assert_eq!((wc.opcode, wc.status, wc.byte_len), (Opcode::RdmaWrite, WcStatus::Success, 16));
        assert_eq!(&remote.as_slice()[100..116], &[5u8; 16]);
        assert!(server.completions().try_recv().is_err());

        // Past the end of the region
        client.post_send(c, WorkRequest::RdmaWrite{
            wr_id: 2, local: lmr.sge(0, 16), remote_addr: rw.addr + 120, rkey: rw.rkey }).unwrap();
        assert_eq!(client.completions().recv().unwrap().status, WcStatus::RemoteAccessError);

        // Region lacks remote write permission
        client.post_send(c, WorkRequest::RdmaWrite{
            wr_id: 3, local: lmr.sge(0, 16), remote_addr: ro.addr, rkey: ro.rkey }).unwrap();
        assert_eq!(client.completions().recv().unwrap().status, WcStatus::RemoteAccessError);

        remote.as_mut_slice()[0] = 42;
        client.post_send(c, WorkRequest::RdmaRead{
            wr_id: 4, local: lmr.sge(0, 1), remote_addr: ro.addr, rkey: ro.rkey }).unwrap();
        assert_eq!(client.completions().recv().unwrap().status, WcStatus::Success);
        assert_eq!(local.as_slice()[0], 42);

        server.deregister_memory(&rw).unwrap();
        client.post_send(c, WorkRequest::RdmaRead{
            wr_id: 5, local: lmr.sge(0, 1), remote_addr: rw.addr, rkey: rw.rkey }).unwrap();
        assert_eq!(client.completions().recv().unwrap().status, WcStatus::RemoteAccessError);
    }

    #[test]
    fn disconnect_notifies_both_sides() {
        let fabric = Fabric::new();
        let (server, s, client, c) = connected(&fabric);

        client.disconnect(c).unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::Disconnected(c));
        assert_eq!(server.cm_events().recv().unwrap(), CmEvent::Disconnected(s));
        assert_eq!(server.disconnect(s), Err(TransportError::UnknownConnection(s)));
    }

    #[test]
    fn dropped_endpoint_disconnects_peer() {
        let fabric = Fabric::new();
        let (server, s, client, _c) = connected(&fabric);
        drop(client);
        assert_eq!(server.cm_events().recv().unwrap(), CmEvent::Disconnected(s));
    }

    #[test]
    fn rejected_connection() {
        let fabric = Fabric::new();
        let server = fabric.endpoint();
        let client = fabric.endpoint();
        server.listen("node1").unwrap();

        let c = client.resolve_addr("node1").unwrap();
        client.cm_events().recv().unwrap();
        client.resolve_route(c).unwrap();
        client.cm_events().recv().unwrap();
        client.connect(c).unwrap();

        let s = server.cm_events().recv().unwrap().conn();
        server.reject(s).unwrap();
        assert_eq!(client.cm_events().recv().unwrap(), CmEvent::Rejected(c));
    }
}
