//! Registered message buffers for one connection
//!
//! The receive buffer is split into equally sized slots, one per posted
//! receive, and the work request id of each receive is its slot index. A
//! single send buffer holds the outgoing message.

use super::{AccessFlags, AlignedBuffer, ConnId, MemoryRegion, Transport, TransportError, WorkRequest};

pub struct MessageBuffers {
    slots: usize,
    slot_size: usize,
    recv: AlignedBuffer,
    recv_mr: MemoryRegion,
    send: AlignedBuffer,
    send_mr: MemoryRegion
}

impl MessageBuffers {
    pub fn new(transport: &dyn Transport, slots: usize, slot_size: usize) -> Result<MessageBuffers, TransportError> {
        let mut recv = AlignedBuffer::new(slots * slot_size)?;
        let mut send = AlignedBuffer::new(slot_size)?;

        let recv_mr = unsafe { transport.register_memory(recv.as_mut_ptr(), recv.len(), AccessFlags::LOCAL_WRITE)? };
        let send_mr = match unsafe { transport.register_memory(send.as_mut_ptr(), send.len(), AccessFlags::LOCAL_WRITE) } {
            Ok(mr) => mr,
            Err(e) => {
                let _ = transport.deregister_memory(&recv_mr);
                return Err(e);
            }
        };

        Ok(MessageBuffers {
            slots,
            slot_size,
            recv,
            recv_mr,
            send,
            send_mr
        })
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Posts a receive for every slot
    pub fn post_receives(&self, transport: &dyn Transport, conn: ConnId) -> Result<(), TransportError> {
        for slot in 0 .. self.slots {
            self.repost(transport, conn, slot)?;
        }
        Ok(())
    }

    pub fn repost(&self, transport: &dyn Transport, conn: ConnId, slot: usize) -> Result<(), TransportError> {
        if slot >= self.slots {
            return Err(TransportError::OutOfBounds);
        }
        let sge = self.recv_mr.sge(slot * self.slot_size, self.slot_size);
        transport.post_recv(conn, slot as u64, sge)
    }

    /// Bytes delivered into `slot` by a completed receive of `len` bytes
    pub fn received(&self, slot: usize, len: usize) -> Option<&[u8]> {
        if slot >= self.slots || len > self.slot_size {
            return None;
        }
        let start = slot * self.slot_size;
        Some(&self.recv.as_slice()[start .. start + len])
    }

    pub fn send(
        &mut self,
        transport: &dyn Transport,
        conn: ConnId,
        wr_id: u64,
        msg: &[u8]) -> Result<(), TransportError> {

        if msg.len() > self.slot_size {
            return Err(TransportError::OutOfBounds);
        }
        self.send.as_mut_slice()[..msg.len()].copy_from_slice(msg);

        transport.post_send(conn, WorkRequest::Send {
            wr_id,
            local: self.send_mr.sge(0, msg.len())
        })
    }

    pub fn release(self, transport: &dyn Transport) {
        let _ = transport.deregister_memory(&self.recv_mr);
        let _ = transport.deregister_memory(&self.send_mr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback::Fabric;
    use crate::transport::{CmEvent, Opcode};

    #[test]
    fn slots_round_trip() {
        let fabric = Fabric::new();
        let a = fabric.endpoint();
        let b = fabric.endpoint();
        a.listen("a").unwrap();

        let cb = b.resolve_addr("a").unwrap();
        b.cm_events().recv().unwrap();
        b.resolve_route(cb).unwrap();
        b.cm_events().recv().unwrap();
        b.connect(cb).unwrap();
        let ca = a.cm_events().recv().unwrap().conn();
        a.accept(ca).unwrap();
        assert_eq!(b.cm_events().recv().unwrap(), CmEvent::Established(cb));

        let abuf = MessageBuffers::new(&a, 2, 32).unwrap();
        let mut bbuf = MessageBuffers::new(&b, 2, 32).unwrap();
        abuf.post_receives(&a, ca).unwrap();

        bbuf.send(&b, cb, 100, b"first").unwrap();
        bbuf.send(&b, cb, 101, b"second").unwrap();
        assert!(bbuf.send(&b, cb, 102, &[0u8; 33]).is_err());

        let w1 = a.completions().recv().unwrap();
        let w2 = a.completions().recv().unwrap();
        assert_eq!(w1.opcode, Opcode::Recv);
        assert_eq!(abuf.received(w1.wr_id as usize, w1.byte_len), Some(&b"first"[..]));
        assert_eq!(abuf.received(w2.wr_id as usize, w2.byte_len), Some(&b"second"[..]));
        assert_eq!(abuf.received(2, 1), None);

        abuf.release(&a);
        bbuf.release(&b);
    }
}
