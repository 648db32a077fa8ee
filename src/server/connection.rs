use std::fmt;

use log::{info, warn};

use crate::transport::{ConnId, MessageBuffers, Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Established,
    Closing,
    Closed
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Server side of one client session
///
/// Buffers are registered when the connection request is accepted and
/// released when the session closes.
pub struct Connection {
    id: ConnId,
    state: ConnState,
    buffers: Option<MessageBuffers>,
    messages: u64
}

impl Connection {
    pub fn accept(
        transport: &dyn Transport,
        id: ConnId,
        slots: usize,
        message_size: usize) -> Result<Connection, TransportError> {

        let buffers = MessageBuffers::new(transport, slots, message_size)?;
        if let Err(e) = transport.accept(id) {
            buffers.release(transport);
            return Err(e);
        }

        Ok(Connection {
            id,
            state: ConnState::Connecting,
            buffers: Some(buffers),
            messages: 0
        })
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    /// Pre-posts every receive slot
    pub fn established(&mut self, transport: &dyn Transport) -> Result<(), TransportError> {
        if self.state != ConnState::Connecting {
            return Err(TransportError::InvalidState(self.id));
        }
        if let Some(b) = &self.buffers {
            b.post_receives(transport, self.id)?;
            info!("{} established with {} receive slots", self.id, b.slots());
        }
        self.state = ConnState::Established;
        Ok(())
    }

    /// Copies out a received frame and re-posts its slot before the caller
    /// processes the frame
    pub fn take_frame(&mut self, transport: &dyn Transport, slot: usize, len: usize) -> Option<Vec<u8>> {
        let frame = self.buffers.as_ref()?.received(slot, len)?.to_vec();
        self.repost(transport, slot);
        self.messages += 1;
        Some(frame)
    }

    pub fn repost(&self, transport: &dyn Transport, slot: usize) {
        if let Some(b) = &self.buffers {
            if let Err(e) = b.repost(transport, self.id, slot) {
                warn!("{} failed to re-post receive slot {}: {}", self.id, slot, e);
            }
        }
    }

    pub fn send(&mut self, transport: &dyn Transport, frame: &[u8]) -> Result<(), TransportError> {
        let id = self.id;
        let wr_id = self.messages;
        match &mut self.buffers {
            Some(b) if self.state == ConnState::Established => b.send(transport, id, wr_id, frame),
            _ => Err(TransportError::NotConnected(id))
        }
    }

    pub fn begin_close(&mut self) {
        self.state = ConnState::Closing;
    }

    /// Releases the registered buffers
    pub fn close(&mut self, transport: &dyn Transport) {
        if let Some(b) = self.buffers.take() {
            b.release(transport);
        }
        if self.state != ConnState::Closed {
            info!("{} closed after {} messages", self.id, self.messages);
        }
        self.state = ConnState::Closed;
    }
}
