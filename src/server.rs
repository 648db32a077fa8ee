//! Allocation server
//!
//! A single event-loop thread owns the transport endpoint, the connection
//! table and the request handler. It drains connection manager events and
//! work completions, decodes each received frame and answers it with exactly
//! one acknowledgement. Because nothing else touches that state it needs no
//! locking.
//!
//! An undecodable frame, or an acknowledgement arriving at the server, stops
//! the loop. The error is returned from `Server::wait` / `Server::shutdown`.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::thread;

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::protocol::{self, DecodeError, Message, ObjectId, Tag};
use crate::transport::{CmEvent, ConnId, Opcode, Transport, TransportError, WcStatus, WorkCompletion};

pub mod connection;
pub mod object_store;
pub mod pool;

pub use connection::ConnState;
pub use object_store::StoreHandler;
pub use pool::PoolStats;

#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Transport(TransportError),
    Protocol(DecodeError),
    UnexpectedMessage(Tag),
    Thread(io::Error),
    Panicked
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "Config({})", e),
            ServerError::Transport(e) => write!(f, "Transport({})", e),
            ServerError::Protocol(e) => write!(f, "Protocol({})", e),
            ServerError::UnexpectedMessage(t) => write!(f, "UnexpectedMessage({})", t),
            ServerError::Thread(e) => write!(f, "Thread({})", e),
            ServerError::Panicked => write!(f, "Panicked"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> ServerError {
        ServerError::Config(e)
    }
}

impl From<TransportError> for ServerError {
    fn from(e: TransportError) -> ServerError {
        ServerError::Transport(e)
    }
}

impl From<DecodeError> for ServerError {
    fn from(e: DecodeError) -> ServerError {
        ServerError::Protocol(e)
    }
}

/// Answer to an Alloc request. All zero when nothing was allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocReply {
    pub mr_id: u64,
    pub remote_addr: u64,
    pub peer_capability: u64
}

/// Per-request state handed to a `RequestHandler`
pub struct Context<'a> {
    pub conn: ConnId,
    pub transport: &'a dyn Transport
}

/// Produces the acknowledgement for each request
///
/// KeepAlive, Sub, Flush and Lock echo their argument unless overridden.
pub trait RequestHandler {
    /// Called before every request is dispatched
    fn prepare(&mut self, _ctx: &Context) {}

    fn alloc(&mut self, ctx: &Context, size: u64, key: &str) -> AllocReply;

    /// Returns false if `addr` does not name a live allocation
    fn dealloc(&mut self, ctx: &Context, addr: u64) -> bool;

    fn keep_alive(&mut self, _ctx: &Context, nonce: u64) -> u64 {
        nonce
    }

    fn subscribe(&mut self, _ctx: &Context, oid: ObjectId, _addr: &str) -> ObjectId {
        oid
    }

    fn flush(&mut self, _ctx: &Context, oid: ObjectId) -> ObjectId {
        oid
    }

    fn lock(&mut self, _ctx: &Context, id: u64) -> u64 {
        id
    }

    /// The connection named by `ctx` has gone away
    fn disconnected(&mut self, _ctx: &Context) {}

    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }

    fn shutdown(&mut self, _transport: &dyn Transport) {}
}

/// Maps a request onto its handler method and returns the acknowledgement
pub fn dispatch<H: RequestHandler + ?Sized>(
    handler: &mut H,
    ctx: &Context,
    msg: &Message) -> Result<Message, ServerError> {

    handler.prepare(ctx);

    let ack = match msg {
        Message::Alloc{size, key} => {
            let r = handler.alloc(ctx, *size, key);
            Message::AllocAck {
                mr_id: r.mr_id,
                remote_addr: r.remote_addr,
                peer_capability: r.peer_capability
            }
        },
        Message::Dealloc{addr} => {
            let result = if handler.dealloc(ctx, *addr) { 1 } else { 0 };
            Message::DeallocAck{ result }
        },
        Message::KeepAlive{nonce} => Message::KeepAliveAck{ nonce: handler.keep_alive(ctx, *nonce) },
        Message::Sub{oid, addr} => Message::SubAck{ oid: handler.subscribe(ctx, *oid, addr) },
        Message::Flush{oid} => Message::FlushAck{ oid: handler.flush(ctx, *oid) },
        Message::Lock{id} => Message::LockAck{ id: handler.lock(ctx, *id) },
        _ => return Err(ServerError::UnexpectedMessage(msg.tag()))
    };

    if !msg.is_answered_by(&ack) {
        return Err(ServerError::UnexpectedMessage(ack.tag()));
    }

    Ok(ack)
}

enum Control {
    Shutdown,
    ConnectionState(ConnId, Sender<Option<ConnState>>),
    Connections(Sender<Vec<(ConnId, ConnState)>>),
    PoolStats(Sender<Option<PoolStats>>)
}

struct EventLoop<T: Transport, H: RequestHandler> {
    transport: T,
    handler: H,
    connections: BTreeMap<ConnId, connection::Connection>,
    recv_slots: usize,
    message_size: usize
}

impl<T: Transport, H: RequestHandler> EventLoop<T, H> {
    fn run(&mut self, control: Receiver<Control>) -> Result<(), ServerError> {
        let result = self.poll(control);
        self.teardown();
        result
    }

    fn poll(&mut self, control: Receiver<Control>) -> Result<(), ServerError> {
        let cm = self.transport.cm_events();
        let cq = self.transport.completions();

        loop {
            select! {
                recv(cm) -> ev => match ev {
                    Ok(ev) => self.cm_event(ev),
                    Err(_) => return Ok(())
                },
                recv(cq) -> wc => match wc {
                    Ok(wc) => self.completion(wc)?,
                    Err(_) => return Ok(())
                },
                recv(control) -> c => match c {
                    Ok(Control::ConnectionState(id, reply)) => {
                        let _ = reply.send(self.connections.get(&id).map(|c| c.state()));
                    },
                    Ok(Control::Connections(reply)) => {
                        let _ = reply.send(self.connections.values().map(|c| (c.id(), c.state())).collect());
                    },
                    Ok(Control::PoolStats(reply)) => {
                        let _ = reply.send(self.handler.pool_stats());
                    },
                    Ok(Control::Shutdown) | Err(_) => return Ok(())
                }
            }
        }
    }

    fn cm_event(&mut self, ev: CmEvent) {
        let transport: &dyn Transport = &self.transport;

        match ev {
            CmEvent::ConnectRequest(id) => {
                match connection::Connection::accept(transport, id, self.recv_slots, self.message_size) {
                    Ok(c) => {
                        debug!("Accepted connection request {}", id);
                        self.connections.insert(id, c);
                    },
                    Err(e) => {
                        warn!("Rejecting connection request {}: {}", id, e);
                        let _ = transport.reject(id);
                    }
                }
            },
            CmEvent::Established(id) => match self.connections.get_mut(&id) {
                Some(c) => {
                    if let Err(e) = c.established(transport) {
                        warn!("Failed to set up {}: {}", id, e);
                    }
                },
                None => warn!("Established event for unknown {}", id)
            },
            CmEvent::Disconnected(id) => {
                if let Some(mut c) = self.connections.remove(&id) {
                    c.begin_close();
                    self.handler.disconnected(&Context { conn: id, transport });
                    c.close(transport);
                    debug!("Dropped {}, {} connections remain", id, self.connections.len());
                }
            },
            CmEvent::AddrError(id) | CmEvent::RouteError(id) | CmEvent::Rejected(id) => {
                warn!("Abandoning connection attempt {}: {:?}", id, ev);
            },
            CmEvent::AddrResolved(id) | CmEvent::RouteResolved(id) => {
                debug!("Ignoring {:?} for {}", ev, id);
            }
        }
    }

    fn completion(&mut self, wc: WorkCompletion) -> Result<(), ServerError> {
        match wc.opcode {
            Opcode::Recv => {
                let transport: &dyn Transport = &self.transport;
                let conn = match self.connections.get_mut(&wc.conn) {
                    Some(c) => c,
                    None => {
                        warn!("Receive completion for unknown {}", wc.conn);
                        return Ok(());
                    }
                };

                if wc.status != WcStatus::Success {
                    warn!("Receive on {} failed: {:?}", wc.conn, wc.status);
                    conn.repost(transport, wc.wr_id as usize);
                    return Ok(());
                }

                match conn.take_frame(transport, wc.wr_id as usize, wc.byte_len) {
                    Some(frame) => self.process_message(wc.conn, &frame),
                    None => {
                        warn!("{} completed receive into invalid slot {}", wc.conn, wc.wr_id);
                        Ok(())
                    }
                }
            },
            Opcode::Send => {
                if wc.status != WcStatus::Success {
                    warn!("Send on {} failed: {:?}", wc.conn, wc.status);
                }
                Ok(())
            },
            op => {
                warn!("Unexpected {:?} completion on {}", op, wc.conn);
                Ok(())
            }
        }
    }

    fn process_message(&mut self, id: ConnId, frame: &[u8]) -> Result<(), ServerError> {
        let msg = match protocol::decode(frame) {
            Ok(m) => m,
            Err(e) => {
                error!("{} sent an undecodable frame: {}", id, e);
                return Err(e.into());
            }
        };
        debug!("{} -> {}", id, msg);

        let transport: &dyn Transport = &self.transport;
        let ctx = Context { conn: id, transport };

        let ack = match dispatch(&mut self.handler, &ctx, &msg) {
            Ok(ack) => ack,
            Err(e) => {
                error!("{} sent {}: {}", id, msg, e);
                return Err(e);
            }
        };
        debug!("{} <- {}", id, ack);

        if let Some(c) = self.connections.get_mut(&id) {
            if let Err(e) = c.send(transport, &protocol::encode(&ack)) {
                warn!("Failed to send {} to {}: {}", ack, id, e);
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        let transport: &dyn Transport = &self.transport;

        for (id, c) in self.connections.iter_mut() {
            if c.state() != ConnState::Closed {
                c.begin_close();
                self.handler.disconnected(&Context { conn: *id, transport });
                c.close(transport);
                let _ = transport.disconnect(*id);
            }
        }
        self.handler.shutdown(transport);
        info!("Server event loop stopped");
    }
}

/// Handle to a running server
///
/// Dropping the handle shuts the server down.
pub struct Server {
    control: Sender<Control>,
    thread: Option<thread::JoinHandle<Result<(), ServerError>>>
}

impl Server {
    pub fn start<T, H>(config: &ServerConfig, transport: T, handler: H) -> Result<Server, ServerError>
        where T: Transport + 'static,
              H: RequestHandler + Send + 'static {

        config.validate()?;
        transport.listen(&config.listen_addr)?;
        info!("Listening on {}", config.listen_addr);

        let (control, control_rx) = unbounded();

        let mut event_loop = EventLoop {
            transport,
            handler,
            connections: BTreeMap::new(),
            recv_slots: config.recv_slots,
            message_size: config.message_size
        };

        let thread = thread::Builder::new()
            .name("server-event-loop".into())
            .spawn(move || event_loop.run(control_rx))
            .map_err(ServerError::Thread)?;

        Ok(Server {
            control,
            thread: Some(thread)
        })
    }

    fn query<R>(&self, make: impl FnOnce(Sender<R>) -> Control) -> Option<R> {
        let (tx, rx) = unbounded();
        self.control.send(make(tx)).ok()?;
        rx.recv().ok()
    }

    /// None if the connection is unknown or the event loop has stopped
    pub fn connection_state(&self, conn: ConnId) -> Option<ConnState> {
        self.query(|tx| Control::ConnectionState(conn, tx)).and_then(|s| s)
    }

    pub fn connections(&self) -> Vec<(ConnId, ConnState)> {
        self.query(Control::Connections).unwrap_or_default()
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.query(Control::PoolStats).and_then(|s| s)
    }

    /// Stops the event loop and returns the error that ended it, if any
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        let _ = self.control.send(Control::Shutdown);
        self.join()
    }

    /// Blocks until the event loop stops on its own
    pub fn wait(mut self) -> Result<(), ServerError> {
        self.join()
    }

    fn join(&mut self) -> Result<(), ServerError> {
        match self.thread.take() {
            Some(t) => t.join().unwrap_or(Err(ServerError::Panicked)),
            None => Ok(())
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Err(e) = self.join() {
            warn!("Server stopped with error: {}", e);
        }
    }
}
