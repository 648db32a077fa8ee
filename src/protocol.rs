//! Control messages exchanged between clients and the allocation server.
//!
//! Every request has exactly one acknowledgement type. The server answers each
//! request it receives with that acknowledgement and nothing else.

use std::fmt;

pub mod codec;

pub use codec::{decode, encode, DecodeError, MAX_FIXED_FRAME};

/// Identifies an object stored by a client
pub type ObjectId = u64;

/// Wire discriminant of a message, the type byte of the frame's union
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Alloc = 1,
    AllocAck = 2,
    Dealloc = 3,
    DeallocAck = 4,
    KeepAlive = 5,
    KeepAliveAck = 6,
    Sub = 7,
    SubAck = 8,
    Flush = 9,
    FlushAck = 10,
    Lock = 11,
    LockAck = 12,
}

impl Tag {
    pub fn from_u8(code: u8) -> Option<Tag> {
        match code {
            1 => Some(Tag::Alloc),
            2 => Some(Tag::AllocAck),
            3 => Some(Tag::Dealloc),
            4 => Some(Tag::DeallocAck),
            5 => Some(Tag::KeepAlive),
            6 => Some(Tag::KeepAliveAck),
            7 => Some(Tag::Sub),
            8 => Some(Tag::SubAck),
            9 => Some(Tag::Flush),
            10 => Some(Tag::FlushAck),
            11 => Some(Tag::Lock),
            12 => Some(Tag::LockAck),
            _ => None
        }
    }

    pub fn is_request(&self) -> bool {
        self.ack().is_some()
    }

    /// The acknowledgement tag for a request tag. None for acknowledgements.
    pub fn ack(&self) -> Option<Tag> {
        match self {
            Tag::Alloc => Some(Tag::AllocAck),
            Tag::Dealloc => Some(Tag::DeallocAck),
            Tag::Lock => Some(Tag::LockAck),
            Tag::Flush => Some(Tag::FlushAck),
            Tag::Sub => Some(Tag::SubAck),
            Tag::KeepAlive => Some(Tag::KeepAliveAck),
            _ => None
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Requests `size` bytes of pool memory. A non-empty `key` names the
    /// allocation so that repeated requests return the same region.
    Alloc {
        size: u64,
        key: String
    },
    /// `remote_addr` and `mr_id` are both zero when the request could not be
    /// satisfied.
    AllocAck {
        mr_id: u64,
        remote_addr: u64,
        peer_capability: u64
    },
    Dealloc {
        addr: u64
    },
    /// Non-zero on success
    DeallocAck {
        result: i8
    },
    KeepAlive {
        nonce: u64
    },
    KeepAliveAck {
        nonce: u64
    },
    Sub {
        oid: ObjectId,
        addr: String
    },
    SubAck {
        oid: ObjectId
    },
    Flush {
        oid: ObjectId
    },
    FlushAck {
        oid: ObjectId
    },
    Lock {
        id: u64
    },
    LockAck {
        id: u64
    },
}

impl Message {
    pub fn tag(&self) -> Tag {
        match self {
            Message::Alloc{..} => Tag::Alloc,
            Message::AllocAck{..} => Tag::AllocAck,
            Message::Dealloc{..} => Tag::Dealloc,
            Message::DeallocAck{..} => Tag::DeallocAck,
            Message::KeepAlive{..} => Tag::KeepAlive,
            Message::KeepAliveAck{..} => Tag::KeepAliveAck,
            Message::Sub{..} => Tag::Sub,
            Message::SubAck{..} => Tag::SubAck,
            Message::Flush{..} => Tag::Flush,
            Message::FlushAck{..} => Tag::FlushAck,
            Message::Lock{..} => Tag::Lock,
            Message::LockAck{..} => Tag::LockAck,
        }
    }

    pub fn is_request(&self) -> bool {
        self.tag().is_request()
    }

    /// True if `ack` is the acknowledgement type that answers this request
    pub fn is_answered_by(&self, ack: &Message) -> bool {
        self.tag().ack() == Some(ack.tag())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Alloc{size, key} => write!(f, "Alloc(size:{}, key:{:?})", size, key),
            Message::AllocAck{mr_id, remote_addr, ..} => write!(f, "AllocAck(mr:{}, addr:{:#x})", mr_id, remote_addr),
            Message::Dealloc{addr} => write!(f, "Dealloc(addr:{:#x})", addr),
            Message::DeallocAck{result} => write!(f, "DeallocAck({})", result),
            Message::KeepAlive{nonce} => write!(f, "KeepAlive({})", nonce),
            Message::KeepAliveAck{nonce} => write!(f, "KeepAliveAck({})", nonce),
            Message::Sub{oid, addr} => write!(f, "Sub(oid:{}, addr:{})", oid, addr),
            Message::SubAck{oid} => write!(f, "SubAck(oid:{})", oid),
            Message::Flush{oid} => write!(f, "Flush(oid:{})", oid),
            Message::FlushAck{oid} => write!(f, "FlushAck(oid:{})", oid),
            Message::Lock{id} => write!(f, "Lock({})", id),
            Message::LockAck{id} => write!(f, "LockAck({})", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for code in 0u8 ..= 255 {
            if let Some(tag) = Tag::from_u8(code) {
                assert_eq!(tag as u8, code);
            }
        }
        assert_eq!(Tag::from_u8(0), None);
        assert_eq!(Tag::from_u8(13), None);
        assert_eq!(Tag::from_u8(0xEE), None);
    }

    #[test]
    fn every_request_has_one_ack() {
        let requests = [Tag::Alloc, Tag::Dealloc, Tag::Lock, Tag::Flush, Tag::Sub, Tag::KeepAlive];
        for r in requests.iter() {
            let ack = r.ack().unwrap();
            assert!(!ack.is_request());
            assert_eq!(ack as u8, *r as u8 + 1);
        }
    }

    #[test]
    fn answered_by() {
        let req = Message::KeepAlive{ nonce: 3 };
        assert!(req.is_answered_by(&Message::KeepAliveAck{ nonce: 3 }));
        assert!(!req.is_answered_by(&Message::LockAck{ id: 3 }));
        assert!(!Message::LockAck{ id: 1 }.is_answered_by(&Message::LockAck{ id: 1 }));
    }
}
