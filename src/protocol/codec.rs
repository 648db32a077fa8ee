//! FlatBuffers encoding of control messages
//!
//! Each frame is a `Frame` table whose `data` union holds the message. The
//! union's type byte is the message discriminant and the union field is the
//! offset to its typed payload (see `schema/farstore_protocol.fbs`).
//!
//! The generated accessors trust the buffer they read, so `decode` walks the
//! frame's offsets, vtables and strings with a checked reader first. Nothing
//! in a malformed frame reaches the generated code.

use std::fmt;
use std::str;

// import the flatbuffers runtime library
extern crate flatbuffers;
// import the generated code
#[allow(dead_code, unused_imports)]
#[path = "./farstore_protocol_generated.rs"]
mod farstore_protocol_generated;
use farstore_protocol_generated::farstore::protocol as wire;

use crate::data::{RawData, ShortRead};
use super::{Message, Tag};

/// Upper bound on the encoded size of every message without a string field
pub const MAX_FIXED_FRAME: usize = 128;

const ROOT_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnknownTag(u8),
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize
    },
    BadOffset(usize),
    MissingPayload(Tag),
    InvalidUtf8
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownTag(t) => write!(f, "UnknownTag({})", t),
            DecodeError::Truncated{offset, wanted, available} => write!(f,
                "Truncated(offset:{}, wanted:{}, available:{})", offset, wanted, available),
            DecodeError::BadOffset(o) => write!(f, "BadOffset({})", o),
            DecodeError::MissingPayload(t) => write!(f, "MissingPayload({})", t),
            DecodeError::InvalidUtf8 => write!(f, "InvalidUtf8"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<ShortRead> for DecodeError {
    fn from(e: ShortRead) -> DecodeError {
        DecodeError::Truncated {
            offset: e.offset,
            wanted: e.wanted,
            available: e.available
        }
    }
}

fn union_type(tag: Tag) -> wire::Data {
    match tag {
        Tag::Alloc => wire::Data::Alloc,
        Tag::AllocAck => wire::Data::AllocAck,
        Tag::Dealloc => wire::Data::Dealloc,
        Tag::DeallocAck => wire::Data::DeallocAck,
        Tag::KeepAlive => wire::Data::KeepAlive,
        Tag::KeepAliveAck => wire::Data::KeepAliveAck,
        Tag::Sub => wire::Data::Sub,
        Tag::SubAck => wire::Data::SubAck,
        Tag::Flush => wire::Data::Flush,
        Tag::FlushAck => wire::Data::FlushAck,
        Tag::Lock => wire::Data::Lock,
        Tag::LockAck => wire::Data::LockAck,
    }
}

pub fn encode(msg: &Message) -> Vec<u8> {
    let mut fbb = flatbuffers::FlatBufferBuilder::new_with_capacity(MAX_FIXED_FRAME);

    let data = match msg {
        Message::Alloc{size, key} => {
            let key = fbb.create_string(key);
            wire::Alloc::create(&mut fbb, &wire::AllocArgs {
                size_: *size,
                key: Some(key)
            }).as_union_value()
        },
        Message::AllocAck{mr_id, remote_addr, peer_capability} => {
            wire::AllocAck::create(&mut fbb, &wire::AllocAckArgs {
                mr_id: *mr_id,
                remote_addr: *remote_addr,
                peer_capability: *peer_capability
            }).as_union_value()
        },
        Message::Dealloc{addr} => {
            wire::Dealloc::create(&mut fbb, &wire::DeallocArgs{ addr: *addr }).as_union_value()
        },
        Message::DeallocAck{result} => {
            wire::DeallocAck::create(&mut fbb, &wire::DeallocAckArgs{ result: *result }).as_union_value()
        },
        Message::KeepAlive{nonce} => {
            wire::KeepAlive::create(&mut fbb, &wire::KeepAliveArgs{ nonce: *nonce }).as_union_value()
        },
        Message::KeepAliveAck{nonce} => {
            wire::KeepAliveAck::create(&mut fbb, &wire::KeepAliveAckArgs{ nonce: *nonce }).as_union_value()
        },
        Message::Sub{oid, addr} => {
            let addr = fbb.create_string(addr);
            wire::Sub::create(&mut fbb, &wire::SubArgs {
                oid: *oid,
                addr: Some(addr)
            }).as_union_value()
        },
        Message::SubAck{oid} => {
            wire::SubAck::create(&mut fbb, &wire::SubAckArgs{ oid: *oid }).as_union_value()
        },
        Message::Flush{oid} => {
            wire::Flush::create(&mut fbb, &wire::FlushArgs{ oid: *oid }).as_union_value()
        },
        Message::FlushAck{oid} => {
            wire::FlushAck::create(&mut fbb, &wire::FlushAckArgs{ oid: *oid }).as_union_value()
        },
        Message::Lock{id} => {
            wire::Lock::create(&mut fbb, &wire::LockArgs{ id: *id }).as_union_value()
        },
        Message::LockAck{id} => {
            wire::LockAck::create(&mut fbb, &wire::LockAckArgs{ id: *id }).as_union_value()
        },
    };

    let frame = wire::Frame::create(&mut fbb, &wire::FrameArgs {
        data_type: union_type(msg.tag()),
        data: Some(data)
    });
    wire::finish_frame_buffer(&mut fbb, frame);

    fbb.finished_data().to_vec()
}

/// Field kinds of the payload tables
#[derive(Clone, Copy)]
enum Field {
    U64,
    I8,
    Str
}

/// Vtable slots of each payload table, in schema order
fn layout(tag: Tag) -> &'static [Field] {
    match tag {
        Tag::Alloc | Tag::Sub => &[Field::U64, Field::Str],
        Tag::AllocAck => &[Field::U64, Field::U64, Field::U64],
        Tag::DeallocAck => &[Field::I8],
        _ => &[Field::U64]
    }
}

const SLOT_DATA_TYPE: usize = 4;
const SLOT_DATA: usize = 6;

/// A table whose vtable and inline area lie within the frame
struct TableView {
    pos: usize,
    vtable: usize,
    vtable_len: usize,
    table_len: usize
}

fn read_at<'a>(frame: &'a [u8], offset: usize) -> Result<RawData<'a>, DecodeError> {
    let mut r = RawData::new(frame);
    r.set_offset(offset)?;
    Ok(r)
}

impl TableView {
    fn new(frame: &[u8], pos: usize) -> Result<TableView, DecodeError> {
        if pos < ROOT_SIZE {
            return Err(DecodeError::BadOffset(pos));
        }
        let soffset = read_at(frame, pos)?.get_i32_le()?;

        let vtable = pos as i64 - soffset as i64;
        if vtable < 0 || vtable as usize > frame.len() {
            return Err(DecodeError::BadOffset(pos));
        }
        let vtable = vtable as usize;

        let mut r = read_at(frame, vtable)?;
        let vtable_len = r.get_u16_le()? as usize;
        let table_len = r.get_u16_le()? as usize;

        if vtable_len < 4 || vtable_len % 2 != 0 || vtable + vtable_len > frame.len() {
            return Err(DecodeError::BadOffset(vtable));
        }
        if table_len < 4 || pos + table_len > frame.len() {
            return Err(DecodeError::BadOffset(pos));
        }

        Ok(TableView { pos, vtable, vtable_len, table_len })
    }

    /// Absolute position of a `size` byte field, None if it is absent
    fn field(&self, frame: &[u8], slot: usize, size: usize) -> Result<Option<usize>, DecodeError> {
        if slot + 2 > self.vtable_len {
            return Ok(None);
        }
        let fo = read_at(frame, self.vtable + slot)?.get_u16_le()? as usize;
        if fo == 0 {
            return Ok(None);
        }
        if fo < 4 || fo + size > self.table_len {
            return Err(DecodeError::BadOffset(self.pos + fo));
        }
        Ok(Some(self.pos + fo))
    }
}

/// Follows the unsigned offset stored at `pos`
fn follow(frame: &[u8], pos: usize) -> Result<usize, DecodeError> {
    let target = pos + read_at(frame, pos)?.get_u32_le()? as usize;
    if target >= frame.len() {
        return Err(DecodeError::BadOffset(target));
    }
    Ok(target)
}

fn check_string(frame: &[u8], pos: usize) -> Result<(), DecodeError> {
    let mut r = read_at(frame, follow(frame, pos)?)?;
    let len = r.get_u32_le()? as usize;
    match str::from_utf8(r.get_slice(len)?) {
        Ok(_) => Ok(()),
        Err(_) => Err(DecodeError::InvalidUtf8)
    }
}

/// Checks every offset the generated accessors will follow for this frame
fn verify(frame: &[u8]) -> Result<Tag, DecodeError> {
    let root = TableView::new(frame, follow(frame, 0)?)?;

    let code = match root.field(frame, SLOT_DATA_TYPE, 1)? {
        Some(pos) => read_at(frame, pos)?.get_u8()?,
        None => 0
    };
    let tag = match Tag::from_u8(code) {
        Some(t) => t,
        None => return Err(DecodeError::UnknownTag(code))
    };

    let payload = match root.field(frame, SLOT_DATA, 4)? {
        Some(pos) => TableView::new(frame, follow(frame, pos)?)?,
        None => return Err(DecodeError::MissingPayload(tag))
    };

    for (i, kind) in layout(tag).iter().enumerate() {
        let slot = 4 + 2 * i;
        match kind {
            Field::U64 => { payload.field(frame, slot, 8)?; },
            Field::I8 => { payload.field(frame, slot, 1)?; },
            Field::Str => {
                if let Some(pos) = payload.field(frame, slot, 4)? {
                    check_string(frame, pos)?;
                }
            }
        }
    }

    Ok(tag)
}

/// Decodes a single frame. Bytes following the frame are ignored.
pub fn decode(frame: &[u8]) -> Result<Message, DecodeError> {
    let tag = verify(frame)?;
    let root = wire::get_root_as_frame(frame);
    let missing = DecodeError::MissingPayload(tag);

    let msg = match tag {
        Tag::Alloc => {
            let m = root.data_as_alloc().ok_or(missing)?;
            Message::Alloc{ size: m.size_(), key: m.key().unwrap_or("").to_string() }
        },
        Tag::AllocAck => {
            let m = root.data_as_alloc_ack().ok_or(missing)?;
            Message::AllocAck {
                mr_id: m.mr_id(),
                remote_addr: m.remote_addr(),
                peer_capability: m.peer_capability()
            }
        },
        Tag::Dealloc => Message::Dealloc{ addr: root.data_as_dealloc().ok_or(missing)?.addr() },
        Tag::DeallocAck => Message::DeallocAck{ result: root.data_as_dealloc_ack().ok_or(missing)?.result() },
        Tag::KeepAlive => Message::KeepAlive{ nonce: root.data_as_keep_alive().ok_or(missing)?.nonce() },
        Tag::KeepAliveAck => Message::KeepAliveAck{ nonce: root.data_as_keep_alive_ack().ok_or(missing)?.nonce() },
        Tag::Sub => {
            let m = root.data_as_sub().ok_or(missing)?;
            Message::Sub{ oid: m.oid(), addr: m.addr().unwrap_or("").to_string() }
        },
        Tag::SubAck => Message::SubAck{ oid: root.data_as_sub_ack().ok_or(missing)?.oid() },
        Tag::Flush => Message::Flush{ oid: root.data_as_flush().ok_or(missing)?.oid() },
        Tag::FlushAck => Message::FlushAck{ oid: root.data_as_flush_ack().ok_or(missing)?.oid() },
        Tag::Lock => Message::Lock{ id: root.data_as_lock().ok_or(missing)?.id() },
        Tag::LockAck => Message::LockAck{ id: root.data_as_lock_ack().ok_or(missing)?.id() },
    };

    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_messages() -> Vec<Message> {
        let max = u64::max_value();
        vec![
            Message::Alloc{ size: 0, key: String::new() },
            Message::Alloc{ size: max, key: "bucket/object-7".to_string() },
            Message::AllocAck{ mr_id: 0, remote_addr: 0, peer_capability: 0 },
            Message::AllocAck{ mr_id: max, remote_addr: max, peer_capability: max },
            Message::Dealloc{ addr: max },
            Message::DeallocAck{ result: -128 },
            Message::DeallocAck{ result: 127 },
            Message::KeepAlive{ nonce: 0 },
            Message::KeepAliveAck{ nonce: max },
            Message::Sub{ oid: max, addr: "10.0.0.2:9000".to_string() },
            Message::Sub{ oid: 0, addr: String::new() },
            Message::SubAck{ oid: 1 },
            Message::Flush{ oid: 0 },
            Message::FlushAck{ oid: max },
            Message::Lock{ id: 0 },
            Message::LockAck{ id: max },
        ]
    }

    /// A root table holding only the union type byte
    fn type_only_frame(code: u8) -> Vec<u8> {
        vec![
            12, 0, 0, 0,        // root offset
            6, 0, 8, 0, 4, 0,   // vtable: 6 bytes, 8 byte table, type at +4
            0, 0,
            8, 0, 0, 0,         // table: vtable is 8 bytes back
            code, 0, 0, 0
        ]
    }

    #[test]
    fn boundary_values() {
        for m in boundary_messages() {
            let enc = encode(&m);
            assert_eq!(decode(&enc), Ok(m));
        }
    }

    #[test]
    fn fixed_frames_fit() {
        for m in boundary_messages() {
            match m {
                Message::Alloc{..} | Message::Sub{..} => (),
                m => assert!(encode(&m).len() <= MAX_FIXED_FRAME, "{} does not fit", m)
            }
        }
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut enc = encode(&Message::Flush{ oid: 5 });
        enc.extend_from_slice(&[0xAA; 16]);
        assert_eq!(decode(&enc), Ok(Message::Flush{ oid: 5 }));
    }

    #[test]
    fn unknown_tag() {
        assert_eq!(decode(&type_only_frame(0xEE)), Err(DecodeError::UnknownTag(0xEE)));
        assert_eq!(decode(&type_only_frame(13)), Err(DecodeError::UnknownTag(13)));
        assert_eq!(decode(&type_only_frame(0)), Err(DecodeError::UnknownTag(0)));
    }

    #[test]
    fn missing_payload() {
        assert_eq!(decode(&type_only_frame(Tag::Lock as u8)), Err(DecodeError::MissingPayload(Tag::Lock)));
    }

    #[test]
    fn truncated() {
        let enc = encode(&Message::AllocAck{ mr_id: 1, remote_addr: 2, peer_capability: 3 });
        for n in 0 .. enc.len() {
            match decode(&enc[..n]) {
                Err(DecodeError::Truncated{..}) | Err(DecodeError::BadOffset(_)) => (),
                other => panic!("unexpected result for {} bytes: {:?}", n, other)
            }
        }
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn bad_offsets() {
        let mut enc = encode(&Message::Lock{ id: 1 });
        enc[0] = 2;
        enc[1] = 0;
        assert_eq!(decode(&enc), Err(DecodeError::BadOffset(2)));

        let mut enc = encode(&Message::Lock{ id: 1 });
        enc[0] = 0xF0;
        enc[1] = 0xFF;
        assert!(decode(&enc).is_err());

        // Table whose vtable lies before the start of the frame
        let mut frame = type_only_frame(Tag::Lock as u8);
        frame[12] = 0x40;
        assert_eq!(decode(&frame), Err(DecodeError::BadOffset(12)));
    }

    #[test]
    fn every_corrupted_byte_is_rejected_or_decoded() {
        let msg = Message::Sub{ oid: 3, addr: "node9:4000".to_string() };
        let enc = encode(&msg);
        for i in 0 .. enc.len() {
            for flip in &[0x01u8, 0x80, 0xFF] {
                let mut bad = enc.clone();
                bad[i] ^= flip;
                // Either outcome is fine as long as nothing panics
                let _ = decode(&bad);
            }
        }
    }

    #[test]
    fn invalid_utf8() {
        let enc = encode(&Message::Sub{ oid: 1, addr: "ab".to_string() });
        let at = enc.windows(2).position(|w| w == b"ab").unwrap();
        let mut bad = enc.clone();
        bad[at + 1] = 0xFF;
        assert_eq!(decode(&bad), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn string_length_past_end() {
        let enc = encode(&Message::Alloc{ size: 4, key: "abc".to_string() });
        let at = enc.windows(3).position(|w| w == b"abc").unwrap();
        let mut bad = enc.clone();
        bad[at - 4] = 100;
        match decode(&bad) {
            Err(DecodeError::Truncated{..}) => (),
            other => panic!("unexpected {:?}", other)
        }
    }
}
