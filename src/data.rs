//! Byte-level encoding helpers
//!
//! `DataMut` is a growable little-endian writer whose offset may be moved back
//! to patch fields that are only known once later content has been written.
//! `RawData` reads from a borrowed buffer. Unlike the writer, every read is
//! bounds checked since its input arrives from the network or from disk.

use std::fmt;

use integer_encoding::VarInt;

/// Longest varint encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Returned when a read runs past the end of the buffer or hits a malformed varint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRead {
    pub offset: usize,
    pub wanted: usize,
    pub available: usize
}

impl fmt::Display for ShortRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortRead(offset:{}, wanted:{}, available:{})", self.offset, self.wanted, self.available)
    }
}

impl std::error::Error for ShortRead {}

#[derive(Debug, Default)]
pub struct DataMut {
    v: Vec<u8>,
    offset: usize
}

impl DataMut {
    pub fn with_capacity(capacity: usize) -> DataMut {
        DataMut {
            v : Vec::with_capacity(capacity),
            offset : 0
        }
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, new_offset: usize) {
        assert!(new_offset <= self.v.len(), "Attempted to set offset past the end of valid data");
        self.offset = new_offset;
    }

    /// Moves the offset back to the end of the written data
    pub fn seek_end(&mut self) {
        self.offset = self.v.len();
    }

    pub fn finalize(self) -> Vec<u8> {
        self.v
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.v[..]
    }

    pub fn zfill(&mut self, nbytes: usize) {
        for _ in 0 .. nbytes {
            self.put_u8(0u8);
        }
    }

    pub fn put_slice(&mut self, s: &[u8]) {
        if self.offset == self.v.len() {
            self.v.extend_from_slice(s);
        } else if self.offset + s.len() <= self.v.len() {
            self.v[self.offset .. self.offset + s.len()].copy_from_slice(s);
        } else {
            let n = self.v.len() - self.offset;
            let vlen = self.v.len();
            self.v[self.offset .. vlen].copy_from_slice(&s[..n]);
            self.v.extend_from_slice(&s[n..]);
        }

        self.offset += s.len();
    }

    pub fn put_u8(&mut self, x: u8) {
        self.put_slice(&[x]);
    }

    pub fn put_i8(&mut self, x: i8) {
        self.put_u8(x as u8);
    }

    pub fn put_u32_le(&mut self, x: u32) {
        self.put_slice(&x.to_le_bytes());
    }

    pub fn put_u64_le(&mut self, x: u64) {
        self.put_slice(&x.to_le_bytes());
    }

    pub fn put_varint(&mut self, x: u64) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let n = x.encode_var(&mut buf);
        self.put_slice(&buf[..n]);
    }

    pub fn put_varint_prefixed_slice(&mut self, s: &[u8]) {
        self.put_varint(s.len() as u64);
        self.put_slice(s);
    }
}

/// Checked reader over a borrowed buffer
#[derive(Eq, PartialEq, Debug)]
pub struct RawData<'a> {
    buffer: &'a [u8],
    offset: usize
}

impl<'a> RawData<'a> {
    pub fn new(buffer: &'a [u8]) -> RawData<'a> {
        RawData {
            buffer,
            offset: 0
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    pub fn set_offset(&mut self, new_offset: usize) -> Result<(), ShortRead> {
        if new_offset > self.buffer.len() {
            return Err(ShortRead {
                offset: new_offset,
                wanted: 0,
                available: 0
            });
        }
        self.offset = new_offset;
        Ok(())
    }

    pub fn get_slice(&mut self, nbytes: usize) -> Result<&'a [u8], ShortRead> {
        if nbytes > self.remaining() {
            return Err(ShortRead {
                offset: self.offset,
                wanted: nbytes,
                available: self.remaining()
            });
        }
        let o = self.offset;
        self.offset += nbytes;
        Ok(&self.buffer[o .. o + nbytes])
    }

    pub fn get_u8(&mut self) -> Result<u8, ShortRead> {
        Ok(self.get_slice(1)?[0])
    }

    pub fn get_i8(&mut self) -> Result<i8, ShortRead> {
        Ok(self.get_u8()? as i8)
    }

    pub fn get_u16_le(&mut self) -> Result<u16, ShortRead> {
        let s = self.get_slice(2)?;
        Ok(u16::from_le_bytes([s[0], s[1]]))
    }

    pub fn get_u32_le(&mut self) -> Result<u32, ShortRead> {
        let s = self.get_slice(4)?;
        Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn get_i32_le(&mut self) -> Result<i32, ShortRead> {
        Ok(self.get_u32_le()? as i32)
    }

    pub fn get_u64_le(&mut self) -> Result<u64, ShortRead> {
        let s = self.get_slice(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(s);
        Ok(u64::from_le_bytes(a))
    }

    pub fn get_varint(&mut self) -> Result<u64, ShortRead> {
        let rest = &self.buffer[self.offset ..];
        let window = &rest[.. rest.len().min(MAX_VARINT_LEN)];

        // The varint must terminate within the window, otherwise it is either
        // truncated or longer than any u64 encoding.
        let end = match window.iter().position(|b| b & 0x80 == 0) {
            Some(idx) => idx + 1,
            None => return Err(ShortRead {
                offset: self.offset,
                wanted: window.len() + 1,
                available: window.len()
            })
        };

        let (value, nbytes) = u64::decode_var(&window[..end]);
        self.offset += nbytes;
        Ok(value)
    }

    pub fn get_varint_prefixed_slice(&mut self) -> Result<&'a [u8], ShortRead> {
        let nbytes = self.get_varint()?;
        if nbytes > self.remaining() as u64 {
            return Err(ShortRead {
                offset: self.offset,
                wanted: nbytes as usize,
                available: self.remaining()
            });
        }
        self.get_slice(nbytes as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_earlier_field() {
        let mut d = DataMut::with_capacity(8);
        d.put_u32_le(0);
        d.put_u32_le(7);
        d.set_offset(0);
        d.put_u32_le(0x0D0C0B0A);
        assert_eq!(d.offset(), 4);
        d.seek_end();
        d.put_u8(1);
        assert_eq!(d.as_bytes(), &[0xA, 0xB, 0xC, 0xD, 7, 0, 0, 0, 1]);
    }

    #[test]
    fn reads_fixed_width() {
        let mut d = DataMut::with_capacity(16);
        d.put_u8(3);
        d.put_i8(-1);
        d.put_u64_le(u64::max_value());
        let v = d.finalize();

        let mut r = RawData::new(&v);
        assert_eq!(r.get_u8(), Ok(3));
        assert_eq!(r.get_i8(), Ok(-1));
        assert_eq!(r.get_u64_le(), Ok(u64::max_value()));
        assert_eq!(r.remaining(), 0);

        let v = [0x34u8, 0x12, 0xFC, 0xFF, 0xFF, 0xFF];
        let mut r = RawData::new(&v);
        assert_eq!(r.get_u16_le(), Ok(0x1234));
        assert_eq!(r.get_i32_le(), Ok(-4));
    }

    #[test]
    fn short_read_is_reported() {
        let v = [1u8, 2, 3];
        let mut r = RawData::new(&v);
        let e = r.get_u32_le().unwrap_err();
        assert_eq!(e.wanted, 4);
        assert_eq!(e.available, 3);
        // A failed read does not consume anything
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn varint_prefixed_slices() {
        let mut d = DataMut::with_capacity(16);
        d.put_varint_prefixed_slice(b"");
        d.put_varint_prefixed_slice(b"10.0.0.1:7000");
        let v = d.finalize();

        let mut r = RawData::new(&v);
        assert_eq!(r.get_varint_prefixed_slice(), Ok(&b""[..]));
        assert_eq!(r.get_varint_prefixed_slice(), Ok(&b"10.0.0.1:7000"[..]));
    }

    #[test]
    fn unterminated_varint() {
        let v = [0xFFu8, 0xFF];
        let mut r = RawData::new(&v);
        assert!(r.get_varint().is_err());

        let v = [0xFFu8; 12];
        let mut r = RawData::new(&v);
        assert!(r.get_varint().is_err());
    }

    #[test]
    fn length_prefix_larger_than_buffer() {
        let mut d = DataMut::with_capacity(4);
        d.put_varint(200);
        d.put_slice(b"abc");
        let v = d.finalize();
        let mut r = RawData::new(&v);
        assert!(r.get_varint_prefixed_slice().is_err());
    }
}
