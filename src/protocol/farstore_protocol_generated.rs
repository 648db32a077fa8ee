// automatically generated by the FlatBuffers compiler, do not modify


use std::mem;
use std::cmp::Ordering;

extern crate flatbuffers;
use self::flatbuffers::EndianScalar;

#[allow(unused_imports, dead_code)]
pub mod farstore {

  use std::mem;
  use std::cmp::Ordering;

  extern crate flatbuffers;
  use self::flatbuffers::EndianScalar;
#[allow(unused_imports, dead_code)]
pub mod protocol {

  use std::mem;
  use std::cmp::Ordering;

  extern crate flatbuffers;
  use self::flatbuffers::EndianScalar;

#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Data {
  NONE = 0,
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

const ENUM_MIN_DATA: u8 = 0;
const ENUM_MAX_DATA: u8 = 12;

impl<'a> flatbuffers::Follow<'a> for Data {
  type Inner = Self;
  #[inline]
  fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
    flatbuffers::read_scalar_at::<Self>(buf, loc)
  }
}

impl flatbuffers::EndianScalar for Data {
  #[inline]
  fn to_little_endian(self) -> Self {
    let n = u8::to_le(self as u8);
    let p = &n as *const u8 as *const Data;
    unsafe { *p }
  }
  #[inline]
  fn from_little_endian(self) -> Self {
    let n = u8::from_le(self as u8);
    let p = &n as *const u8 as *const Data;
    unsafe { *p }
  }
}

impl flatbuffers::Push for Data {
    type Output = Data;
    #[inline]
    fn push(&self, dst: &mut [u8], _rest: &[u8]) {
        flatbuffers::emplace_scalar::<Data>(dst, *self);
    }
}

#[allow(non_camel_case_types)]
const ENUM_VALUES_DATA:[Data; 13] = [
  Data::NONE,
  Data::Alloc,
  Data::AllocAck,
  Data::Dealloc,
  Data::DeallocAck,
  Data::KeepAlive,
  Data::KeepAliveAck,
  Data::Sub,
  Data::SubAck,
  Data::Flush,
  Data::FlushAck,
  Data::Lock,
  Data::LockAck
];

#[allow(non_camel_case_types)]
const ENUM_NAMES_DATA:[&'static str; 13] = [
    "NONE",
    "Alloc",
    "AllocAck",
    "Dealloc",
    "DeallocAck",
    "KeepAlive",
    "KeepAliveAck",
    "Sub",
    "SubAck",
    "Flush",
    "FlushAck",
    "Lock",
    "LockAck"
];

pub fn enum_name_data(e: Data) -> &'static str {
  let index = e as u8;
  ENUM_NAMES_DATA[index as usize]
}

pub struct DataUnionTableOffset {}
pub enum AllocOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct Alloc<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Alloc<'a> {
    type Inner = Alloc<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> Alloc<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        Alloc {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args AllocArgs<'args>) -> flatbuffers::WIPOffset<Alloc<'bldr>> {
      let mut builder = AllocBuilder::new(_fbb);
      builder.add_size_(args.size_);
      if let Some(x) = args.key { builder.add_key(x); }
      builder.finish()
    }

    pub const VT_SIZE_: flatbuffers::VOffsetT = 4;
    pub const VT_KEY: flatbuffers::VOffsetT = 6;

  #[inline]
  pub fn size_(&self) -> u64 {
    self._tab.get::<u64>(Alloc::VT_SIZE_, Some(0)).unwrap()
  }
  #[inline]
  pub fn key(&self) -> Option<&'a str> {
    self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Alloc::VT_KEY, None)
  }
}

pub struct AllocArgs<'a> {
    pub size_: u64,
    pub key: Option<flatbuffers::WIPOffset<&'a  str>>,
}
impl<'a> Default for AllocArgs<'a> {
    #[inline]
    fn default() -> Self {
        AllocArgs {
            size_: 0,
            key: None,
        }
    }
}
pub struct AllocBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> AllocBuilder<'a, 'b> {
  #[inline]
  pub fn add_size_(&mut self, size_: u64) {
    self.fbb_.push_slot::<u64>(Alloc::VT_SIZE_, size_, 0);
  }
  #[inline]
  pub fn add_key(&mut self, key: flatbuffers::WIPOffset<&'b  str>) {
    self.fbb_.push_slot_always::<flatbuffers::WIPOffset<_>>(Alloc::VT_KEY, key);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> AllocBuilder<'a, 'b> {
    let start = _fbb.start_table();
    AllocBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<Alloc<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum AllocAckOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct AllocAck<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for AllocAck<'a> {
    type Inner = AllocAck<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> AllocAck<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        AllocAck {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args AllocAckArgs) -> flatbuffers::WIPOffset<AllocAck<'bldr>> {
      let mut builder = AllocAckBuilder::new(_fbb);
      builder.add_mr_id(args.mr_id);
      builder.add_remote_addr(args.remote_addr);
      builder.add_peer_capability(args.peer_capability);
      builder.finish()
    }

    pub const VT_MR_ID: flatbuffers::VOffsetT = 4;
    pub const VT_REMOTE_ADDR: flatbuffers::VOffsetT = 6;
    pub const VT_PEER_CAPABILITY: flatbuffers::VOffsetT = 8;

  #[inline]
  pub fn mr_id(&self) -> u64 {
    self._tab.get::<u64>(AllocAck::VT_MR_ID, Some(0)).unwrap()
  }
  #[inline]
  pub fn remote_addr(&self) -> u64 {
    self._tab.get::<u64>(AllocAck::VT_REMOTE_ADDR, Some(0)).unwrap()
  }
  #[inline]
  pub fn peer_capability(&self) -> u64 {
    self._tab.get::<u64>(AllocAck::VT_PEER_CAPABILITY, Some(0)).unwrap()
  }
}

pub struct AllocAckArgs {
    pub mr_id: u64,
    pub remote_addr: u64,
    pub peer_capability: u64,
}
impl Default for AllocAckArgs {
    #[inline]
    fn default() -> Self {
        AllocAckArgs {
            mr_id: 0,
            remote_addr: 0,
            peer_capability: 0,
        }
    }
}
pub struct AllocAckBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> AllocAckBuilder<'a, 'b> {
  #[inline]
  pub fn add_mr_id(&mut self, mr_id: u64) {
    self.fbb_.push_slot::<u64>(AllocAck::VT_MR_ID, mr_id, 0);
  }
  #[inline]
  pub fn add_remote_addr(&mut self, remote_addr: u64) {
    self.fbb_.push_slot::<u64>(AllocAck::VT_REMOTE_ADDR, remote_addr, 0);
  }
  #[inline]
  pub fn add_peer_capability(&mut self, peer_capability: u64) {
    self.fbb_.push_slot::<u64>(AllocAck::VT_PEER_CAPABILITY, peer_capability, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> AllocAckBuilder<'a, 'b> {
    let start = _fbb.start_table();
    AllocAckBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<AllocAck<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum DeallocOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct Dealloc<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Dealloc<'a> {
    type Inner = Dealloc<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> Dealloc<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        Dealloc {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args DeallocArgs) -> flatbuffers::WIPOffset<Dealloc<'bldr>> {
      let mut builder = DeallocBuilder::new(_fbb);
      builder.add_addr(args.addr);
      builder.finish()
    }

    pub const VT_ADDR: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn addr(&self) -> u64 {
    self._tab.get::<u64>(Dealloc::VT_ADDR, Some(0)).unwrap()
  }
}

pub struct DeallocArgs {
    pub addr: u64,
}
impl Default for DeallocArgs {
    #[inline]
    fn default() -> Self {
        DeallocArgs {
            addr: 0,
        }
    }
}
pub struct DeallocBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> DeallocBuilder<'a, 'b> {
  #[inline]
  pub fn add_addr(&mut self, addr: u64) {
    self.fbb_.push_slot::<u64>(Dealloc::VT_ADDR, addr, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> DeallocBuilder<'a, 'b> {
    let start = _fbb.start_table();
    DeallocBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<Dealloc<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum DeallocAckOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct DeallocAck<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for DeallocAck<'a> {
    type Inner = DeallocAck<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> DeallocAck<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        DeallocAck {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args DeallocAckArgs) -> flatbuffers::WIPOffset<DeallocAck<'bldr>> {
      let mut builder = DeallocAckBuilder::new(_fbb);
      builder.add_result(args.result);
      builder.finish()
    }

    pub const VT_RESULT: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn result(&self) -> i8 {
    self._tab.get::<i8>(DeallocAck::VT_RESULT, Some(0)).unwrap()
  }
}

pub struct DeallocAckArgs {
    pub result: i8,
}
impl Default for DeallocAckArgs {
    #[inline]
    fn default() -> Self {
        DeallocAckArgs {
            result: 0,
        }
    }
}
pub struct DeallocAckBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> DeallocAckBuilder<'a, 'b> {
  #[inline]
  pub fn add_result(&mut self, result: i8) {
    self.fbb_.push_slot::<i8>(DeallocAck::VT_RESULT, result, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> DeallocAckBuilder<'a, 'b> {
    let start = _fbb.start_table();
    DeallocAckBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<DeallocAck<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum KeepAliveOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct KeepAlive<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for KeepAlive<'a> {
    type Inner = KeepAlive<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> KeepAlive<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        KeepAlive {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args KeepAliveArgs) -> flatbuffers::WIPOffset<KeepAlive<'bldr>> {
      let mut builder = KeepAliveBuilder::new(_fbb);
      builder.add_nonce(args.nonce);
      builder.finish()
    }

    pub const VT_NONCE: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn nonce(&self) -> u64 {
    self._tab.get::<u64>(KeepAlive::VT_NONCE, Some(0)).unwrap()
  }
}

pub struct KeepAliveArgs {
    pub nonce: u64,
}
impl Default for KeepAliveArgs {
    #[inline]
    fn default() -> Self {
        KeepAliveArgs {
            nonce: 0,
        }
    }
}
pub struct KeepAliveBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> KeepAliveBuilder<'a, 'b> {
  #[inline]
  pub fn add_nonce(&mut self, nonce: u64) {
    self.fbb_.push_slot::<u64>(KeepAlive::VT_NONCE, nonce, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> KeepAliveBuilder<'a, 'b> {
    let start = _fbb.start_table();
    KeepAliveBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<KeepAlive<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum KeepAliveAckOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct KeepAliveAck<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for KeepAliveAck<'a> {
    type Inner = KeepAliveAck<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> KeepAliveAck<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        KeepAliveAck {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args KeepAliveAckArgs) -> flatbuffers::WIPOffset<KeepAliveAck<'bldr>> {
      let mut builder = KeepAliveAckBuilder::new(_fbb);
      builder.add_nonce(args.nonce);
      builder.finish()
    }

    pub const VT_NONCE: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn nonce(&self) -> u64 {
    self._tab.get::<u64>(KeepAliveAck::VT_NONCE, Some(0)).unwrap()
  }
}

pub struct KeepAliveAckArgs {
    pub nonce: u64,
}
impl Default for KeepAliveAckArgs {
    #[inline]
    fn default() -> Self {
        KeepAliveAckArgs {
            nonce: 0,
        }
    }
}
pub struct KeepAliveAckBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> KeepAliveAckBuilder<'a, 'b> {
  #[inline]
  pub fn add_nonce(&mut self, nonce: u64) {
    self.fbb_.push_slot::<u64>(KeepAliveAck::VT_NONCE, nonce, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> KeepAliveAckBuilder<'a, 'b> {
    let start = _fbb.start_table();
    KeepAliveAckBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<KeepAliveAck<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum SubOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct Sub<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Sub<'a> {
    type Inner = Sub<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> Sub<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        Sub {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args SubArgs<'args>) -> flatbuffers::WIPOffset<Sub<'bldr>> {
      let mut builder = SubBuilder::new(_fbb);
      builder.add_oid(args.oid);
      if let Some(x) = args.addr { builder.add_addr(x); }
      builder.finish()
    }

    pub const VT_OID: flatbuffers::VOffsetT = 4;
    pub const VT_ADDR: flatbuffers::VOffsetT = 6;

  #[inline]
  pub fn oid(&self) -> u64 {
    self._tab.get::<u64>(Sub::VT_OID, Some(0)).unwrap()
  }
  #[inline]
  pub fn addr(&self) -> Option<&'a str> {
    self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Sub::VT_ADDR, None)
  }
}

pub struct SubArgs<'a> {
    pub oid: u64,
    pub addr: Option<flatbuffers::WIPOffset<&'a  str>>,
}
impl<'a> Default for SubArgs<'a> {
    #[inline]
    fn default() -> Self {
        SubArgs {
            oid: 0,
            addr: None,
        }
    }
}
pub struct SubBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> SubBuilder<'a, 'b> {
  #[inline]
  pub fn add_oid(&mut self, oid: u64) {
    self.fbb_.push_slot::<u64>(Sub::VT_OID, oid, 0);
  }
  #[inline]
  pub fn add_addr(&mut self, addr: flatbuffers::WIPOffset<&'b  str>) {
    self.fbb_.push_slot_always::<flatbuffers::WIPOffset<_>>(Sub::VT_ADDR, addr);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> SubBuilder<'a, 'b> {
    let start = _fbb.start_table();
    SubBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<Sub<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum SubAckOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct SubAck<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for SubAck<'a> {
    type Inner = SubAck<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> SubAck<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        SubAck {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args SubAckArgs) -> flatbuffers::WIPOffset<SubAck<'bldr>> {
      let mut builder = SubAckBuilder::new(_fbb);
      builder.add_oid(args.oid);
      builder.finish()
    }

    pub const VT_OID: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn oid(&self) -> u64 {
    self._tab.get::<u64>(SubAck::VT_OID, Some(0)).unwrap()
  }
}

pub struct SubAckArgs {
    pub oid: u64,
}
impl Default for SubAckArgs {
    #[inline]
    fn default() -> Self {
        SubAckArgs {
            oid: 0,
        }
    }
}
pub struct SubAckBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> SubAckBuilder<'a, 'b> {
  #[inline]
  pub fn add_oid(&mut self, oid: u64) {
    self.fbb_.push_slot::<u64>(SubAck::VT_OID, oid, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> SubAckBuilder<'a, 'b> {
    let start = _fbb.start_table();
    SubAckBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<SubAck<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum FlushOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct Flush<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Flush<'a> {
    type Inner = Flush<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> Flush<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        Flush {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args FlushArgs) -> flatbuffers::WIPOffset<Flush<'bldr>> {
      let mut builder = FlushBuilder::new(_fbb);
      builder.add_oid(args.oid);
      builder.finish()
    }

    pub const VT_OID: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn oid(&self) -> u64 {
    self._tab.get::<u64>(Flush::VT_OID, Some(0)).unwrap()
  }
}

pub struct FlushArgs {
    pub oid: u64,
}
impl Default for FlushArgs {
    #[inline]
    fn default() -> Self {
        FlushArgs {
            oid: 0,
        }
    }
}
pub struct FlushBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> FlushBuilder<'a, 'b> {
  #[inline]
  pub fn add_oid(&mut self, oid: u64) {
    self.fbb_.push_slot::<u64>(Flush::VT_OID, oid, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> FlushBuilder<'a, 'b> {
    let start = _fbb.start_table();
    FlushBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<Flush<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum FlushAckOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct FlushAck<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for FlushAck<'a> {
    type Inner = FlushAck<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> FlushAck<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        FlushAck {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args FlushAckArgs) -> flatbuffers::WIPOffset<FlushAck<'bldr>> {
      let mut builder = FlushAckBuilder::new(_fbb);
      builder.add_oid(args.oid);
      builder.finish()
    }

    pub const VT_OID: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn oid(&self) -> u64 {
    self._tab.get::<u64>(FlushAck::VT_OID, Some(0)).unwrap()
  }
}

pub struct FlushAckArgs {
    pub oid: u64,
}
impl Default for FlushAckArgs {
    #[inline]
    fn default() -> Self {
        FlushAckArgs {
            oid: 0,
        }
    }
}
pub struct FlushAckBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> FlushAckBuilder<'a, 'b> {
  #[inline]
  pub fn add_oid(&mut self, oid: u64) {
    self.fbb_.push_slot::<u64>(FlushAck::VT_OID, oid, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> FlushAckBuilder<'a, 'b> {
    let start = _fbb.start_table();
    FlushAckBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<FlushAck<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum LockOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct Lock<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Lock<'a> {
    type Inner = Lock<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> Lock<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        Lock {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args LockArgs) -> flatbuffers::WIPOffset<Lock<'bldr>> {
      let mut builder = LockBuilder::new(_fbb);
      builder.add_id(args.id);
      builder.finish()
    }

    pub const VT_ID: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn id(&self) -> u64 {
    self._tab.get::<u64>(Lock::VT_ID, Some(0)).unwrap()
  }
}

pub struct LockArgs {
    pub id: u64,
}
impl Default for LockArgs {
    #[inline]
    fn default() -> Self {
        LockArgs {
            id: 0,
        }
    }
}
pub struct LockBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> LockBuilder<'a, 'b> {
  #[inline]
  pub fn add_id(&mut self, id: u64) {
    self.fbb_.push_slot::<u64>(Lock::VT_ID, id, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> LockBuilder<'a, 'b> {
    let start = _fbb.start_table();
    LockBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<Lock<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum LockAckOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct LockAck<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for LockAck<'a> {
    type Inner = LockAck<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> LockAck<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        LockAck {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args LockAckArgs) -> flatbuffers::WIPOffset<LockAck<'bldr>> {
      let mut builder = LockAckBuilder::new(_fbb);
      builder.add_id(args.id);
      builder.finish()
    }

    pub const VT_ID: flatbuffers::VOffsetT = 4;

  #[inline]
  pub fn id(&self) -> u64 {
    self._tab.get::<u64>(LockAck::VT_ID, Some(0)).unwrap()
  }
}

pub struct LockAckArgs {
    pub id: u64,
}
impl Default for LockAckArgs {
    #[inline]
    fn default() -> Self {
        LockAckArgs {
            id: 0,
        }
    }
}
pub struct LockAckBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> LockAckBuilder<'a, 'b> {
  #[inline]
  pub fn add_id(&mut self, id: u64) {
    self.fbb_.push_slot::<u64>(LockAck::VT_ID, id, 0);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> LockAckBuilder<'a, 'b> {
    let start = _fbb.start_table();
    LockAckBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<LockAck<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

pub enum FrameOffset {}
#[derive(Copy, Clone, Debug, PartialEq)]

pub struct Frame<'a> {
  pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Frame<'a> {
    type Inner = Frame<'a>;
    #[inline]
    fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: flatbuffers::Table { buf: buf, loc: loc },
        }
    }
}

impl<'a> Frame<'a> {
    #[inline]
    pub fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        Frame {
            _tab: table,
        }
    }
    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        _fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args FrameArgs) -> flatbuffers::WIPOffset<Frame<'bldr>> {
      let mut builder = FrameBuilder::new(_fbb);
      if let Some(x) = args.data { builder.add_data(x); }
      builder.add_data_type(args.data_type);
      builder.finish()
    }

    pub const VT_DATA_TYPE: flatbuffers::VOffsetT = 4;
    pub const VT_DATA: flatbuffers::VOffsetT = 6;

  #[inline]
  pub fn data_type(&self) -> Data {
    self._tab.get::<Data>(Frame::VT_DATA_TYPE, Some(Data::NONE)).unwrap()
  }
  #[inline]
  pub fn data(&self) -> Option<flatbuffers::Table<'a>> {
    self._tab.get::<flatbuffers::ForwardsUOffset<flatbuffers::Table<'a>>>(Frame::VT_DATA, None)
  }
  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_alloc(&self) -> Option<Alloc<'a>> {
    if self.data_type() == Data::Alloc {
      self.data().map(|u| Alloc::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_alloc_ack(&self) -> Option<AllocAck<'a>> {
    if self.data_type() == Data::AllocAck {
      self.data().map(|u| AllocAck::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_dealloc(&self) -> Option<Dealloc<'a>> {
    if self.data_type() == Data::Dealloc {
      self.data().map(|u| Dealloc::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_dealloc_ack(&self) -> Option<DeallocAck<'a>> {
    if self.data_type() == Data::DeallocAck {
      self.data().map(|u| DeallocAck::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_keep_alive(&self) -> Option<KeepAlive<'a>> {
    if self.data_type() == Data::KeepAlive {
      self.data().map(|u| KeepAlive::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_keep_alive_ack(&self) -> Option<KeepAliveAck<'a>> {
    if self.data_type() == Data::KeepAliveAck {
      self.data().map(|u| KeepAliveAck::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_sub(&self) -> Option<Sub<'a>> {
    if self.data_type() == Data::Sub {
      self.data().map(|u| Sub::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_sub_ack(&self) -> Option<SubAck<'a>> {
    if self.data_type() == Data::SubAck {
      self.data().map(|u| SubAck::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_flush(&self) -> Option<Flush<'a>> {
    if self.data_type() == Data::Flush {
      self.data().map(|u| Flush::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_flush_ack(&self) -> Option<FlushAck<'a>> {
    if self.data_type() == Data::FlushAck {
      self.data().map(|u| FlushAck::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_lock(&self) -> Option<Lock<'a>> {
    if self.data_type() == Data::Lock {
      self.data().map(|u| Lock::init_from_table(u))
    } else {
      None
    }
  }

  #[inline]
  #[allow(non_snake_case)]
  pub fn data_as_lock_ack(&self) -> Option<LockAck<'a>> {
    if self.data_type() == Data::LockAck {
      self.data().map(|u| LockAck::init_from_table(u))
    } else {
      None
    }
  }

}

pub struct FrameArgs {
    pub data_type: Data,
    pub data: Option<flatbuffers::WIPOffset<flatbuffers::UnionWIPOffset>>,
}
impl Default for FrameArgs {
    #[inline]
    fn default() -> Self {
        FrameArgs {
            data_type: Data::NONE,
            data: None,
        }
    }
}
pub struct FrameBuilder<'a: 'b, 'b> {
  fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
  start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}
impl<'a: 'b, 'b> FrameBuilder<'a, 'b> {
  #[inline]
  pub fn add_data_type(&mut self, data_type: Data) {
    self.fbb_.push_slot::<Data>(Frame::VT_DATA_TYPE, data_type, Data::NONE);
  }
  #[inline]
  pub fn add_data(&mut self, data: flatbuffers::WIPOffset<flatbuffers::UnionWIPOffset>) {
    self.fbb_.push_slot_always::<flatbuffers::WIPOffset<_>>(Frame::VT_DATA, data);
  }
  #[inline]
  pub fn new(_fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> FrameBuilder<'a, 'b> {
    let start = _fbb.start_table();
    FrameBuilder {
      fbb_: _fbb,
      start_: start,
    }
  }
  #[inline]
  pub fn finish(self) -> flatbuffers::WIPOffset<Frame<'a>> {
    let o = self.fbb_.end_table(self.start_);
    flatbuffers::WIPOffset::new(o.value())
  }
}

#[inline]
pub fn get_root_as_frame<'a>(buf: &'a [u8]) -> Frame<'a> {
  flatbuffers::get_root::<Frame<'a>>(buf)
}

#[inline]
pub fn finish_frame_buffer<'a, 'b>(
    fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>,
    root: flatbuffers::WIPOffset<Frame<'a>>) {
  fbb.finish(root, None);
}

}  // pub mod protocol
}  // pub mod farstore

