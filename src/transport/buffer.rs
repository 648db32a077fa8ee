use std::ptr::{self, NonNull};
use std::slice;

use super::TransportError;

pub fn page_size() -> usize {
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz <= 0 {
        4096
    } else {
        sz as usize
    }
}

/// Zero-initialized, page-aligned heap buffer suitable for memory registration
///
/// The address is stable for the life of the buffer. Once registered, the
/// fabric may write into it at any time so callers only read a range after
/// the completion covering that range has been observed.
#[derive(Debug)]
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    len: usize
}

unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    pub fn new(len: usize) -> Result<AlignedBuffer, TransportError> {
        // posix_memalign may hand back null for zero-byte requests
        let alloc_len = if len == 0 { 1 } else { len };

        let mut p: *mut libc::c_void = ptr::null_mut();
        let rc = unsafe { libc::posix_memalign(&mut p, page_size(), alloc_len) };

        match NonNull::new(p as *mut u8) {
            Some(nn) if rc == 0 => {
                unsafe { ptr::write_bytes(nn.as_ptr(), 0, alloc_len) };
                Ok(AlignedBuffer { ptr: nn, len })
            },
            _ => Err(TransportError::AllocationFailed(len))
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn addr(&self) -> u64 {
        self.ptr.as_ptr() as u64
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { libc::free(self.ptr.as_ptr() as *mut libc::c_void) };
    }
}
