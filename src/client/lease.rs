use super::ClientError;

/// Raw contents of a successful AllocAck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub mr_id: u64,
    pub remote_addr: u64,
    pub peer_capability: u64
}

/// Right to access one server allocation with one-sided operations
///
/// Leases are only created from a successful allocation and are consumed by
/// a successful deallocation, so they cannot be copied.
#[derive(Debug, PartialEq, Eq)]
pub struct Lease {
    grant: Grant,
    size: u64
}

impl Lease {
    pub(crate) fn new(grant: Grant, size: u64) -> Lease {
        Lease { grant, size }
    }

    pub fn mr_id(&self) -> u64 {
        self.grant.mr_id
    }

    pub fn remote_addr(&self) -> u64 {
        self.grant.remote_addr
    }

    pub fn capability(&self) -> u64 {
        self.grant.peer_capability
    }

    /// Bytes requested when the lease was granted
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remote address of `len` bytes at `offset`, if they lie within the lease
    pub(crate) fn locate(&self, offset: u64, len: usize) -> Result<u64, ClientError> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.size => Ok(self.grant.remote_addr + offset),
            _ => Err(ClientError::OutOfBounds {
                offset,
                len,
                size: self.size
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let l = Lease::new(Grant { mr_id: 1, remote_addr: 0x1000, peer_capability: 3 }, 16);
        assert_eq!(l.locate(0, 16).unwrap(), 0x1000);
        assert_eq!(l.locate(15, 1).unwrap(), 0x100F);
        assert_eq!(l.locate(16, 0).unwrap(), 0x1010);
        assert!(l.locate(15, 2).is_err());
        assert!(l.locate(u64::max_value(), 1).is_err());
    }
}
