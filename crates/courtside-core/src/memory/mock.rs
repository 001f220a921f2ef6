//! In-memory fake of the target address space for tests.

use std::cell::RefCell;

use crate::error::{Error, Result};
use crate::memory::{AttachProcess, ReadMemory, WriteMemory};

/// A flat byte region starting at `origin`, readable and writable through
/// the same traits the live accessor implements. Any access outside the
/// region fails the way a short `ReadProcessMemory` transfer would.
pub struct MockMemory {
    origin: u64,
    base_address: u64,
    data: RefCell<Vec<u8>>,
}

impl MockMemory {
    pub fn new(origin: u64, size: usize) -> Self {
        Self {
            origin,
            base_address: origin,
            data: RefCell::new(vec![0u8; size]),
        }
    }

    /// Override the reported module base (defaults to `origin`).
    pub fn with_base_address(mut self, base_address: u64) -> Self {
        self.base_address = base_address;
        self
    }

    fn range(&self, address: u64, len: usize) -> Result<std::ops::Range<usize>> {
        let start = address
            .checked_sub(self.origin)
            .map(|o| o as usize)
            .filter(|&o| o + len <= self.data.borrow().len());
        match start {
            Some(start) => Ok(start..start + len),
            None => Err(Error::MemoryReadFailed {
                address,
                message: "outside mock region".to_string(),
            }),
        }
    }

    pub fn patch_bytes(&self, address: u64, bytes: &[u8]) {
        let range = self
            .range(address, bytes.len())
            .expect("patch outside mock region");
        self.data.borrow_mut()[range].copy_from_slice(bytes);
    }

    pub fn patch_u32(&self, address: u64, value: u32) {
        self.patch_bytes(address, &value.to_le_bytes());
    }

    pub fn patch_u64(&self, address: u64, value: u64) {
        self.patch_bytes(address, &value.to_le_bytes());
    }

    pub fn patch_wide_string(&self, address: u64, value: &str, max_chars: usize) {
        let mut buf = vec![0u8; max_chars * 2];
        for (i, unit) in value.encode_utf16().take(max_chars - 1).enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        self.patch_bytes(address, &buf);
    }
}

impl ReadMemory for MockMemory {
    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        let range = self.range(address, len)?;
        Ok(self.data.borrow()[range].to_vec())
    }
}

impl WriteMemory for MockMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        let range = self.range(address, data.len()).map_err(|_| {
            Error::MemoryWriteFailed {
                address,
                message: "outside mock region".to_string(),
            }
        })?;
        self.data.borrow_mut()[range].copy_from_slice(data);
        Ok(())
    }
}

impl AttachProcess for MockMemory {
    fn attach(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_outside_region_fail() {
        let mem = MockMemory::new(0x1000, 16);
        assert!(mem.read_bytes(0x0FFF, 4).is_err());
        assert!(mem.read_bytes(0x100E, 4).is_err());
        assert!(mem.read_bytes(0x1000, 16).is_ok());
    }

    #[test]
    fn test_patch_and_read_u64() {
        let mem = MockMemory::new(0x1000, 32);
        mem.patch_u64(0x1008, 0xDEAD_BEEF_CAFE_F00D);
        assert_eq!(mem.read_u64(0x1008).unwrap(), 0xDEAD_BEEF_CAFE_F00D);
    }
}
