//! Memory access traits shared by the live process accessor and test mocks.
//!
//! All integer helpers are little-endian, matching the target's x86-64
//! layout. String helpers read a fixed-width span and truncate at the first
//! NUL; writes truncate to capacity and NUL-pad the remainder of the span so
//! a shorter value never leaves stale tail bytes behind.

use crate::error::{Error, Result};
use crate::schema::TextEncoding;

/// Read access to the target address space.
pub trait ReadMemory {
    /// Base address of the target module, or 0 when not attached.
    fn base_address(&self) -> u64;

    /// Read exactly `len` bytes from `address`.
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>>;

    fn read_u8(&self, address: u64) -> Result<u8> {
        let bytes = self.read_bytes(address, 1)?;
        Ok(bytes[0])
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a UTF-16LE string of at most `max_chars` characters.
    fn read_wide_string(&self, address: u64, max_chars: usize) -> Result<String> {
        let raw = self.read_bytes(address, max_chars * 2)?;
        Ok(decode_utf16_le(&raw))
    }

    /// Read an ASCII string of at most `max_chars` bytes.
    fn read_ascii_string(&self, address: u64, max_chars: usize) -> Result<String> {
        let raw = self.read_bytes(address, max_chars)?;
        Ok(decode_ascii(&raw))
    }

    fn read_string(&self, address: u64, max_chars: usize, encoding: TextEncoding) -> Result<String> {
        match encoding {
            TextEncoding::Utf16 => self.read_wide_string(address, max_chars),
            TextEncoding::Ascii => self.read_ascii_string(address, max_chars),
        }
    }
}

/// Write access to the target address space.
pub trait WriteMemory: ReadMemory {
    /// Write all of `data` to `address`.
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;

    fn write_u32(&self, address: u64, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_u64(&self, address: u64, value: u64) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Write a NUL-terminated UTF-16LE string into a fixed `max_chars` span.
    fn write_wide_string(&self, address: u64, value: &str, max_chars: usize) -> Result<()> {
        if max_chars == 0 {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "string field has zero capacity".to_string(),
            });
        }
        let mut buf = vec![0u8; max_chars * 2];
        for (i, unit) in value.encode_utf16().take(max_chars - 1).enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        self.write_bytes(address, &buf)
    }

    /// Write a NUL-terminated ASCII string into a fixed `max_chars` span.
    fn write_ascii_string(&self, address: u64, value: &str, max_chars: usize) -> Result<()> {
        if max_chars == 0 {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "string field has zero capacity".to_string(),
            });
        }
        let mut buf = vec![0u8; max_chars];
        for (i, byte) in value
            .bytes()
            .filter(u8::is_ascii)
            .take(max_chars - 1)
            .enumerate()
        {
            buf[i] = byte;
        }
        self.write_bytes(address, &buf)
    }

    fn write_string(
        &self,
        address: u64,
        value: &str,
        max_chars: usize,
        encoding: TextEncoding,
    ) -> Result<()> {
        match encoding {
            TextEncoding::Utf16 => self.write_wide_string(address, value, max_chars),
            TextEncoding::Ascii => self.write_ascii_string(address, value, max_chars),
        }
    }
}

/// Decode a UTF-16LE buffer, truncating at the first NUL character.
pub fn decode_utf16_le(bytes: &[u8]) -> String {
    let (decoded, _, _) = encoding_rs::UTF_16LE.decode(bytes);
    match decoded.find('\0') {
        Some(end) => decoded[..end].to_string(),
        None => decoded.into_owned(),
    }
}

/// Decode an ASCII buffer, truncating at the first NUL byte.
pub fn decode_ascii(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..len]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '\u{fffd}' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemory;

    #[test]
    fn test_decode_utf16_le_truncates_at_nul() {
        let mut bytes = Vec::new();
        for unit in "LeBron".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0, b'X', 0]);
        assert_eq!(decode_utf16_le(&bytes), "LeBron");
    }

    #[test]
    fn test_decode_ascii_truncates_at_nul() {
        assert_eq!(decode_ascii(b"LAL\0garbage"), "LAL");
        assert_eq!(decode_ascii(b"LAL"), "LAL");
    }

    #[test]
    fn test_wide_string_roundtrip() {
        let mem = MockMemory::new(0x1000, 64);
        mem.write_wide_string(0x1000, "Jokic", 16).unwrap();
        assert_eq!(mem.read_wide_string(0x1000, 16).unwrap(), "Jokic");
    }

    #[test]
    fn test_wide_string_write_truncates_and_pads() {
        let mem = MockMemory::new(0x1000, 64);
        // Pre-fill with a longer value, then overwrite with a shorter one.
        mem.write_wide_string(0x1000, "Antetokounmpo", 8).unwrap();
        assert_eq!(mem.read_wide_string(0x1000, 8).unwrap(), "Antetok");
        mem.write_wide_string(0x1000, "Li", 8).unwrap();
        assert_eq!(mem.read_wide_string(0x1000, 8).unwrap(), "Li");
        // Tail of the span must be NUL-padded, not stale.
        let raw = mem.read_bytes(0x1000 + 6, 10).unwrap();
        assert!(raw.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ascii_string_roundtrip() {
        let mem = MockMemory::new(0x2000, 32);
        mem.write_ascii_string(0x2000, "BOS", 8).unwrap();
        assert_eq!(mem.read_ascii_string(0x2000, 8).unwrap(), "BOS");
    }
}
