//! Sub-byte field access.
//!
//! Values narrower than a byte share storage with their neighbors, so every
//! write is a read-modify-write over the whole covering byte span, committed
//! with a single write call. A field window is described by a start bit and
//! a bit length; the span is the minimal run of bytes containing
//! `[start_bit, start_bit + length)`.

use crate::error::Result;
use crate::memory::{ReadMemory, WriteMemory};
use crate::schema::{FieldAccess, FieldDescriptor};

fn span_bytes(start_bit: u32, length: u32) -> usize {
    ((start_bit + length) as usize).div_ceil(8)
}

fn window_mask(length: u32) -> u128 {
    if length >= 128 {
        u128::MAX
    } else {
        (1u128 << length) - 1
    }
}

/// Read `length` bits starting `start_bit` bits into the byte at `address`.
pub fn read_bits<M: ReadMemory>(
    mem: &M,
    address: u64,
    start_bit: u32,
    length: u32,
) -> Result<u64> {
    let span = span_bytes(start_bit, length);
    let bytes = mem.read_bytes(address, span)?;
    let mut acc: u128 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        acc |= (*byte as u128) << (8 * i);
    }
    Ok(((acc >> start_bit) & window_mask(length)) as u64)
}

/// Write `value` into the bit window, preserving every neighboring bit in
/// the covering span exactly. `value` is clamped to `[0, 2^length - 1]`.
pub fn write_bits<M: WriteMemory>(
    mem: &M,
    address: u64,
    start_bit: u32,
    length: u32,
    value: u64,
) -> Result<()> {
    let mask = window_mask(length);
    let value = (value as u128).min(mask);

    let span = span_bytes(start_bit, length);
    let bytes = mem.read_bytes(address, span)?;
    let mut acc: u128 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        acc |= (*byte as u128) << (8 * i);
    }

    let updated = (acc & !(mask << start_bit)) | (value << start_bit);
    if updated == acc {
        return Ok(());
    }
    let out: Vec<u8> = (0..span).map(|i| (updated >> (8 * i)) as u8).collect();
    mem.write_bytes(address, &out)
}

/// Compute the absolute address of a field within a record.
///
/// Dereferenced fields live behind a pointer stored in the record; a NUL
/// pointer means the side structure is absent and the field has no address.
pub fn field_address<M: ReadMemory>(
    mem: &M,
    record_address: u64,
    field: &FieldDescriptor,
) -> Option<u64> {
    match field.access {
        FieldAccess::Direct => Some(record_address + field.offset),
        FieldAccess::Dereference { offset } => {
            let ptr = mem.read_u64(record_address + offset).ok()?;
            if ptr == 0 {
                None
            } else {
                Some(ptr + field.offset)
            }
        }
    }
}

/// Read a field's raw value from a record. Any failure (unresolvable
/// address, failed transfer) degrades to `None`.
pub fn read_field<M: ReadMemory>(
    mem: &M,
    record_address: u64,
    field: &FieldDescriptor,
) -> Option<u64> {
    let address = field_address(mem, record_address, field)?;
    read_bits(mem, address, field.start_bit, field.length).ok()
}

/// Write a field's raw value into a record. The write is attempted only
/// once the full address (including any dereference) has resolved.
pub fn write_field<M: WriteMemory>(
    mem: &M,
    record_address: u64,
    field: &FieldDescriptor,
    value: u64,
) -> bool {
    let Some(address) = field_address(mem, record_address, field) else {
        return false;
    };
    write_bits(mem, address, field.start_bit, field.length, value).is_ok()
}
