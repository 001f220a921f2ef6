use serde::{Deserialize, Serialize};

/// Storage encoding of a fixed-width string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// UTF-16LE, two bytes per character (the game's default for names).
    Utf16,
    /// Single-byte ASCII.
    Ascii,
}

/// What the raw bits of a field mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Plain unsigned integer.
    Number,
    /// Integer indexing into a fixed label list (dropdowns, play types).
    Enumerated { values: Vec<String> },
    /// Fixed-width string; `length` is then a character capacity, not bits.
    Text { encoding: TextEncoding },
}

/// How the field's address is derived from the record address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldAccess {
    /// Field lives inside the record: `record + offset`.
    Direct,
    /// Record holds a pointer at `record + offset`; the field lives behind
    /// it: `*(record + offset) + field.offset`. A NUL pointer means the
    /// side-structure is absent for this record.
    Dereference { offset: u64 },
}

/// One editable field inside a fixed-stride record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub category: String,
    pub name: String,
    /// Byte offset, record-relative (or pointer-relative under
    /// [`FieldAccess::Dereference`]).
    pub offset: u64,
    /// First bit of the value within the byte at `offset`.
    pub start_bit: u32,
    /// Width in bits (character capacity for [`FieldKind::Text`]).
    pub length: u32,
    pub kind: FieldKind,
    pub access: FieldAccess,
}

impl FieldDescriptor {
    /// Largest raw value representable in this field.
    pub fn max_raw(&self) -> u64 {
        if self.length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.length) - 1
        }
    }

    /// Bytes covered by the bit window `[start_bit, start_bit + length)`.
    pub fn byte_span(&self) -> usize {
        ((self.start_bit + self.length) as usize).div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(start_bit: u32, length: u32) -> FieldDescriptor {
        FieldDescriptor {
            category: "Attributes".to_string(),
            name: "Three Point".to_string(),
            offset: 0x1A0,
            start_bit,
            length,
            kind: FieldKind::Number,
            access: FieldAccess::Direct,
        }
    }

    #[test]
    fn test_max_raw() {
        assert_eq!(field(0, 1).max_raw(), 1);
        assert_eq!(field(0, 7).max_raw(), 127);
        assert_eq!(field(0, 64).max_raw(), u64::MAX);
    }

    #[test]
    fn test_byte_span_covers_bit_window() {
        assert_eq!(field(0, 8).byte_span(), 1);
        assert_eq!(field(6, 7).byte_span(), 2);
        assert_eq!(field(0, 7).byte_span(), 1);
        assert_eq!(field(7, 2).byte_span(), 2);
    }
}
