//! Packed 64 bit cell pointers.
//!
//! Layout of the little-endian word:
//!
//! | bits  | field  |
//! |-------|--------|
//! | 0-15  | id     |
//! | 16-31 | flags  |
//! | 32-47 | offset |
//! | 48-63 | length |

use crate::storage::page::CellId;
use byteorder::{ByteOrder, LittleEndian};

pub const CELL_POINTER_SIZE: usize = 8;

/// Marker every valid cell carries in the high byte of its flags.
pub const C_MAGIC: u16 = 0xA500;
const C_MAGIC_MASK: u16 = 0xFF00;

pub const C_USED: u16 = 0x0001;
pub const C_FREE: u16 = 0x0002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPointer {
    pub id: CellId,
    pub flags: u16,
    pub offset: u16,
    pub length: u16,
}

impl CellPointer {
    pub fn new(id: CellId, offset: u16, length: u16) -> Self {
        Self {
            id,
            flags: C_MAGIC | C_USED,
            offset,
            length,
        }
    }

    pub fn from_word(word: u64) -> Self {
        Self {
            id: word as u16,
            flags: (word >> 16) as u16,
            offset: (word >> 32) as u16,
            length: (word >> 48) as u16,
        }
    }

    pub fn to_word(self) -> u64 {
        (self.id as u64)
            | ((self.flags as u64) << 16)
            | ((self.offset as u64) << 32)
            | ((self.length as u64) << 48)
    }

    pub fn read_from(buf: &[u8]) -> Self {
        assert!(buf.len() >= CELL_POINTER_SIZE);
        Self::from_word(LittleEndian::read_u64(buf))
    }

    pub fn write_to(self, buf: &mut [u8]) {
        assert!(buf.len() >= CELL_POINTER_SIZE);
        LittleEndian::write_u64(buf, self.to_word());
    }

    pub fn is_valid(&self) -> bool {
        self.flags & C_MAGIC_MASK == C_MAGIC
    }

    pub fn is_used(&self) -> bool {
        self.flags & C_USED != 0
    }

    pub fn is_free(&self) -> bool {
        self.flags & C_FREE != 0
    }

    pub fn mark_free(&mut self) {
        self.flags = C_MAGIC | C_FREE;
    }

    pub fn mark_used(&mut self) {
        self.flags = C_MAGIC | C_USED;
    }

    /// Byte range of the record this cell addresses.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset as usize..self.offset as usize + self.length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout() {
        let cell = CellPointer::new(0x0007, 0x3F00, 0x0040);
        let word = cell.to_word();

        assert_eq!(word & 0xFFFF, 0x0007);
        assert_eq!((word >> 16) & 0xFFFF, (C_MAGIC | C_USED) as u64);
        assert_eq!((word >> 32) & 0xFFFF, 0x3F00);
        assert_eq!(word >> 48, 0x0040);
        assert_eq!(CellPointer::from_word(word), cell);
    }

    #[test]
    fn test_little_endian_bytes() {
        let cell = CellPointer::new(1, 2, 3);
        let mut buf = [0u8; CELL_POINTER_SIZE];
        cell.write_to(&mut buf);

        assert_eq!(buf[0], 1);
        assert_eq!(buf[4], 2);
        assert_eq!(buf[6], 3);
        assert_eq!(CellPointer::read_from(&buf), cell);
    }

    #[test]
    fn test_flags() {
        let mut cell = CellPointer::new(0, 100, 10);
        assert!(cell.is_valid());
        assert!(cell.is_used());
        assert!(!cell.is_free());

        cell.mark_free();
        assert!(cell.is_valid());
        assert!(cell.is_free());
        assert!(!cell.is_used());

        assert!(!CellPointer::from_word(0).is_valid());
        assert_eq!(cell.span(), 100..110);
    }
}
