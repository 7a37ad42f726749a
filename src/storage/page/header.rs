//! Fixed 24 byte page header.

use byteorder::{ByteOrder, LittleEndian};

pub const HEADER_SIZE: usize = 24;

const ID_OFFSET: usize = 0;
const PREV_OFFSET: usize = 4;
const NEXT_OFFSET: usize = 8;
const FLAGS_OFFSET: usize = 12;
const CELLS_OFFSET: usize = 16;
const FREE_OFFSET: usize = 18;
const LOWER_OFFSET: usize = 20;
const UPPER_OFFSET: usize = 22;

// Page flags
pub const P_FREE: u32 = 0x0001;
pub const P_USED: u32 = 0x0002;
pub const P_NODE: u32 = 0x0004;
pub const P_LEAF: u32 = 0x0008;
pub const P_ROOT: u32 = 0x0010;

/// Decoded copy of a page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageHeader {
    pub id: u32,
    pub prev: u32,
    pub next: u32,
    pub flags: u32,
    pub cells: u16,
    pub free: u16,
    pub lower: u16,
    pub upper: u16,
}

impl PageHeader {
    pub fn read_from(buf: &[u8]) -> Self {
        assert!(buf.len() >= HEADER_SIZE, "page header truncated");
        Self {
            id: LittleEndian::read_u32(&buf[ID_OFFSET..]),
            prev: LittleEndian::read_u32(&buf[PREV_OFFSET..]),
            next: LittleEndian::read_u32(&buf[NEXT_OFFSET..]),
            flags: LittleEndian::read_u32(&buf[FLAGS_OFFSET..]),
            cells: LittleEndian::read_u16(&buf[CELLS_OFFSET..]),
            free: LittleEndian::read_u16(&buf[FREE_OFFSET..]),
            lower: LittleEndian::read_u16(&buf[LOWER_OFFSET..]),
            upper: LittleEndian::read_u16(&buf[UPPER_OFFSET..]),
        }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        assert!(buf.len() >= HEADER_SIZE, "page header truncated");
        LittleEndian::write_u32(&mut buf[ID_OFFSET..], self.id);
        LittleEndian::write_u32(&mut buf[PREV_OFFSET..], self.prev);
        LittleEndian::write_u32(&mut buf[NEXT_OFFSET..], self.next);
        LittleEndian::write_u32(&mut buf[FLAGS_OFFSET..], self.flags);
        LittleEndian::write_u16(&mut buf[CELLS_OFFSET..], self.cells);
        LittleEndian::write_u16(&mut buf[FREE_OFFSET..], self.free);
        LittleEndian::write_u16(&mut buf[LOWER_OFFSET..], self.lower);
        LittleEndian::write_u16(&mut buf[UPPER_OFFSET..], self.upper);
    }

    pub fn live_records(&self) -> u16 {
        self.cells - self.free
    }
}

// Single field accessors used on the hot path so the whole header
// does not have to be decoded for one value.

pub(crate) fn id(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(&buf[ID_OFFSET..])
}

pub(crate) fn prev(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(&buf[PREV_OFFSET..])
}

pub(crate) fn set_prev(buf: &mut [u8], val: u32) {
    LittleEndian::write_u32(&mut buf[PREV_OFFSET..], val);
}

pub(crate) fn next(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(&buf[NEXT_OFFSET..])
}

pub(crate) fn set_next(buf: &mut [u8], val: u32) {
    LittleEndian::write_u32(&mut buf[NEXT_OFFSET..], val);
}

pub(crate) fn flags(buf: &[u8]) -> u32 {
    LittleEndian::read_u32(&buf[FLAGS_OFFSET..])
}

pub(crate) fn set_flags(buf: &mut [u8], val: u32) {
    LittleEndian::write_u32(&mut buf[FLAGS_OFFSET..], val);
}

pub(crate) fn cells(buf: &[u8]) -> u16 {
    LittleEndian::read_u16(&buf[CELLS_OFFSET..])
}

pub(crate) fn set_cells(buf: &mut [u8], val: u16) {
    LittleEndian::write_u16(&mut buf[CELLS_OFFSET..], val);
}

pub(crate) fn free(buf: &[u8]) -> u16 {
    LittleEndian::read_u16(&buf[FREE_OFFSET..])
}

pub(crate) fn set_free(buf: &mut [u8], val: u16) {
    LittleEndian::write_u16(&mut buf[FREE_OFFSET..], val);
}

pub(crate) fn lower(buf: &[u8]) -> u16 {
    LittleEndian::read_u16(&buf[LOWER_OFFSET..])
}

pub(crate) fn set_lower(buf: &mut [u8], val: u16) {
    LittleEndian::write_u16(&mut buf[LOWER_OFFSET..], val);
}

pub(crate) fn upper(buf: &[u8]) -> u16 {
    LittleEndian::read_u16(&buf[UPPER_OFFSET..])
}

pub(crate) fn set_upper(buf: &mut [u8], val: u16) {
    LittleEndian::write_u16(&mut buf[UPPER_OFFSET..], val);
}
