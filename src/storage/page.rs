//! Slotted page format.
//!
//! Every page is `PAGE_SIZE` bytes: a 24 byte header, a directory of 8 byte
//! cell pointers growing up from the header, and a record heap growing down
//! from the end of the page.

pub mod cell;
pub mod header;
pub mod record;
pub mod slotted_page;

use std::fmt;

/// Size of every page, in memory and on disk.
pub const PAGE_SIZE: usize = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a cell within a page. Not a directory position.
pub type CellId = u16;

/// Stable address of a record: the page it lives in and its cell id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub cell_id: CellId,
}

impl RecordId {
    pub fn new(page_id: PageId, cell_id: CellId) -> Self {
        Self { page_id, cell_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.0, self.cell_id)
    }
}

pub use cell::CellPointer;
pub use header::{PageHeader, HEADER_SIZE};
pub use record::Record;
pub use slotted_page::Page;
