//! Page-granular disk access.
//!
//! A disk manager maps page ids onto fixed `PAGE_SIZE` blocks of backing
//! storage. Page ids are handed out densely by `allocate_page` and are never
//! recycled; reads and writes of ids past the allocation high-water mark
//! fail with `PageNotAllocated`.

pub mod file_manager;
pub mod memory;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, PAGE_SIZE};
use std::fmt::Debug;

pub use file_manager::FileDiskManager;
pub use memory::MemoryDiskManager;

pub trait DiskManager: Send + Sync + Debug {
    /// Hand out the next page id. Backing storage grows lazily on first write.
    fn allocate_page(&self) -> StorageResult<PageId>;

    /// Overwrite the page with an empty FREE page. The id is not reused.
    fn deallocate_page(&self, page_id: PageId) -> StorageResult<()>;

    /// Read exactly one page into `buf`.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()>;

    /// Write exactly one page and make it durable before returning.
    fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()>;

    /// Allocation high-water mark: the id the next `allocate_page` returns.
    fn num_pages(&self) -> u32;

    fn close(&self) -> StorageResult<()>;
}

pub(crate) fn check_buffer(len: usize) -> StorageResult<()> {
    if len != PAGE_SIZE {
        return Err(StorageError::InvalidBufferSize {
            expected: PAGE_SIZE,
            actual: len,
        });
    }
    Ok(())
}

pub(crate) fn check_allocated(page_id: PageId, next: u32) -> StorageResult<()> {
    if page_id.0 >= next {
        return Err(StorageError::PageNotAllocated { page_id, next });
    }
    Ok(())
}
