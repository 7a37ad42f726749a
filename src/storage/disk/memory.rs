use crate::storage::disk::{check_allocated, check_buffer, DiskManager};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::header::P_FREE;
use crate::storage::page::{Page, PageId, PAGE_SIZE};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// In-memory disk manager for tests.
///
/// Follows the same allocation and bounds rules as `FileDiskManager`; a page
/// that was allocated but never written reads back as an unexpected EOF.
#[derive(Debug, Default)]
pub struct MemoryDiskManager {
    pages: Mutex<HashMap<PageId, Box<[u8; PAGE_SIZE]>>>,
    next_page_id: AtomicU32,
    writes: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryDiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of page writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl DiskManager for MemoryDiskManager {
    fn allocate_page(&self) -> StorageResult<PageId> {
        Ok(PageId(self.next_page_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn deallocate_page(&self, page_id: PageId) -> StorageResult<()> {
        let free_page = Page::new(page_id, P_FREE);
        self.write_page(page_id, free_page.as_bytes())
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        self.check_open()?;
        check_buffer(buf.len())?;
        check_allocated(page_id, self.num_pages())?;

        let pages = self.pages.lock();
        let page = pages.get(&page_id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("page {} was never written", page_id),
            )
        })?;
        buf.copy_from_slice(&page[..]);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        self.check_open()?;
        check_buffer(data.len())?;
        check_allocated(page_id, self.num_pages())?;

        let mut page = Box::new([0u8; PAGE_SIZE]);
        page.copy_from_slice(data);
        self.pages.lock().insert(page_id, page);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn num_pages(&self) -> u32 {
        self.next_page_id.load(Ordering::SeqCst)
    }

    fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() -> StorageResult<()> {
        let dm = MemoryDiskManager::new();
        let page_id = dm.allocate_page()?;

        dm.write_page(page_id, &[9u8; PAGE_SIZE])?;
        let mut buf = vec![0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut buf)?;

        assert!(buf.iter().all(|&b| b == 9));
        assert_eq!(dm.write_count(), 1);
        Ok(())
    }

    #[test]
    fn test_bounds() -> StorageResult<()> {
        let dm = MemoryDiskManager::new();
        let page_id = dm.allocate_page()?;
        let mut buf = vec![0u8; PAGE_SIZE];

        assert!(matches!(
            dm.read_page(page_id, &mut buf),
            Err(StorageError::Io(_))
        ));
        assert!(matches!(
            dm.write_page(PageId(5), &buf),
            Err(StorageError::PageNotAllocated { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_deallocate_and_close() -> StorageResult<()> {
        let dm = MemoryDiskManager::new();
        let page_id = dm.allocate_page()?;
        dm.deallocate_page(page_id)?;

        let mut buf = vec![0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut buf)?;
        assert_eq!(Page::from_bytes(&buf)?.flags(), P_FREE);

        dm.close()?;
        assert!(dm.is_closed());
        assert!(matches!(
            dm.read_page(page_id, &mut buf),
            Err(StorageError::Closed)
        ));
        Ok(())
    }
}
