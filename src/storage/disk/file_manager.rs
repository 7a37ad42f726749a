use crate::storage::disk::{check_allocated, check_buffer, DiskManager};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::header::P_FREE;
use crate::storage::page::{Page, PageId, PAGE_SIZE};
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// Disk manager over a single flat file of `PAGE_SIZE` blocks.
#[derive(Debug)]
pub struct FileDiskManager {
    path: PathBuf,
    file: Mutex<Option<File>>,
    next_page_id: AtomicU32,
}

impl FileDiskManager {
    /// Create a fresh, empty file, truncating any existing one.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self::with_file(path, file, 0))
    }

    /// Open the file, creating it if absent. The next page id is derived
    /// from the file length.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let pages = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        debug!("opened {:?} with {} pages", path, pages);
        Ok(Self::with_file(path, file, pages))
    }

    fn with_file(path: &Path, file: File, next_page_id: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
            next_page_id: AtomicU32::new(next_page_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the backing file in bytes.
    pub fn file_size(&self) -> StorageResult<u64> {
        let guard = self.file.lock();
        let file = guard.as_ref().ok_or(StorageError::Closed)?;
        Ok(file.metadata()?.len())
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id.0 as u64 * PAGE_SIZE as u64
    }
}

impl DiskManager for FileDiskManager {
    fn allocate_page(&self) -> StorageResult<PageId> {
        let page_id = PageId(self.next_page_id.fetch_add(1, Ordering::SeqCst));
        debug!("allocated page {}", page_id);
        Ok(page_id)
    }

    fn deallocate_page(&self, page_id: PageId) -> StorageResult<()> {
        let free_page = Page::new(page_id, P_FREE);
        self.write_page(page_id, free_page.as_bytes())?;
        debug!("deallocated page {}", page_id);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        check_buffer(buf.len())?;
        check_allocated(page_id, self.num_pages())?;

        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        check_buffer(data.len())?;
        check_allocated(page_id, self.num_pages())?;

        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(StorageError::Closed)?;
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }

    fn num_pages(&self) -> u32 {
        self.next_page_id.load(Ordering::SeqCst)
    }

    fn close(&self) -> StorageResult<()> {
        if let Some(file) = self.file.lock().take() {
            file.sync_all()?;
            debug!("closed {:?}", self.path);
        }
        Ok(())
    }
}
