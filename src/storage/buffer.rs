pub mod clock;
pub mod frame;
pub mod replacer;
pub mod ring;

use crate::storage::config::StorageConfig;
use crate::storage::disk::{DiskManager, FileDiskManager};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::header::P_USED;
use crate::storage::page::{Page, PageId, Record, RecordId};
use clock::ClockReplacer;
use frame::Frame;
use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use replacer::{FrameId, Replacer};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Counters describing how the pool has served requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub flushes: u64,
}

/// Buffer pool over a fixed number of frames.
///
/// Frames, the free list, the page table and the replacer sit behind a
/// single mutex. Page contents are guarded by a per-page lock inside each
/// `PageHandle`. The pool mutex never waits on a page lock: flushes take the
/// page lock after releasing it, and eviction skips pages that are locked.
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    state: Mutex<PoolState>,
    disk: Arc<dyn DiskManager>,
    pool_size: usize,
}

struct PoolState {
    frames: Vec<Frame>,
    free_list: VecDeque<FrameId>,
    page_table: HashMap<PageId, FrameId>,
    replacer: Box<dyn Replacer>,
    stats: BufferPoolStats,
}

impl BufferPoolManager {
    /// Panics if `pool_size` is zero.
    pub fn new(disk: Arc<dyn DiskManager>, replacer: Box<dyn Replacer>, pool_size: usize) -> Self {
        assert!(pool_size > 0, "buffer pool needs at least one frame");

        let frames = (0..pool_size as FrameId).map(Frame::new).collect();
        let free_list = (0..pool_size as FrameId).collect();

        Self {
            inner: Arc::new(BufferPoolInner {
                state: Mutex::new(PoolState {
                    frames,
                    free_list,
                    page_table: HashMap::with_capacity(pool_size),
                    replacer,
                    stats: BufferPoolStats::default(),
                }),
                disk,
                pool_size,
            }),
        }
    }

    /// Open the configured file with a CLOCK replacer.
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        if config.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }

        let disk = if config.truncate {
            FileDiskManager::create(&config.path)?
        } else {
            FileDiskManager::open(&config.path)?
        };
        let replacer = Box::new(ClockReplacer::new(config.pool_size));
        Ok(Self::new(Arc::new(disk), replacer, config.pool_size))
    }

    /// Allocate a fresh page and return it pinned once.
    pub fn new_page(&self) -> StorageResult<PageHandle> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let frame_id = self.acquire_frame(state)?;
        let page_id = match self.inner.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        };

        let frame = &mut state.frames[frame_id as usize];
        frame.claim_page().write().reset(page_id, P_USED);
        frame.load(page_id);
        // Never written yet: it must reach disk before the frame is reused.
        frame.mark_dirty(true);

        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);
        debug!("new page {} in frame {}", page_id, frame_id);

        Ok(PageHandle::new(page_id, frame_id, frame.page().clone()))
    }

    /// Pin a page, reading it from disk if it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &mut state.frames[frame_id as usize];
            frame.pin();
            state.replacer.pin(frame_id);
            state.stats.hits += 1;
            trace!("cache hit: page {} in frame {}", page_id, frame_id);
            return Ok(PageHandle::new(page_id, frame_id, frame.page().clone()));
        }

        state.stats.misses += 1;
        trace!("cache miss: page {}", page_id);

        let frame_id = self.acquire_frame(state)?;
        let frame = &mut state.frames[frame_id as usize];
        if let Err(e) = self.load_page(page_id, &mut frame.claim_page().write()) {
            state.free_list.push_back(frame_id);
            return Err(e);
        }
        frame.load(page_id);

        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);

        Ok(PageHandle::new(page_id, frame_id, frame.page().clone()))
    }

    /// Drop one pin. The dirty flag is OR-ed in and stays set until the
    /// page is written back.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> StorageResult<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(StorageError::PageNotFound(page_id))?;
        let frame = &mut state.frames[frame_id as usize];

        frame.mark_dirty(is_dirty);
        if frame.unpin() == 0 {
            state.replacer.unpin(frame_id);
        }
        Ok(())
    }

    /// Write a resident page to disk and release one pin.
    ///
    /// Waits for writers on the page, so it must not be called while the
    /// current thread holds a write guard on it.
    pub fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        let (frame_id, shared) = self
            .resident(page_id)
            .ok_or(StorageError::PageNotFound(page_id))?;
        self.write_resident(page_id, frame_id, &shared, true)
    }

    /// Deallocate a page on disk and release its frame.
    ///
    /// Fails with `PageInUse` while the page is pinned.
    pub fn delete_page(&self, page_id: PageId) -> StorageResult<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let released = match state.page_table.get(&page_id) {
            Some(&frame_id) => {
                let pin_count = state.frames[frame_id as usize].pin_count();
                if pin_count > 0 {
                    warn!("refusing to delete page {} with {} pins", page_id, pin_count);
                    return Err(StorageError::PageInUse { page_id, pin_count });
                }
                state.page_table.remove(&page_id);
                state.replacer.pin(frame_id);
                Some(frame_id)
            }
            None => None,
        };

        let result = self.inner.disk.deallocate_page(page_id);
        if let Some(frame_id) = released {
            state.frames[frame_id as usize].reset();
            state.free_list.push_back(frame_id);
        }
        if result.is_ok() {
            debug!("deleted page {}", page_id);
        }
        result
    }

    /// Write every resident page to disk. Pin counts are left untouched.
    pub fn flush_all(&self) -> StorageResult<()> {
        let resident: Vec<_> = {
            let state = self.inner.state.lock();
            state
                .page_table
                .iter()
                .map(|(&page_id, &frame_id)| {
                    (page_id, frame_id, state.frames[frame_id as usize].page().clone())
                })
                .collect()
        };

        for (page_id, frame_id, shared) in resident {
            self.write_resident(page_id, frame_id, &shared, false)?;
        }
        Ok(())
    }

    /// Flush everything and close the disk manager.
    pub fn close(&self) -> StorageResult<()> {
        self.flush_all()?;
        self.inner.disk.close()
    }

    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    pub fn stats(&self) -> BufferPoolStats {
        self.inner.state.lock().stats
    }

    /// Frames never used or released by `delete_page`.
    pub fn free_frames(&self) -> usize {
        self.inner.state.lock().free_list.len()
    }

    /// Frames the replacer may currently evict.
    pub fn evictable_frames(&self) -> usize {
        self.inner.state.lock().replacer.size()
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.inner.state.lock().page_table.contains_key(&page_id)
    }

    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.with_frame(page_id, Frame::pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        self.with_frame(page_id, Frame::is_dirty)
    }

    fn with_frame<T>(&self, page_id: PageId, f: impl FnOnce(&Frame) -> T) -> Option<T> {
        let state = self.inner.state.lock();
        let &frame_id = state.page_table.get(&page_id)?;
        Some(f(&state.frames[frame_id as usize]))
    }

    fn resident(&self, page_id: PageId) -> Option<(FrameId, Arc<RwLock<Page>>)> {
        let state = self.inner.state.lock();
        let &frame_id = state.page_table.get(&page_id)?;
        Some((frame_id, state.frames[frame_id as usize].page().clone()))
    }

    /// Find a frame to hold a new page: the free list first, then a victim
    /// from the replacer. Victims whose page lock is held by a stale handle
    /// are skipped and handed back to the replacer.
    fn acquire_frame(&self, state: &mut PoolState) -> StorageResult<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let mut busy = Vec::new();
        let result = loop {
            let Some(frame_id) = state.replacer.victim() else {
                warn!(
                    "no usable frame: {} pinned, {} locked",
                    self.inner.pool_size - busy.len(),
                    busy.len()
                );
                break Err(StorageError::UsableFrameNotFound);
            };
            match self.evict(state, frame_id) {
                Ok(true) => break Ok(frame_id),
                Ok(false) => busy.push(frame_id),
                Err(e) => {
                    state.replacer.unpin(frame_id);
                    break Err(e);
                }
            }
        };

        for frame_id in busy {
            state.replacer.unpin(frame_id);
        }
        result
    }

    /// Detach the page held by a victim frame, writing it back if dirty.
    /// Returns false if the page lock is taken.
    fn evict(&self, state: &mut PoolState, frame_id: FrameId) -> StorageResult<bool> {
        let frame = &state.frames[frame_id as usize];
        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let shared = frame.page().clone();
                let Some(page) = shared.try_read() else {
                    trace!("frame {} is locked, skipping", frame_id);
                    return Ok(false);
                };
                self.inner
                    .disk
                    .write_page(old_page_id, &page.as_bytes()[..])?;
                state.stats.flushes += 1;
            }
            state.page_table.remove(&old_page_id);
            state.stats.evictions += 1;
            debug!("evicted page {} from frame {}", old_page_id, frame_id);
        }

        state.frames[frame_id as usize].reset();
        Ok(true)
    }

    /// Write a page back without holding the pool lock while waiting for
    /// the page lock. Once the page is read-locked the pool lock is taken
    /// and the write happens only if the frame still holds the same buffer,
    /// so a page evicted or deleted in between is left alone.
    fn write_resident(
        &self,
        page_id: PageId,
        frame_id: FrameId,
        shared: &Arc<RwLock<Page>>,
        release_pin: bool,
    ) -> StorageResult<()> {
        let page = shared.read();

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let frame = &mut state.frames[frame_id as usize];
        if frame.page_id() != Some(page_id) || !Arc::ptr_eq(frame.page(), shared) {
            trace!("page {} left frame {} before flush", page_id, frame_id);
            return Ok(());
        }

        self.inner.disk.write_page(page_id, &page.as_bytes()[..])?;
        frame.clear_dirty();
        if release_pin && frame.unpin() == 0 {
            state.replacer.unpin(frame_id);
        }
        state.stats.flushes += 1;
        Ok(())
    }

    fn load_page(&self, page_id: PageId, page: &mut Page) -> StorageResult<()> {
        self.inner
            .disk
            .read_page(page_id, &mut page.as_bytes_mut()[..])?;
        page.validate()?;
        if page.page_id() != page_id {
            return Err(StorageError::Corrupted {
                page_id,
                reason: format!("header carries page id {}", page.page_id()),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.inner.pool_size)
            .field("disk", &self.inner.disk)
            .finish()
    }
}

/// A page handed out by the buffer pool.
///
/// The handle stays meaningful only while the caller holds a pin on the
/// page; after `unpin_page` the frame may be reused for another page.
#[derive(Clone)]
pub struct PageHandle {
    page_id: PageId,
    frame_id: FrameId,
    page: Arc<RwLock<Page>>,
}

impl PageHandle {
    fn new(page_id: PageId, frame_id: FrameId, page: Arc<RwLock<Page>>) -> Self {
        Self {
            page_id,
            frame_id,
            page,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Lock the page for reading. Other pool calls are safe while the guard
    /// is held.
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Lock the page for writing. Flushing this same page from the holding
    /// thread blocks until the guard is dropped.
    pub fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    pub fn add_record(&self, record: &Record) -> StorageResult<RecordId> {
        self.page.write().add_record(record)
    }

    pub fn get_record(&self, rid: RecordId) -> StorageResult<Record> {
        self.page.read().get_record(rid)
    }

    pub fn del_record(&self, rid: RecordId) -> StorageResult<()> {
        self.page.write().del_record(rid)
    }
}

impl fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .finish()
    }
}
