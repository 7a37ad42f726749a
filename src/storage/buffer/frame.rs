use super::replacer::FrameId;
use crate::storage::page::header::P_FREE;
use crate::storage::page::{Page, PageId};
use parking_lot::RwLock;
use std::sync::Arc;

/// One buffer pool slot. The page buffer is reused in place for every page
/// the frame holds, unless a handle from an earlier tenant still shares it.
#[derive(Debug)]
pub struct Frame {
    frame_id: FrameId,
    page_id: Option<PageId>,
    pin_count: u32,
    is_dirty: bool,
    page: Arc<RwLock<Page>>,
}

impl Frame {
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: None,
            pin_count: 0,
            is_dirty: false,
            page: Arc::new(RwLock::new(Page::new(PageId(0), P_FREE))),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn page_id(&self) -> Option<PageId> {
        self.page_id
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub(crate) fn page(&self) -> &Arc<RwLock<Page>> {
        &self.page
    }

    /// The page buffer, exclusive to the pool before it is refilled.
    ///
    /// A `PageHandle` that outlived its pin keeps the old buffer and the
    /// frame moves to a fresh one, so locking the result never blocks.
    pub(crate) fn claim_page(&mut self) -> &Arc<RwLock<Page>> {
        if Arc::strong_count(&self.page) > 1 {
            self.page = Arc::new(RwLock::new(Page::new(PageId(0), P_FREE)));
        }
        &self.page
    }

    /// Take ownership of a page with a single pin.
    pub(crate) fn load(&mut self, page_id: PageId) {
        self.page_id = Some(page_id);
        self.pin_count = 1;
        self.is_dirty = false;
    }

    pub(crate) fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Drop one pin, floored at zero. Returns the remaining count.
    pub(crate) fn unpin(&mut self) -> u32 {
        self.pin_count = self.pin_count.saturating_sub(1);
        self.pin_count
    }

    /// Dirty is sticky until the frame is written back.
    pub(crate) fn mark_dirty(&mut self, dirty: bool) {
        self.is_dirty |= dirty;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.is_dirty = false;
    }

    pub(crate) fn reset(&mut self) {
        self.page_id = None;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_bookkeeping() {
        let mut frame = Frame::new(3);
        assert_eq!(frame.frame_id(), 3);
        assert_eq!(frame.page_id(), None);

        frame.load(PageId(8));
        assert_eq!(frame.page_id(), Some(PageId(8)));
        assert_eq!(frame.pin_count(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), 1);
        assert_eq!(frame.unpin(), 0);
        assert_eq!(frame.unpin(), 0);
    }

    #[test]
    fn test_sticky_dirty() {
        let mut frame = Frame::new(0);
        frame.load(PageId(1));

        frame.mark_dirty(true);
        frame.mark_dirty(false);
        assert!(frame.is_dirty());

        frame.clear_dirty();
        assert!(!frame.is_dirty());

        frame.mark_dirty(true);
        frame.reset();
        assert!(!frame.is_dirty());
        assert_eq!(frame.page_id(), None);
    }

    #[test]
    fn test_claim_page_detaches_shared_buffer() {
        let mut frame = Frame::new(0);

        // Sole owner: the buffer is reused in place
        let original = Arc::as_ptr(frame.page());
        assert_eq!(Arc::as_ptr(frame.claim_page()), original);

        // A stale holder keeps its buffer, even while it is locked
        let stale = frame.page().clone();
        let guard = stale.write();
        let claimed = frame.claim_page().clone();
        assert!(!Arc::ptr_eq(&claimed, &stale));
        assert!(claimed.try_write().is_some());
        drop(guard);
    }
}
