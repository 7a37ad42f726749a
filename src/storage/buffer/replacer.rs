use std::fmt::Debug;

pub type FrameId = u32;

/// Eviction policy over the frames whose pin count has dropped to zero.
///
/// The pool tells the replacer when a frame becomes evictable (`unpin`) and
/// when it stops being evictable (`pin`). The replacer only picks among
/// frames it has been told about.
pub trait Replacer: Send + Sync + Debug {
    /// Choose a frame to evict and stop tracking it. The caller owns the
    /// frame afterwards and must `unpin` it again if it decides not to
    /// reuse it. Returns None when nothing is evictable.
    fn victim(&mut self) -> Option<FrameId>;

    /// Stop tracking a frame. No-op for frames that are not tracked.
    fn pin(&mut self, frame_id: FrameId);

    /// Start tracking a frame, or record a fresh reference if it is
    /// already tracked.
    fn unpin(&mut self, frame_id: FrameId);

    /// Number of tracked frames.
    fn size(&self) -> usize;
}
