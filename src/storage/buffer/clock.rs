//! CLOCK (second-chance) replacement.
//!
//! Only unpinned frames live in the ring. A frame enters with its reference
//! bit set, so the first sweep that reaches it clears the bit and moves on;
//! the first frame found with a clear bit is the victim. Unpinning a frame
//! that is already in the ring sets its bit again.

use super::replacer::{FrameId, Replacer};
use super::ring::ClockRing;
use log::warn;

#[derive(Debug)]
pub struct ClockReplacer {
    ring: ClockRing,
}

impl ClockReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            ring: ClockRing::new(num_frames),
        }
    }
}

impl Replacer for ClockReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        // Terminates within two laps: the first lap clears every bit.
        loop {
            let (frame_id, referenced) = self.ring.peek_hand()?;
            if referenced {
                self.ring.clear_and_advance();
            } else {
                self.ring.remove(frame_id);
                return Some(frame_id);
            }
        }
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.ring.remove(frame_id);
    }

    fn unpin(&mut self, frame_id: FrameId) {
        if self.ring.contains(frame_id) {
            self.ring.set_referenced(frame_id, true);
            return;
        }
        if !self.ring.push_back(frame_id, true) {
            warn!(
                "clock replacer full ({} frames), frame {} not tracked",
                self.ring.capacity(),
                frame_id
            );
        }
    }

    fn size(&self) -> usize {
        self.ring.len()
    }
}
