//! Fixed-capacity circular doubly linked list addressed by slot index.
//!
//! Nodes live in an arena of slots; `prev`/`next` are slot indices and
//! removed slots are recycled through a free-slot stack. A frame-id index
//! makes lookup and removal O(1).

use super::replacer::FrameId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Slot {
    frame_id: FrameId,
    referenced: bool,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
pub struct ClockRing {
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
    index: HashMap<FrameId, usize>,
    head: Option<usize>,
    hand: Option<usize>,
    capacity: usize,
}

impl ClockRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_slots: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            hand: None,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.index.contains_key(&frame_id)
    }

    /// Insert at the tail, just behind the head. Returns false if the
    /// frame is already present or the ring is full.
    pub fn push_back(&mut self, frame_id: FrameId, referenced: bool) -> bool {
        if self.contains(frame_id) || self.len() >= self.capacity {
            return false;
        }

        let idx = self.alloc_slot(frame_id, referenced);
        match self.head {
            None => {
                self.slots[idx].prev = idx;
                self.slots[idx].next = idx;
                self.head = Some(idx);
                self.hand = Some(idx);
            }
            Some(head) => {
                let tail = self.slots[head].prev;
                self.slots[idx].prev = tail;
                self.slots[idx].next = head;
                self.slots[tail].next = idx;
                self.slots[head].prev = idx;
            }
        }
        self.index.insert(frame_id, idx);
        true
    }

    /// Unlink a frame. Head and hand move on to the following node if
    /// they pointed at it. Returns the frame's reference bit.
    pub fn remove(&mut self, frame_id: FrameId) -> Option<bool> {
        let idx = self.index.remove(&frame_id)?;
        let Slot {
            referenced,
            prev,
            next,
            ..
        } = self.slots[idx];

        if self.index.is_empty() {
            self.head = None;
            self.hand = None;
        } else {
            self.slots[prev].next = next;
            self.slots[next].prev = prev;
            if self.head == Some(idx) {
                self.head = Some(next);
            }
            if self.hand == Some(idx) {
                self.hand = Some(next);
            }
        }

        self.free_slots.push(idx);
        Some(referenced)
    }

    /// Entry under the clock hand.
    pub fn peek_hand(&self) -> Option<(FrameId, bool)> {
        self.hand.map(|idx| {
            let slot = &self.slots[idx];
            (slot.frame_id, slot.referenced)
        })
    }

    /// Clear the reference bit under the hand and move the hand forward.
    pub fn clear_and_advance(&mut self) {
        if let Some(idx) = self.hand {
            self.slots[idx].referenced = false;
            self.hand = Some(self.slots[idx].next);
        }
    }

    pub fn set_referenced(&mut self, frame_id: FrameId, referenced: bool) {
        if let Some(&idx) = self.index.get(&frame_id) {
            self.slots[idx].referenced = referenced;
        }
    }

    /// Frames in ring order starting at the head.
    pub fn frames(&self) -> Vec<FrameId> {
        let mut frames = Vec::with_capacity(self.len());
        let Some(head) = self.head else {
            return frames;
        };
        let mut idx = head;
        loop {
            frames.push(self.slots[idx].frame_id);
            idx = self.slots[idx].next;
            if idx == head {
                break;
            }
        }
        frames
    }

    fn alloc_slot(&mut self, frame_id: FrameId, referenced: bool) -> usize {
        let slot = Slot {
            frame_id,
            referenced,
            prev: 0,
            next: 0,
        };
        match self.free_slots.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_order() {
        let mut ring = ClockRing::new(4);
        assert!(ring.is_empty());
        assert_eq!(ring.peek_hand(), None);

        assert!(ring.push_back(1, true));
        assert!(ring.push_back(2, false));
        assert!(ring.push_back(3, true));

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.frames(), vec![1, 2, 3]);
        assert_eq!(ring.peek_hand(), Some((1, true)));
    }

    #[test]
    fn test_duplicate_and_capacity() {
        let mut ring = ClockRing::new(2);
        assert!(ring.push_back(1, true));
        assert!(!ring.push_back(1, false));
        assert!(ring.push_back(2, true));
        assert!(!ring.push_back(3, true));

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.capacity(), 2);
    }

    #[test]
    fn test_remove_moves_head_and_hand() {
        let mut ring = ClockRing::new(4);
        for frame_id in 1..=3 {
            ring.push_back(frame_id, true);
        }

        assert_eq!(ring.remove(1), Some(true));
        assert_eq!(ring.frames(), vec![2, 3]);
        assert_eq!(ring.peek_hand(), Some((2, true)));

        assert_eq!(ring.remove(9), None);
        assert_eq!(ring.remove(2), Some(true));
        assert_eq!(ring.remove(3), Some(true));
        assert!(ring.is_empty());
        assert_eq!(ring.peek_hand(), None);
        assert_eq!(ring.frames(), Vec::<FrameId>::new());
    }

    #[test]
    fn test_clear_and_advance_wraps() {
        let mut ring = ClockRing::new(2);
        ring.push_back(1, true);
        ring.push_back(2, true);

        ring.clear_and_advance();
        assert_eq!(ring.peek_hand(), Some((2, true)));
        ring.clear_and_advance();
        assert_eq!(ring.peek_hand(), Some((1, false)));

        ring.set_referenced(1, true);
        assert_eq!(ring.peek_hand(), Some((1, true)));
    }

    #[test]
    fn test_slots_are_recycled() {
        let mut ring = ClockRing::new(3);
        for round in 0..10 {
            ring.push_back(round, true);
            ring.push_back(round + 100, true);
            ring.remove(round);
            ring.remove(round + 100);
        }

        assert!(ring.is_empty());
        assert!(ring.slots.len() <= 2);
    }
}
