//! Circular sample buffer
//!
//! Fixed-capacity store of conditioned readings, overwritten in place once
//! full. Samples live for exactly one buffer rotation.

use serde::{Deserialize, Serialize};

/// One conditioned sensor reading
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sample {
    pub raw: f32,
    pub filtered: f32,
    /// Monotonic milliseconds supplied by the caller
    pub timestamp: u32,
    pub valid: bool,
}

/// Fixed-capacity ring buffer of sensor readings
#[derive(Debug, Clone)]
pub struct SampleStore {
    slots: Vec<Sample>,
    /// Next write position
    head: usize,
    /// Number of valid slots, saturates at capacity
    filled: usize,
}

impl SampleStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Sample::default(); capacity],
            head: 0,
            filled: 0,
        }
    }

    /// Write a reading into the next slot, overwriting the oldest once full
    pub fn push(&mut self, raw: f32, filtered: f32, timestamp: u32) {
        self.slots[self.head] = Sample {
            raw,
            filtered,
            timestamp,
            valid: true,
        };
        self.head = (self.head + 1) % self.slots.len();
        if self.filled < self.slots.len() {
            self.filled += 1;
        }
    }

    /// Number of valid slots
    pub fn count_valid(&self) -> usize {
        self.filled
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The most recent `n` valid samples in chronological order, oldest first.
    /// Returns fewer when the buffer holds fewer.
    pub fn window(&self, n: usize) -> Vec<Sample> {
        let take = n.min(self.filled);
        let cap = self.slots.len();
        let mut out = Vec::with_capacity(take);
        for i in 0..take {
            let idx = (self.head + cap - take + i) % cap;
            out.push(self.slots[idx]);
        }
        out
    }

    /// Invalidate every slot and rewind the write position
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.valid = false;
        }
        self.head = 0;
        self.filled = 0;
    }
}
