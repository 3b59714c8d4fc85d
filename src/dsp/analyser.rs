//! Analysis tap — keeps the most recent output samples for inspection.
//!
//! Sits between the master gain and the device. The audio callback pushes
//! whole blocks; the UI thread reads a snapshot. Writers never block: if
//! the reader holds the lock the block is skipped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default window, matching WebAudio `AnalyserNode.fftSize`.
pub const DEFAULT_TAP_SIZE: usize = 2048;

#[derive(Debug, Clone)]
pub struct AnalysisTap {
    window: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl Default for AnalysisTap {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_SIZE)
    }
}

impl AnalysisTap {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        AnalysisTap {
            window: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a block, dropping the oldest samples beyond capacity.
    /// Returns false if the block was skipped because a reader held the lock.
    pub fn write_block(&self, block: &[f32]) -> bool {
        let Ok(mut window) = self.window.try_lock() else {
            return false;
        };
        let block = if block.len() > self.capacity {
            &block[block.len() - self.capacity..]
        } else {
            block
        };
        let overflow = (window.len() + block.len()).saturating_sub(self.capacity);
        window.drain(..overflow);
        window.extend(block.iter().copied());
        true
    }

    /// Copy of the window, oldest sample first.
    pub fn snapshot(&self) -> Vec<f32> {
        match self.window.lock() {
            Ok(window) => window.iter().copied().collect(),
            Err(poisoned) => poisoned.into_inner().iter().copied().collect(),
        }
    }

    /// Largest absolute value in the window.
    pub fn peak(&self) -> f32 {
        self.snapshot().iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }
}
