use std::collections::VecDeque;

/// Bounded FIFO buffer of recent closing prices for one symbol.
///
/// Pushing past capacity evicts the oldest value. The window is owned by the
/// symbol's pipeline, never shared across symbols.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    closes: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be > 0");
        Self {
            closes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a close price, evicting the oldest when full.
    pub fn push(&mut self, price: f64) {
        if self.closes.len() == self.capacity {
            self.closes.pop_front();
        }
        self.closes.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Closes oldest-first as a contiguous slice.
    pub fn closes(&self) -> Vec<f64> {
        self.closes.iter().copied().collect()
    }

    pub fn last(&self) -> Option<f64> {
        self.closes.back().copied()
    }
}
