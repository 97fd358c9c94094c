//! Capacity policy for the accumulation buffer.

use crate::error::{FrameError, Result};

/// Default upper bound on a single growth step.
pub const DEFAULT_GROWTH_CAP: usize = 2048;

/// Default largest buffer capacity.
pub const DEFAULT_MAX_CAPACITY: usize = i32::MAX as usize;

/// Grows a buffer by half its size per step, never more than `increment_cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    /// Largest increment applied in one step.
    pub increment_cap: usize,
    /// Capacity the buffer may never exceed.
    pub max_capacity: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            increment_cap: DEFAULT_GROWTH_CAP,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl GrowthPolicy {
    /// Capacity after one growth step from `current`, clamped to `max_capacity`.
    ///
    /// Returns `None` when `current` is already at the maximum.
    pub fn step(&self, current: usize) -> Option<usize> {
        if current >= self.max_capacity {
            return None;
        }
        let increment = (current / 2).min(self.increment_cap).max(1);
        Some(current.saturating_add(increment).min(self.max_capacity))
    }

    /// Smallest capacity reachable from `current` by whole steps that holds `required` bytes.
    pub fn next_capacity(&self, current: usize, required: usize) -> Result<usize> {
        let mut capacity = current;
        while capacity < required {
            capacity = self.step(capacity).ok_or(FrameError::BufferExhausted { capacity, required })?;
        }
        Ok(capacity)
    }
}
