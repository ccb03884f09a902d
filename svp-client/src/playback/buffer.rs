//! Unit buffer and watermark policy
//!
//! An append-only, bounded sequence of received units plus a read cursor.
//! Units are kept in arrival order and never evicted; the cursor only moves
//! forward. The two watermarks compare the unconsumed lookahead
//! (`len - cursor`) against fixed ratios of the capacity and implement the
//! hysteresis between Buffering and Playing: refill to more than 20%
//! lookahead before starting, pause for refill only once lookahead drops
//! below 5%.

use crate::session::MediaUnit;
use tracing::warn;

/// Lookahead ratio below which playback stops to refill
pub const LOW_WATERMARK_RATIO: f64 = 0.05;
/// Lookahead ratio above which playback may start
pub const HIGH_WATERMARK_RATIO: f64 = 0.2;

/// Append-only unit buffer with a forward-only read cursor
#[derive(Debug)]
pub struct UnitBuffer {
    units: Vec<MediaUnit>,
    cursor: usize,
    capacity: usize,
}

impl UnitBuffer {
    /// Create a buffer sized for the target stream length
    pub fn new(capacity: usize) -> Self {
        Self {
            units: Vec::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Append a unit in arrival order
    ///
    /// Appends past capacity are dropped; the stream length is expected to
    /// equal the capacity, so an overflow means the server is misbehaving.
    pub fn push(&mut self, unit: MediaUnit) -> bool {
        if self.units.len() >= self.capacity {
            warn!(
                "unit {} dropped: buffer at capacity {}",
                unit.sequence, self.capacity
            );
            return false;
        }
        self.units.push(unit);
        true
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Unconsumed lookahead: units buffered ahead of the cursor
    pub fn lookahead(&self) -> usize {
        debug_assert!(self.cursor <= self.units.len());
        self.units.len() - self.cursor
    }

    /// Advance the cursor by one if data is available
    ///
    /// Returns the new cursor position, or None when the cursor has caught
    /// up with the buffered data (an expected transient, not an underflow
    /// error — the low watermark is the actual underrun defense).
    pub fn advance(&mut self) -> Option<usize> {
        if self.cursor < self.units.len() {
            self.cursor += 1;
            Some(self.cursor)
        } else {
            None
        }
    }

    /// Unit at the cursor, if one is available
    pub fn current(&self) -> Option<&MediaUnit> {
        self.units.get(self.cursor)
    }

    /// Payload at the cursor; empty when the cursor indexes past available data
    pub fn current_payload(&self) -> Vec<u8> {
        self.current().map(|u| u.payload.clone()).unwrap_or_default()
    }

    /// Payload length at the cursor; 0 when no unit is available
    pub fn current_payload_len(&self) -> usize {
        self.current().map(MediaUnit::payload_len).unwrap_or(0)
    }

    /// True when enough is buffered to start (or resume) the clock:
    /// the buffer is full, or lookahead exceeds 20% of capacity
    pub fn upper_bound_satisfied(&self) -> bool {
        self.units.len() == self.capacity
            || self.lookahead() as f64 / self.capacity as f64 > HIGH_WATERMARK_RATIO
    }

    /// True when lookahead has dropped below 5% of capacity and playback
    /// should stop to refill
    pub fn lower_bound_satisfied(&self) -> bool {
        (self.lookahead() as f64 / self.capacity as f64) < LOW_WATERMARK_RATIO
    }
}
