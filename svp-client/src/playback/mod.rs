//! Playback engine
//!
//! **Module Structure:**
//! - `buffer.rs`: Append-only unit buffer, read cursor, watermark policy
//! - `clock.rs`: Fixed-interval presentation clock task
//! - `engine.rs`: Playback state machine and component wiring

mod buffer;
mod clock;
mod engine;

pub use buffer::{UnitBuffer, HIGH_WATERMARK_RATIO, LOW_WATERMARK_RATIO};
pub use engine::PlaybackEngine;

// Re-export the shared playback state enum next to its state machine
pub use svp_common::events::PlaybackState;
