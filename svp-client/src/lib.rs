//! # SVP Client Library (svp-client)
//!
//! Streaming video player client.
//!
//! **Purpose:** Negotiate a delivery session with a media server over a
//! stateful control protocol, receive media units over UDP, and drive local
//! playback at a fixed presentation rate with watermark-based jitter
//! buffering.
//!
//! **Architecture:** Two cooperating state machines — the session controller
//! (SETUP/PLAY/PAUSE/TEARDOWN, response-gated transitions) and the playback
//! engine (Stopped/Buffering/Playing/Paused, clock start/stop driven by
//! buffer watermarks) — connected by a bounded unit hand-off channel.

pub mod error;
pub mod net;
pub mod playback;
pub mod session;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
pub use session::SessionController;
