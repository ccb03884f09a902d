//! Network transports
//!
//! Concrete implementations of the session boundary traits: the TCP control
//! channel (`rtsp`) and the UDP unit source (`rtp`).

pub mod rtp;
pub mod rtsp;

pub use rtp::RtpUnitSource;
pub use rtsp::RtspTransport;
