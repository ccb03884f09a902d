//! Boundary types and traits between the session controller and the network
//!
//! The controller is generic over two seams: a `ControlTransport` that
//! carries one request/response exchange at a time, and a `UnitSource` that
//! yields received media units. Concrete TCP/UDP implementations live in
//! `crate::net`; tests substitute scripted mocks.

use crate::Result;
use async_trait::async_trait;

/// Control request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Setup,
    Play,
    Pause,
    Teardown,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Pause => "PAUSE",
            Method::Teardown => "TEARDOWN",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-specified control request
///
/// Built by the session controller after its guards pass, so the sequence
/// number and session identity are never stale at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub method: Method,
    /// Requested media stream name
    pub media: String,
    /// Request sequence number within the session
    pub cseq: u64,
    /// Server-assigned session identity; 0 before SETUP completes
    pub session_id: u64,
    /// Local delivery port advertised during SETUP
    pub client_rtp_port: u16,
}

/// One parsed control response
///
/// A non-200 status is data, not an error; only unparseable responses
/// surface as `Error::Protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlResponse {
    pub status: u16,
    pub cseq: Option<u64>,
    pub session_id: Option<u64>,
}

impl ControlResponse {
    /// Shorthand for a bare success response
    pub fn ok() -> Self {
        Self {
            status: 200,
            cseq: None,
            session_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// One received media unit
///
/// Immutable once parsed. The receive loop keeps the most recent unit in a
/// shared slot and hands an owned copy to the playback engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUnit {
    /// Delivery sequence number
    pub sequence: u16,
    /// Media timestamp from the unit header
    pub timestamp: u32,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl MediaUnit {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Request/response exchange with the session-control server
///
/// Implementations block (await) for the duration of one round trip; callers
/// on latency-sensitive paths must dispatch off their hot thread.
#[async_trait]
pub trait ControlTransport: Send {
    /// Transmit one control request
    async fn send_request(&mut self, request: &ControlRequest) -> Result<()>;

    /// Await and parse one control response
    async fn recv_response(&mut self) -> Result<ControlResponse>;
}

/// Source of received media units
#[async_trait]
pub trait UnitSource: Send {
    /// Prepare the receive path (e.g. bind the local endpoint)
    ///
    /// Must be idempotent: a retried SETUP calls this again.
    async fn setup(&mut self) -> Result<()>;

    /// Block until one unit is available
    async fn recv(&mut self) -> Result<MediaUnit>;
}
