//! Event types for the SVP event system
//!
//! # Architecture
//!
//! SVP uses one typed channel per concern instead of a single generic bus:
//! - **Session events** (`EventChannel<SessionEvent>`): session state,
//!   request sequencing, session identity, unit arrival.
//! - **Player events** (`EventChannel<PlayerEvent>`): playback state and
//!   frame readiness.
//! - **Unit hand-off** (`tokio::mpsc`, owned by the client crate): completed
//!   media units travel from the receive loop to the playback engine over a
//!   bounded channel, never over a broadcast subscription.
//!
//! `EventChannel` delivery is lossy for slow subscribers (broadcast ring);
//! publishers that must not block use `emit_lossy`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Session-control protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session context exists yet
    None,
    /// Connected, no session negotiated
    Init,
    /// Session established, delivery not running
    Ready,
    /// Server is delivering units
    Playing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::None => write!(f, "none"),
            SessionState::Init => write!(f, "init"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Playing => write!(f, "playing"),
        }
    }
}

/// Local playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Buffering,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Buffering => write!(f, "buffering"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Events published by the session controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Session state changed (transitions are response-gated)
    StateChanged {
        old_state: SessionState,
        new_state: SessionState,
        timestamp: DateTime<Utc>,
    },

    /// Request sequence number advanced
    SequenceAdvanced {
        cseq: u64,
        timestamp: DateTime<Utc>,
    },

    /// Server assigned a session identity during SETUP
    SessionAssigned {
        session_id: u64,
        timestamp: DateTime<Utc>,
    },

    /// A media unit arrived on the delivery path
    UnitReceived {
        sequence: u16,
        payload_len: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::StateChanged { .. } => "StateChanged",
            SessionEvent::SequenceAdvanced { .. } => "SequenceAdvanced",
            SessionEvent::SessionAssigned { .. } => "SessionAssigned",
            SessionEvent::UnitReceived { .. } => "UnitReceived",
        }
    }
}

/// Events published by the playback engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback state changed
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// The presentation clock advanced to a new frame
    FrameReady {
        cursor: usize,
        payload_len: usize,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PlayerEvent::StateChanged { .. } => "StateChanged",
            PlayerEvent::FrameReady { .. } => "FrameReady",
        }
    }
}

/// Typed broadcast channel for one event concern
///
/// Thin wrapper over `tokio::sync::broadcast`. Delivery is synchronous with
/// respect to the publisher (no queuing thread); slow subscribers lag and
/// lose the oldest events rather than blocking the publisher.
#[derive(Clone)]
pub struct EventChannel<T: Clone> {
    tx: broadcast::Sender<T>,
    capacity: usize,
}

impl<T: Clone> EventChannel<T> {
    /// Create a channel retaining up to `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to this concern
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Emit an event, erroring when no subscriber is listening
    pub fn emit(&self, event: T) -> Result<usize, broadcast::error::SendError<T>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: T) {
        let _ = self.tx.send(event);
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new(100)
    }
}
