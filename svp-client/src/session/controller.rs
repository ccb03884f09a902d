//! Session controller
//!
//! Owns the session-control state machine: request sequencing, session
//! identity, and the response-gated state transitions for
//! SETUP/PLAY/PAUSE/TEARDOWN. A successful SETUP also spawns the unit
//! receive loop, which hands completed units to the playback engine over a
//! bounded channel.
//!
//! Transition rules:
//! - Guards are checked before a request is constructed; a command issued in
//!   the wrong state is a silent no-op returning status 0.
//! - State changes happen only after a 200 response; any other status (and
//!   any transport error) leaves the state machine untouched.

use super::transport::{ControlRequest, ControlResponse, ControlTransport, MediaUnit, Method, UnitSource};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use svp_common::events::{EventChannel, SessionEvent, SessionState};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session-control state machine
///
/// Generic over the control-exchange seam and the unit-source seam so tests
/// can drive it with scripted transports.
pub struct SessionController<C, U> {
    control: C,
    /// Taken by the receive loop once SETUP succeeds
    units: Option<U>,
    media: String,
    rtp_port: u16,

    state: SessionState,
    /// Request sequence number; 0 = unset, 1 on session initialization
    cseq: u64,
    /// Server-assigned session identity; 0 = not yet assigned
    session_id: u64,

    events: EventChannel<SessionEvent>,
    /// Most recent unit seen by the receive loop
    latest: Arc<RwLock<Option<MediaUnit>>>,
    /// Hand-off channel toward the playback engine
    unit_tx: mpsc::Sender<MediaUnit>,
    receiver_handle: Option<JoinHandle<()>>,
}

impl<C, U> SessionController<C, U>
where
    C: ControlTransport,
    U: UnitSource + 'static,
{
    /// Create a controller in the Init state
    pub fn new(
        control: C,
        units: U,
        media: impl Into<String>,
        rtp_port: u16,
        unit_tx: mpsc::Sender<MediaUnit>,
    ) -> Self {
        let mut controller = Self {
            control,
            units: Some(units),
            media: media.into(),
            rtp_port,
            state: SessionState::None,
            cseq: 0,
            session_id: 0,
            events: EventChannel::new(100),
            latest: Arc::new(RwLock::new(None)),
            unit_tx,
            receiver_handle: None,
        };
        controller.set_state(SessionState::Init);
        controller
    }

    /// Typed event channel for session observability
    pub fn events(&self) -> EventChannel<SessionEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sequence_number(&self) -> u64 {
        self.cseq
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn media(&self) -> &str {
        &self.media
    }

    /// Most recent unit received on the delivery path
    pub async fn latest_unit(&self) -> Option<MediaUnit> {
        self.latest.read().await.clone()
    }

    /// Payload length of the most recent unit (0 when none arrived yet)
    pub async fn latest_payload_len(&self) -> usize {
        self.latest
            .read()
            .await
            .as_ref()
            .map(MediaUnit::payload_len)
            .unwrap_or(0)
    }

    /// Negotiate a delivery session
    ///
    /// Valid only in Init; otherwise a no-op returning 0. Prepares the unit
    /// receive path, initializes the request sequence to 1, and sends SETUP.
    /// On 200 the server-assigned session identity is recorded, the state
    /// becomes Ready, and the receive loop starts.
    pub async fn setup(&mut self) -> Result<u16> {
        if self.state != SessionState::Init {
            debug!("setup ignored in state {}", self.state);
            return Ok(0);
        }

        // Prepare the delivery endpoint before the exchange so the server
        // can start sending as soon as it accepts. Idempotent, so a failed
        // SETUP can be retried.
        if let Some(units) = self.units.as_mut() {
            units.setup().await?;
        }

        self.init_sequence();
        let request = self.request(Method::Setup);
        let response = self.exchange(&request).await?;

        if response.is_success() {
            if let Some(id) = response.session_id {
                self.set_session_id(id);
            }
            self.set_state(SessionState::Ready);
            self.spawn_receiver();
        }
        Ok(response.status)
    }

    /// Ask the server to start delivery
    ///
    /// Valid only in Ready; otherwise a no-op returning 0.
    pub async fn play(&mut self) -> Result<u16> {
        if self.state != SessionState::Ready {
            debug!("play ignored in state {}", self.state);
            return Ok(0);
        }

        self.advance_sequence();
        let request = self.request(Method::Play);
        let response = self.exchange(&request).await?;

        if response.is_success() {
            self.set_state(SessionState::Playing);
        }
        Ok(response.status)
    }

    /// Ask the server to pause delivery
    ///
    /// Valid only in Playing; otherwise a no-op returning 0.
    pub async fn pause(&mut self) -> Result<u16> {
        if self.state != SessionState::Playing {
            debug!("pause ignored in state {}", self.state);
            return Ok(0);
        }

        self.advance_sequence();
        let request = self.request(Method::Pause);
        let response = self.exchange(&request).await?;

        if response.is_success() {
            self.set_state(SessionState::Ready);
        }
        Ok(response.status)
    }

    /// End the session
    ///
    /// Valid in any state; always advances the sequence and sends TEARDOWN.
    pub async fn teardown(&mut self) -> Result<u16> {
        self.advance_sequence();
        let request = self.request(Method::Teardown);
        let response = self.exchange(&request).await?;

        if response.is_success() {
            self.set_state(SessionState::Init);
        }
        Ok(response.status)
    }

    /// Stop the unit receive loop, if one is running
    pub fn abort_receiver(&mut self) {
        if let Some(handle) = self.receiver_handle.take() {
            handle.abort();
            debug!("unit receive loop aborted");
        }
    }

    async fn exchange(&mut self, request: &ControlRequest) -> Result<ControlResponse> {
        debug!("sending {} (cseq {})", request.method, request.cseq);
        self.control.send_request(request).await?;
        let response = self.control.recv_response().await?;
        if !response.is_success() {
            warn!(
                "{} rejected with status {}",
                request.method, response.status
            );
        }
        Ok(response)
    }

    fn request(&self, method: Method) -> ControlRequest {
        ControlRequest {
            method,
            media: self.media.clone(),
            cseq: self.cseq,
            session_id: self.session_id,
            client_rtp_port: self.rtp_port,
        }
    }

    fn set_state(&mut self, new_state: SessionState) {
        let old_state = self.state;
        self.state = new_state;
        info!("session state: {} -> {}", old_state, new_state);
        self.events.emit_lossy(SessionEvent::StateChanged {
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }

    fn init_sequence(&mut self) {
        self.cseq = 1;
        self.events.emit_lossy(SessionEvent::SequenceAdvanced {
            cseq: self.cseq,
            timestamp: Utc::now(),
        });
    }

    fn advance_sequence(&mut self) {
        self.cseq += 1;
        self.events.emit_lossy(SessionEvent::SequenceAdvanced {
            cseq: self.cseq,
            timestamp: Utc::now(),
        });
    }

    fn set_session_id(&mut self, session_id: u64) {
        self.session_id = session_id;
        info!("session identity assigned: {}", session_id);
        self.events.emit_lossy(SessionEvent::SessionAssigned {
            session_id,
            timestamp: Utc::now(),
        });
    }

    fn spawn_receiver(&mut self) {
        if self.receiver_handle.is_some() {
            return;
        }
        let Some(units) = self.units.take() else {
            return;
        };
        let receiver = UnitReceiver {
            units,
            latest: Arc::clone(&self.latest),
            events: self.events.clone(),
            unit_tx: self.unit_tx.clone(),
        };
        self.receiver_handle = Some(tokio::spawn(receiver.run()));
    }
}

impl<C, U> Drop for SessionController<C, U> {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver_handle.take() {
            handle.abort();
        }
    }
}

/// Unit receive loop
///
/// Owns the unit source after SETUP succeeds. Runs on its own task because
/// `recv` blocks on I/O; it must never share a thread of execution with the
/// presentation clock.
struct UnitReceiver<U> {
    units: U,
    latest: Arc<RwLock<Option<MediaUnit>>>,
    events: EventChannel<SessionEvent>,
    unit_tx: mpsc::Sender<MediaUnit>,
}

impl<U: UnitSource> UnitReceiver<U> {
    /// Receive exactly one unit: record it as most recent, publish the
    /// arrival, and hand ownership to the playback engine.
    ///
    /// Returns Ok(false) once the engine side has hung up.
    async fn receive_unit(&mut self) -> Result<bool> {
        let unit = self.units.recv().await?;
        *self.latest.write().await = Some(unit.clone());
        self.events.emit_lossy(SessionEvent::UnitReceived {
            sequence: unit.sequence,
            payload_len: unit.payload_len(),
            timestamp: Utc::now(),
        });
        Ok(self.unit_tx.send(unit).await.is_ok())
    }

    async fn run(mut self) {
        loop {
            match self.receive_unit().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("unit hand-off channel closed, stopping receive loop");
                    break;
                }
                Err(e) => {
                    warn!("unit receive failed: {}", e);
                    break;
                }
            }
        }
    }
}
