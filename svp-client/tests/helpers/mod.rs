//! Shared test doubles for the session boundary traits
#![allow(dead_code)] // not every test binary uses every helper

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use svp_client::session::{
    ControlRequest, ControlResponse, ControlTransport, MediaUnit, UnitSource,
};
use svp_client::{Error, Result};
use tokio::sync::mpsc;

/// Build a test unit with a recognizable payload
pub fn unit(sequence: u16) -> MediaUnit {
    MediaUnit {
        sequence,
        timestamp: sequence as u32 * 3600,
        payload: vec![sequence as u8; 16],
    }
}

/// Success response carrying a session identity (as a SETUP response would)
pub fn ok_with_session(session_id: u64) -> ControlResponse {
    ControlResponse {
        status: 200,
        cseq: None,
        session_id: Some(session_id),
    }
}

/// Response with a bare status code
pub fn status(code: u16) -> ControlResponse {
    ControlResponse {
        status: code,
        cseq: None,
        session_id: None,
    }
}

/// Control transport that replays scripted responses and records every
/// request it is asked to send
pub struct ScriptedControl {
    responses: VecDeque<ControlResponse>,
    default_ok: bool,
    sent: Arc<Mutex<Vec<ControlRequest>>>,
}

impl ScriptedControl {
    /// Answer from the given script, erroring when it runs out
    pub fn with_responses(responses: impl IntoIterator<Item = ControlResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            default_ok: false,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer 200 (with a fixed session identity) to everything
    pub fn ok_forever() -> Self {
        Self {
            responses: VecDeque::new(),
            default_ok: true,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded requests
    pub fn sent(&self) -> Arc<Mutex<Vec<ControlRequest>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl ControlTransport for ScriptedControl {
    async fn send_request(&mut self, request: &ControlRequest) -> Result<()> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn recv_response(&mut self) -> Result<ControlResponse> {
        if let Some(response) = self.responses.pop_front() {
            return Ok(response);
        }
        if self.default_ok {
            return Ok(ok_with_session(666777));
        }
        Err(Error::Transport("no scripted response left".into()))
    }
}

/// Unit source that sets up successfully and then never yields a unit
pub struct SilentUnits {
    pub setup_calls: Arc<Mutex<usize>>,
}

impl SilentUnits {
    pub fn new() -> Self {
        Self {
            setup_calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl UnitSource for SilentUnits {
    async fn setup(&mut self) -> Result<()> {
        *self.setup_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn recv(&mut self) -> Result<MediaUnit> {
        std::future::pending().await
    }
}

/// Unit source fed by the test through a channel; the channel closing is
/// reported as a transport error, like a closed socket
pub struct ChannelUnits {
    rx: mpsc::UnboundedReceiver<MediaUnit>,
}

impl ChannelUnits {
    pub fn new() -> (mpsc::UnboundedSender<MediaUnit>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl UnitSource for ChannelUnits {
    async fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    async fn recv(&mut self) -> Result<MediaUnit> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| Error::Transport("unit channel closed".into()))
    }
}
