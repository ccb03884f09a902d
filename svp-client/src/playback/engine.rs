//! Playback engine
//!
//! Owns the playback state machine, the unit buffer, and the presentation
//! clock. Unit intake (from the session's receive loop) and clock ticks run
//! on different tasks; the buffer, cursor, and playback state therefore live
//! together inside one lock (`EngineCore`), and every mutation happens under
//! it.
//!
//! Clock ownership: at most one clock generation is active. Stopping the
//! clock bumps the generation epoch while the core lock is held and aborts
//! the task; a tick that lost the race observes the stale epoch under the
//! same lock and exits without touching the buffer.

use super::buffer::UnitBuffer;
use super::clock;
use crate::session::{ControlTransport, MediaUnit, SessionController, UnitSource};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use svp_common::events::{EventChannel, PlaybackState, PlayerEvent};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Clock action requested by a state transition
pub(crate) enum ClockCommand {
    None,
    Start,
}

/// Shared mutable playback state: buffer, cursor, playback state, and clock
/// ownership, guarded as one unit
pub(crate) struct EngineCore {
    buffer: UnitBuffer,
    state: PlaybackState,
    /// Current clock generation; ticks from older generations are ignored
    clock_epoch: u64,
    clock: Option<JoinHandle<()>>,
}

impl EngineCore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: UnitBuffer::new(capacity),
            state: PlaybackState::Stopped,
            clock_epoch: 0,
            clock: None,
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    pub(crate) fn buffer(&self) -> &UnitBuffer {
        &self.buffer
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.clock_epoch
    }

    pub(crate) fn set_state(&mut self, new_state: PlaybackState, events: &EventChannel<PlayerEvent>) {
        let old_state = self.state;
        self.state = new_state;
        info!("playback state: {} -> {}", old_state, new_state);
        events.emit_lossy(PlayerEvent::StateChanged {
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }

    /// Invalidate the running clock generation and abort its task
    ///
    /// Must be called with the core lock held (as all `&mut self` calls
    /// are); after this returns, no tick from the old generation can pass
    /// the epoch check.
    pub(crate) fn halt_clock(&mut self) {
        self.clock_epoch += 1;
        if let Some(handle) = self.clock.take() {
            handle.abort();
        }
    }

    pub(crate) fn install_clock(&mut self, handle: JoinHandle<()>) {
        // A previous generation must already be halted
        debug_assert!(self.clock.is_none());
        self.clock = Some(handle);
    }

    /// Apply one arrived unit and re-evaluate the watermark policy
    pub(crate) fn on_unit(
        &mut self,
        unit: MediaUnit,
        events: &EventChannel<PlayerEvent>,
    ) -> ClockCommand {
        self.buffer.push(unit);
        match self.state {
            PlaybackState::Playing if self.buffer.lower_bound_satisfied() => {
                // Underrun protection: stop and refill
                self.halt_clock();
                self.set_state(PlaybackState::Buffering, events);
                ClockCommand::None
            }
            PlaybackState::Buffering if self.buffer.upper_bound_satisfied() => {
                self.set_state(PlaybackState::Playing, events);
                ClockCommand::Start
            }
            _ => ClockCommand::None,
        }
    }

    /// Resume from Paused: straight to Playing when enough lookahead
    /// remains, otherwise back to Buffering to refill first
    pub(crate) fn on_resume(&mut self, events: &EventChannel<PlayerEvent>) -> ClockCommand {
        if self.buffer.lower_bound_satisfied() {
            self.set_state(PlaybackState::Buffering, events);
            ClockCommand::None
        } else {
            self.set_state(PlaybackState::Playing, events);
            ClockCommand::Start
        }
    }

    /// Pause whatever is in progress; no-op in Stopped and Paused
    pub(crate) fn on_pause(&mut self, events: &EventChannel<PlayerEvent>) {
        match self.state {
            PlaybackState::Playing => {
                self.halt_clock();
                self.set_state(PlaybackState::Paused, events);
            }
            PlaybackState::Buffering => {
                // No clock to stop
                self.set_state(PlaybackState::Paused, events);
            }
            PlaybackState::Stopped | PlaybackState::Paused => {}
        }
    }

    /// One presentation step for clock generation `epoch`
    ///
    /// Returns false when this generation should retire (stale epoch or no
    /// longer Playing). A cursor that has caught up with the buffer is an
    /// expected transient: the tick does nothing and the generation stays
    /// alive.
    pub(crate) fn on_tick(&mut self, epoch: u64, events: &EventChannel<PlayerEvent>) -> bool {
        if epoch != self.clock_epoch || self.state != PlaybackState::Playing {
            return false;
        }
        if let Some(cursor) = self.buffer.advance() {
            events.emit_lossy(PlayerEvent::FrameReady {
                cursor,
                payload_len: self.buffer.current_payload_len(),
                timestamp: Utc::now(),
            });
        }
        true
    }
}

/// Playback engine
///
/// Public command surface for the player: `play`, `pause`, `stop`, plus
/// read-only frame accessors. Commands that reach the session controller
/// block for one protocol round trip.
pub struct PlaybackEngine<C, U> {
    core: Arc<Mutex<EngineCore>>,
    session: Mutex<SessionController<C, U>>,
    events: EventChannel<PlayerEvent>,
    frame_interval: Duration,
}

impl<C, U> PlaybackEngine<C, U>
where
    C: ControlTransport,
    U: UnitSource + 'static,
{
    /// Create an engine in the Stopped state
    pub fn new(
        session: SessionController<C, U>,
        capacity: usize,
        frame_interval: Duration,
    ) -> Self {
        Self {
            core: Arc::new(Mutex::new(EngineCore::new(capacity))),
            session: Mutex::new(session),
            events: EventChannel::new(100),
            frame_interval,
        }
    }

    /// Typed event channel for playback observability
    pub fn events(&self) -> EventChannel<PlayerEvent> {
        self.events.clone()
    }

    /// Session controller handle (commands serialize through this lock)
    pub fn session(&self) -> &Mutex<SessionController<C, U>> {
        &self.session
    }

    /// Spawn the unit intake task consuming the session's hand-off channel
    ///
    /// The task ends when the sending side (the receive loop) goes away.
    pub fn start_intake(&self, mut unit_rx: mpsc::Receiver<MediaUnit>) -> JoinHandle<()> {
        let core = Arc::clone(&self.core);
        let events = self.events.clone();
        let period = self.frame_interval;
        tokio::spawn(async move {
            while let Some(unit) = unit_rx.recv().await {
                Self::ingest(&core, &events, period, unit).await;
            }
            debug!("unit intake channel closed");
        })
    }

    /// Start or resume playback
    ///
    /// From Stopped this negotiates the session (SETUP, then PLAY); if
    /// either exchange fails or is rejected, playback stays Stopped and the
    /// status (or error) is returned to the caller. From Paused it resumes
    /// directly into Playing when enough lookahead remains, otherwise into
    /// Buffering. In Playing and Buffering it is a no-op returning 0.
    pub async fn play(&self) -> Result<u16> {
        let state = self.core.lock().await.state();
        match state {
            PlaybackState::Stopped => self.start_session().await,
            PlaybackState::Paused => {
                let mut core = self.core.lock().await;
                // Re-check under the lock; pause/stop may have raced us
                if core.state() == PlaybackState::Paused {
                    if let ClockCommand::Start = core.on_resume(&self.events) {
                        self.start_clock(&mut core);
                    }
                }
                Ok(0)
            }
            PlaybackState::Playing | PlaybackState::Buffering => Ok(0),
        }
    }

    /// Pause playback locally; no protocol exchange is performed
    pub async fn pause(&self) {
        let mut core = self.core.lock().await;
        core.on_pause(&self.events);
    }

    /// Feed one arrived unit into the buffer and watermark policy
    pub async fn handle_unit(&self, unit: MediaUnit) {
        Self::ingest(&self.core, &self.events, self.frame_interval, unit).await;
    }

    /// Drive one presentation step by hand
    ///
    /// Normally the clock task does this; exposed for external drivers and
    /// tests. A no-op unless the engine is Playing.
    pub async fn tick(&self) {
        let mut core = self.core.lock().await;
        let epoch = core.epoch();
        core.on_tick(epoch, &self.events);
    }

    /// Stop playback and end the session
    ///
    /// The clock and local state stop first, so playback is quiesced even if
    /// the TEARDOWN exchange fails.
    pub async fn stop(&self) -> Result<u16> {
        {
            let mut core = self.core.lock().await;
            core.halt_clock();
            if core.state() != PlaybackState::Stopped {
                core.set_state(PlaybackState::Stopped, &self.events);
            }
        }
        let mut session = self.session.lock().await;
        session.abort_receiver();
        let status = session.teardown().await?;
        Ok(status)
    }

    pub async fn state(&self) -> PlaybackState {
        self.core.lock().await.state()
    }

    /// Payload of the unit at the cursor; empty when none is available
    pub async fn current_payload(&self) -> Vec<u8> {
        self.core.lock().await.buffer().current_payload()
    }

    /// Payload length of the unit at the cursor; 0 when none is available
    pub async fn current_payload_len(&self) -> usize {
        self.core.lock().await.buffer().current_payload_len()
    }

    /// Snapshot of (cursor, buffered length)
    pub async fn progress(&self) -> (usize, usize) {
        let core = self.core.lock().await;
        (core.buffer().cursor(), core.buffer().len())
    }

    async fn start_session(&self) -> Result<u16> {
        let mut session = self.session.lock().await;
        let status = session.setup().await?;
        if status != 200 {
            warn!("session setup returned status {}, playback stays stopped", status);
            return Ok(status);
        }
        let status = session.play().await?;
        if status != 200 {
            warn!("session play returned status {}, playback stays stopped", status);
            return Ok(status);
        }
        drop(session);

        let mut core = self.core.lock().await;
        if core.state() == PlaybackState::Stopped {
            core.set_state(PlaybackState::Buffering, &self.events);
        }
        Ok(status)
    }

    fn start_clock(&self, core: &mut EngineCore) {
        let handle = clock::spawn(
            Arc::clone(&self.core),
            self.events.clone(),
            self.frame_interval,
            core.epoch(),
        );
        core.install_clock(handle);
    }

    async fn ingest(
        core: &Arc<Mutex<EngineCore>>,
        events: &EventChannel<PlayerEvent>,
        period: Duration,
        unit: MediaUnit,
    ) {
        let mut guard = core.lock().await;
        if let ClockCommand::Start = guard.on_unit(unit, events) {
            let handle = clock::spawn(Arc::clone(core), events.clone(), period, guard.epoch());
            guard.install_clock(handle);
        }
    }
}
