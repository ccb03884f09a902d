//! Playback engine integration tests
//!
//! Exercises the playback state machine end to end with scripted session
//! transports: session negotiation on play, watermark-driven transitions,
//! clock start/stop, and the defensive frame accessors.

mod helpers;

use helpers::{ok_with_session, status, unit, ScriptedControl, SilentUnits};
use std::time::Duration;
use svp_client::playback::{PlaybackEngine, PlaybackState};
use svp_client::session::{MediaUnit, Method, SessionController, SessionState};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

type TestEngine = PlaybackEngine<ScriptedControl, SilentUnits>;

fn engine_with(
    control: ScriptedControl,
    capacity: usize,
    interval_ms: u64,
) -> (TestEngine, mpsc::Receiver<MediaUnit>) {
    let (unit_tx, unit_rx) = mpsc::channel(16);
    let session = SessionController::new(control, SilentUnits::new(), "movie.mjpeg", 25000, unit_tx);
    let engine = PlaybackEngine::new(session, capacity, Duration::from_millis(interval_ms));
    (engine, unit_rx)
}

/// Poll until `check` passes or two seconds elapse
macro_rules! wait_for {
    ($check:expr, $what:literal) => {{
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if $check {
                break;
            }
            assert!(Instant::now() < deadline, concat!("timed out waiting for ", $what));
            sleep(Duration::from_millis(2)).await;
        }
    }};
}

#[tokio::test]
async fn test_play_from_stopped_negotiates_then_buffers() {
    let control = ScriptedControl::ok_forever();
    let sent = control.sent();
    let (engine, _unit_rx) = engine_with(control, 100, 1000);

    assert_eq!(engine.play().await.unwrap(), 200);
    assert_eq!(engine.state().await, PlaybackState::Buffering);
    assert_eq!(
        engine.session().lock().await.state(),
        SessionState::Playing
    );

    let methods: Vec<Method> = sent.lock().unwrap().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::Setup, Method::Play]);
}

#[tokio::test]
async fn test_rejected_setup_keeps_playback_stopped() {
    let control = ScriptedControl::with_responses([status(404)]);
    let (engine, _unit_rx) = engine_with(control, 100, 1000);

    assert_eq!(engine.play().await.unwrap(), 404);
    assert_eq!(engine.state().await, PlaybackState::Stopped);
    assert_eq!(engine.session().lock().await.state(), SessionState::Init);
}

#[tokio::test]
async fn test_rejected_play_keeps_playback_stopped() {
    let control = ScriptedControl::with_responses([ok_with_session(1), status(455)]);
    let (engine, _unit_rx) = engine_with(control, 100, 1000);

    assert_eq!(engine.play().await.unwrap(), 455);
    assert_eq!(engine.state().await, PlaybackState::Stopped);
    // The session half-advanced: SETUP succeeded, PLAY was rejected
    assert_eq!(engine.session().lock().await.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_transport_error_keeps_playback_stopped() {
    let control = ScriptedControl::with_responses([]);
    let (engine, _unit_rx) = engine_with(control, 100, 1000);

    assert!(engine.play().await.is_err());
    assert_eq!(engine.state().await, PlaybackState::Stopped);
}

#[tokio::test]
async fn test_play_while_buffering_is_noop() {
    let control = ScriptedControl::ok_forever();
    let sent = control.sent();
    let (engine, _unit_rx) = engine_with(control, 100, 1000);

    engine.play().await.unwrap();
    assert_eq!(engine.play().await.unwrap(), 0);
    assert_eq!(engine.state().await, PlaybackState::Buffering);
    // No further protocol exchange happened
    assert_eq!(sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_buffering_starts_playing_exactly_at_upper_watermark() {
    let control = ScriptedControl::ok_forever();
    let (engine, _unit_rx) = engine_with(control, 100, 1000);
    engine.play().await.unwrap();

    // 20% of 100: twenty units do not start playback...
    for i in 0..20u16 {
        engine.handle_unit(unit(i)).await;
        assert_eq!(engine.state().await, PlaybackState::Buffering);
    }
    // ...the twenty-first does
    engine.handle_unit(unit(20)).await;
    assert_eq!(engine.state().await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_frames_flow_and_pause_halts_cursor() {
    let control = ScriptedControl::ok_forever();
    let (engine, _unit_rx) = engine_with(control, 100, 2);
    engine.play().await.unwrap();
    for i in 0..30u16 {
        engine.handle_unit(unit(i)).await;
    }
    assert_eq!(engine.state().await, PlaybackState::Playing);

    wait_for!(engine.progress().await.0 >= 1, "first frame");
    assert!(engine.current_payload_len().await > 0);

    engine.pause().await;
    assert_eq!(engine.state().await, PlaybackState::Paused);

    // No tick-driven advancement once pause has returned
    let (cursor, _) = engine.progress().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.progress().await.0, cursor);
}

#[tokio::test]
async fn test_resume_with_lookahead_goes_straight_to_playing() {
    let control = ScriptedControl::ok_forever();
    let sent = control.sent();
    let (engine, _unit_rx) = engine_with(control, 100, 1000);
    engine.play().await.unwrap();
    for i in 0..30u16 {
        engine.handle_unit(unit(i)).await;
    }
    engine.pause().await;
    assert_eq!(engine.state().await, PlaybackState::Paused);

    // Long clock interval: at most the immediate first tick ran, so well
    // over 5% of capacity is still buffered ahead of the cursor
    assert_eq!(engine.play().await.unwrap(), 0);
    assert_eq!(engine.state().await, PlaybackState::Playing);
    // Resume is local; no protocol exchange beyond the initial two
    assert_eq!(sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_resume_starved_goes_back_to_buffering() {
    let control = ScriptedControl::ok_forever();
    let (engine, _unit_rx) = engine_with(control, 100, 1000);
    engine.play().await.unwrap();
    // Pause while Buffering with an empty buffer: zero lookahead
    engine.pause().await;
    assert_eq!(engine.state().await, PlaybackState::Paused);

    assert_eq!(engine.play().await.unwrap(), 0);
    assert_eq!(engine.state().await, PlaybackState::Buffering);
}

#[tokio::test]
async fn test_underrun_drops_back_to_buffering_and_recovers() {
    let control = ScriptedControl::ok_forever();
    let (engine, _unit_rx) = engine_with(control, 100, 1);
    engine.play().await.unwrap();
    for i in 0..21u16 {
        engine.handle_unit(unit(i)).await;
    }
    assert_eq!(engine.state().await, PlaybackState::Playing);

    // Let the clock drain the buffer; catching up is not an error and the
    // engine keeps Playing with an empty defensive payload
    wait_for!(engine.progress().await == (21, 21), "cursor to catch up");
    assert_eq!(engine.state().await, PlaybackState::Playing);
    assert_eq!(engine.current_payload_len().await, 0);
    assert!(engine.current_payload().await.is_empty());

    // The next arrival finds lookahead below 5% and stops for refill
    engine.handle_unit(unit(21)).await;
    assert_eq!(engine.state().await, PlaybackState::Buffering);

    // Refill past the upper watermark restarts playback exactly once
    for i in 22..43u16 {
        engine.handle_unit(unit(i)).await;
    }
    assert_eq!(engine.state().await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_stop_tears_down_and_quiesces() {
    let control = ScriptedControl::ok_forever();
    let sent = control.sent();
    let (engine, _unit_rx) = engine_with(control, 100, 2);
    engine.play().await.unwrap();
    for i in 0..30u16 {
        engine.handle_unit(unit(i)).await;
    }
    wait_for!(engine.progress().await.0 >= 1, "first frame");

    assert_eq!(engine.stop().await.unwrap(), 200);
    assert_eq!(engine.state().await, PlaybackState::Stopped);
    assert_eq!(engine.session().lock().await.state(), SessionState::Init);
    assert_eq!(
        sent.lock().unwrap().last().unwrap().method,
        Method::Teardown
    );

    // The clock is gone: the cursor stays put
    let (cursor, _) = engine.progress().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.progress().await.0, cursor);
}
