//! Presentation clock
//!
//! A fixed-interval task that advances the read cursor while the engine is
//! Playing. At most one clock generation is live at a time: each task
//! captures the engine's clock epoch at spawn and re-checks it under the
//! engine lock on every tick, so a cancelled generation can never mutate the
//! buffer or cursor after cancellation returns.

use super::engine::EngineCore;
use std::sync::Arc;
use std::time::Duration;
use svp_common::events::{EventChannel, PlayerEvent};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Spawn one clock generation
///
/// The first tick fires immediately, matching a fixed-rate schedule with no
/// initial delay; subsequent ticks fire every `period`.
pub(crate) fn spawn(
    core: Arc<Mutex<EngineCore>>,
    events: EventChannel<PlayerEvent>,
    period: Duration,
    epoch: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let mut core = core.lock().await;
            if !core.on_tick(epoch, &events) {
                break;
            }
        }
        debug!("presentation clock generation {} retired", epoch);
    })
}
