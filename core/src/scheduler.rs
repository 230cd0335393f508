//! Tick scheduling and time sources
//!
//! The navigation core is single-threaded and cooperative: waiting for a
//! queued transition and playing an animation both suspend one tick at a
//! time through a [`Scheduler`].

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Which clock an animation measures its length against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// Wall time multiplied by the scheduler's time scale
    #[default]
    Scaled,
    /// Wall time, unaffected by the time scale
    Unscaled,
}

/// Source of ticks and time for transitions
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Suspend until the next scheduling tick
    async fn next_tick(&self);

    /// Time elapsed since the scheduler started, in the given mode
    fn now(&self, mode: TimeMode) -> Duration;
}

#[derive(Debug)]
struct ScaledClock {
    scale: f64,
    anchor: Instant,
    scaled_at_anchor: Duration,
}

/// Scheduler ticking at a fixed frame interval on the tokio clock
///
/// Uses `tokio::time`, so tests running with a paused clock advance
/// through animations instantly.
#[derive(Debug)]
pub struct FrameScheduler {
    frame_interval: Duration,
    origin: Instant,
    clock: Mutex<ScaledClock>,
}

impl FrameScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        let origin = Instant::now();
        Self {
            frame_interval: frame_interval.max(Duration::from_millis(1)),
            origin,
            clock: Mutex::new(ScaledClock {
                scale: 1.0,
                anchor: origin,
                scaled_at_anchor: Duration::ZERO,
            }),
        }
    }

    pub fn with_time_scale(self, scale: f64) -> Self {
        self.set_time_scale(scale);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn time_scale(&self) -> f64 {
        self.clock.lock().scale
    }

    /// Change the scaled-time multiplier from now on; negative values clamp to zero
    pub fn set_time_scale(&self, scale: f64) {
        let scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
        let now = Instant::now();
        let mut clock = self.clock.lock();
        let scaled_now = clock.scaled_at_anchor + (now - clock.anchor).mul_f64(clock.scale);
        clock.scaled_at_anchor = scaled_now;
        clock.anchor = now;
        clock.scale = scale;
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

#[async_trait]
impl Scheduler for FrameScheduler {
    async fn next_tick(&self) {
        tokio::time::sleep(self.frame_interval).await;
    }

    fn now(&self, mode: TimeMode) -> Duration {
        let now = Instant::now();
        match mode {
            TimeMode::Unscaled => now - self.origin,
            TimeMode::Scaled => {
                let clock = self.clock.lock();
                clock.scaled_at_anchor + (now - clock.anchor).mul_f64(clock.scale)
            }
        }
    }
}

/// Scheduler whose ticks are plain task yields and whose clock never moves
///
/// Suitable for hosts that only ever use instant transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldScheduler;

#[async_trait]
impl Scheduler for YieldScheduler {
    async fn next_tick(&self) {
        tokio::task::yield_now().await;
    }

    fn now(&self, _mode: TimeMode) -> Duration {
        Duration::ZERO
    }
}
