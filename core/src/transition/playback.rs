//! Tick-driven playback of a single visibility animation

use crate::animation::{apply_easing, AnimationFrame, AnimationKind, AnimationRenderer, Easing};
use crate::scheduler::{Scheduler, TimeMode};
use crate::widget::{Visibility, WidgetRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Out-of-band requests for a running playback
#[derive(Debug, Default)]
pub(crate) struct PlaybackControl {
    skip: AtomicBool,
    rewind: AtomicBool,
}

impl PlaybackControl {
    pub fn request_skip(&self) {
        self.skip.store(true, Ordering::SeqCst);
    }

    /// A rewind supersedes any skip requested before it
    pub fn request_rewind(&self) {
        self.skip.store(false, Ordering::SeqCst);
        self.rewind.store(true, Ordering::SeqCst);
    }

    pub fn clear_rewind(&self) {
        self.rewind.store(false, Ordering::SeqCst);
    }

    fn skip_requested(&self) -> bool {
        self.skip.load(Ordering::SeqCst)
    }

    fn rewind_requested(&self) -> bool {
        self.rewind.load(Ordering::SeqCst)
    }
}

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlaybackOutcome {
    Completed,
    Skipped,
    Rewound { progress: f64 },
    Cancelled,
}

impl PlaybackOutcome {
    /// Merge the outcomes of two concurrent playbacks of one transition
    pub fn join(self, other: PlaybackOutcome) -> PlaybackOutcome {
        use PlaybackOutcome::*;
        match (self, other) {
            (Cancelled, _) | (_, Cancelled) => Cancelled,
            (Rewound { progress }, _) | (_, Rewound { progress }) => Rewound { progress },
            (Skipped, _) | (_, Skipped) => Skipped,
            (Completed, Completed) => Completed,
        }
    }
}

/// One animation on one widget
pub(crate) struct Playback<'a> {
    pub widget: &'a WidgetRef,
    pub kind: AnimationKind,
    pub visibility: Visibility,
    pub length: Duration,
    pub easing: Easing,
    pub time_mode: TimeMode,
    /// Progress to resume from, 0.0 for a fresh start
    pub start_progress: f64,
}

impl Playback<'_> {
    pub async fn run(
        &self,
        scheduler: &dyn Scheduler,
        renderer: &dyn AnimationRenderer,
        control: &PlaybackControl,
        token: &CancellationToken,
    ) -> PlaybackOutcome {
        let start_progress = self.start_progress.clamp(0.0, 1.0);
        let started = scheduler.now(self.time_mode);
        let mut progress = start_progress;

        loop {
            if token.is_cancelled() {
                return PlaybackOutcome::Cancelled;
            }
            if control.rewind_requested() {
                return PlaybackOutcome::Rewound { progress };
            }
            if control.skip_requested() {
                self.render(renderer, 1.0);
                return PlaybackOutcome::Skipped;
            }

            let elapsed = scheduler.now(self.time_mode).saturating_sub(started);
            progress = if self.length.is_zero() {
                1.0
            } else {
                (start_progress + elapsed.as_secs_f64() / self.length.as_secs_f64()).min(1.0)
            };
            self.render(renderer, progress);
            if progress >= 1.0 {
                return PlaybackOutcome::Completed;
            }

            tokio::select! {
                _ = scheduler.next_tick() => {}
                _ = token.cancelled() => {}
            }
        }
    }

    fn render(&self, renderer: &dyn AnimationRenderer, progress: f64) {
        let frame = AnimationFrame {
            kind: self.kind,
            visibility: self.visibility,
            progress,
            eased: apply_easing(self.easing, progress),
        };
        renderer.render(self.widget.as_ref(), &frame);
    }
}
