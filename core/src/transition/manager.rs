//! Serialized, cancellable visibility handoffs
//!
//! The manager keeps at most one active transition and a FIFO of pending
//! ones. Every enqueued transition must start where the previous one ends
//! (chain continuity). A pending transition waits, one tick at a time, until
//! the transition ahead of it resolves and promotes it.
//!
//! Cancelled pending transitions stay in the queue as *settled* entries:
//! when their turn comes they flip visibility instantly, so the visible
//! state always ends up where the chain of accepted transitions says it is.

use super::playback::{Playback, PlaybackControl, PlaybackOutcome};
use crate::animation::{resolve_kind, AnimationKind, AnimationRenderer, NullRenderer};
use crate::config::NavigationConfig;
use crate::error::{Result, TransitionError};
use crate::params::{TargetKind, VisibilityTransitionParams};
use crate::scheduler::{Scheduler, TimeMode};
use crate::widget::{describe, same_slot, Visibility, WidgetRef};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Identifier of a transition accepted by a [`TransitionManager`]
pub type TransitionId = u64;

/// How an executed transition ended, when it was not cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Target visible, source hidden
    Completed,
    /// Rewound mid-flight; source visible again, target hidden
    Rewound,
}

/// Result of handing a transition to the manager
pub enum Enqueued {
    /// The queue was idle and the transition was instantaneous; already applied
    Settled,
    /// Accepted; drive it with [`TransitionTicket::run`]
    Queued(TransitionTicket),
}

struct QueueEntry {
    id: TransitionId,
    params: VisibilityTransitionParams,
    source: Option<WidgetRef>,
    target: Option<WidgetRef>,
    token: CancellationToken,
    /// Cancelled while pending; flips instantly when promoted
    settle_only: bool,
    /// Skipped by teardown; jumps to its end state when promoted
    skipped: bool,
}

struct ActiveEntry {
    id: TransitionId,
    params: VisibilityTransitionParams,
    source: Option<WidgetRef>,
    target: Option<WidgetRef>,
    token: CancellationToken,
    control: Arc<PlaybackControl>,
    start_progress: f64,
    rewound: bool,
    /// Inverted since the running round snapshotted it
    flipped: bool,
}

impl ActiveEntry {
    fn promote(entry: QueueEntry) -> Self {
        let control = PlaybackControl::default();
        if entry.skipped {
            control.request_skip();
        }
        Self {
            id: entry.id,
            params: entry.params,
            source: entry.source,
            target: entry.target,
            token: entry.token,
            control: Arc::new(control),
            start_progress: 0.0,
            rewound: false,
            flipped: false,
        }
    }

    /// Swap roles so the entry plays back towards its source
    fn invert(&mut self) {
        std::mem::swap(&mut self.source, &mut self.target);
        self.params = self.params.inverse();
        self.rewound = !self.rewound;
        self.flipped = !self.flipped;
    }
}

#[derive(Default)]
struct QueueState {
    active: Option<ActiveEntry>,
    pending: VecDeque<QueueEntry>,
    next_id: TransitionId,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.active.is_none() && self.pending.is_empty()
    }

    /// Where the next transition has to start; `None` when idle
    fn expected_source(&self) -> Option<Option<WidgetRef>> {
        if let Some(last) = self.pending.back() {
            return Some(last.target.clone());
        }
        self.active.as_ref().map(|active| active.target.clone())
    }

    /// Mark every pending entry from `position` on as settle-only
    fn cancel_from(&mut self, position: usize) {
        for entry in self.pending.iter_mut().skip(position) {
            if !entry.settle_only {
                debug!(transition = entry.id, "Pending transition cancelled");
            }
            entry.settle_only = true;
            entry.token.cancel();
        }
    }
}

enum WaitState {
    Promoted,
    Waiting,
    Cancelled,
}

/// Snapshot of the active entry taken for one execution round
struct Round {
    params: VisibilityTransitionParams,
    source: Option<WidgetRef>,
    target: Option<WidgetRef>,
    token: CancellationToken,
    control: Arc<PlaybackControl>,
    start_progress: f64,
}

/// Queue of animated handoffs between widgets
pub struct TransitionManager {
    state: Mutex<QueueState>,
    scheduler: Arc<dyn Scheduler>,
    renderer: Arc<dyn AnimationRenderer>,
    fallback_animation: AnimationKind,
    time_mode: TimeMode,
}

impl TransitionManager {
    /// Create a manager drawing with `renderer` and ticking with `scheduler`
    pub fn new(scheduler: Arc<dyn Scheduler>, renderer: Arc<dyn AnimationRenderer>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            scheduler,
            renderer,
            fallback_animation: AnimationKind::Fade,
            time_mode: TimeMode::Scaled,
        }
    }

    /// Create a manager from configuration, using its frame scheduler
    pub fn from_config(config: &NavigationConfig, renderer: Arc<dyn AnimationRenderer>) -> Self {
        Self::new(Arc::new(config.scheduler()), renderer)
            .with_fallback_animation(config.fallback_animation)
            .with_time_mode(config.time_mode)
    }

    /// Manager that draws nothing, for headless hosts
    pub fn headless(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::new(scheduler, Arc::new(NullRenderer))
    }

    pub fn with_fallback_animation(mut self, kind: AnimationKind) -> Self {
        self.fallback_animation = kind;
        self
    }

    pub fn with_time_mode(mut self, mode: TimeMode) -> Self {
        self.time_mode = mode;
        self
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Validate chain continuity and accept a transition
    ///
    /// Nothing is animated here; an idle queue with an instantaneous
    /// transition is applied on the spot.
    pub fn enqueue(
        self: &Arc<Self>,
        params: VisibilityTransitionParams,
        source: Option<WidgetRef>,
        target: Option<WidgetRef>,
        cancel: Option<CancellationToken>,
    ) -> Result<Enqueued> {
        let mut state = self.state.lock();

        if let Some(expected) = state.expected_source() {
            if !same_slot(expected.as_ref(), source.as_ref()) {
                let err = TransitionError::ChainContinuity {
                    expected: describe(expected.as_ref()),
                    actual: describe(source.as_ref()),
                };
                error!(%err, "Rejected transition");
                return Err(err.into());
            }
        }

        if state.is_idle() && params.target_kind() == TargetKind::None {
            settle(source.as_ref(), target.as_ref());
            debug!(
                from = %describe(source.as_ref()),
                to = %describe(target.as_ref()),
                "Instant transition applied"
            );
            return Ok(Enqueued::Settled);
        }

        state.next_id += 1;
        let id = state.next_id;
        let token = cancel
            .map(|parent| parent.child_token())
            .unwrap_or_default();
        let entry = QueueEntry {
            id,
            params,
            source,
            target,
            token: token.clone(),
            settle_only: false,
            skipped: false,
        };

        if state.is_idle() {
            state.active = Some(ActiveEntry::promote(entry));
            info!(transition = id, %params, "Transition active");
        } else {
            state.pending.push_back(entry);
            info!(
                transition = id,
                %params,
                pending = state.pending.len(),
                "Transition queued"
            );
        }

        Ok(Enqueued::Queued(TransitionTicket {
            manager: Arc::clone(self),
            id,
            token,
            finished: false,
        }))
    }

    /// Enqueue a transition and drive it to its end
    pub async fn transition(
        self: &Arc<Self>,
        params: VisibilityTransitionParams,
        source: Option<WidgetRef>,
        target: Option<WidgetRef>,
        cancel: Option<CancellationToken>,
    ) -> Result<TransitionOutcome> {
        match self.enqueue(params, source, target, cancel)? {
            Enqueued::Settled => Ok(TransitionOutcome::Completed),
            Enqueued::Queued(ticket) => ticket.run().await,
        }
    }

    /// Force the active animation(s) to their end state
    pub fn skip_active(&self) -> bool {
        let state = self.state.lock();
        match &state.active {
            Some(active) => {
                active.control.request_skip();
                info!(transition = active.id, "Skipping active transition");
                true
            }
            None => false,
        }
    }

    /// Reverse the active transition, dropping everything queued behind it
    ///
    /// The inverse replaces the active entry right away, so the next
    /// transition has to start from the original source. Playback picks it
    /// up from wherever the animation got to, governed by `cancel` from then
    /// on. A skip requested before the rewind does not carry over.
    pub fn rewind_active(&self, cancel: Option<CancellationToken>) -> bool {
        let mut state = self.state.lock();
        let dropped: Vec<QueueEntry> = state.pending.drain(..).collect();
        for entry in &dropped {
            entry.token.cancel();
        }

        let Some(active) = state.active.as_mut() else {
            return false;
        };
        active.invert();
        active.control.request_rewind();
        active.token = cancel.map(|parent| parent.child_token()).unwrap_or_default();
        info!(
            transition = active.id,
            dropped = dropped.len(),
            "Rewinding active transition"
        );
        true
    }

    /// Skip everything still in flight, for teardown
    ///
    /// Pending entries jump to their end state as they are promoted, so
    /// their tickets still report completion. Entries already cancelled stay
    /// cancelled.
    pub fn terminate(&self) {
        let mut state = self.state.lock();
        if let Some(active) = &state.active {
            active.control.request_skip();
        }
        for entry in state.pending.iter_mut() {
            entry.skipped = true;
        }
        info!(pending = state.pending.len(), "Transition manager terminated");
    }

    /// Whether nothing is active or queued
    pub fn is_idle(&self) -> bool {
        self.state.lock().is_idle()
    }

    /// Number of entries waiting behind the active one
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn active_id(&self) -> Option<TransitionId> {
        self.state.lock().active.as_ref().map(|active| active.id)
    }

    /// Source the next enqueued transition must declare; `None` when unconstrained
    pub fn expected_source(&self) -> Option<Option<WidgetRef>> {
        self.state.lock().expected_source()
    }

    fn poll_wait(&self, id: TransitionId, cancelled: bool) -> WaitState {
        let mut state = self.state.lock();
        if state.active.as_ref().is_some_and(|active| active.id == id) {
            return WaitState::Promoted;
        }

        let Some(position) = state.pending.iter().position(|entry| entry.id == id) else {
            return WaitState::Cancelled;
        };
        if state.pending[position].settle_only {
            return WaitState::Cancelled;
        }
        if cancelled {
            // Everything queued behind this entry expected to start from its target
            state.cancel_from(position);
            return WaitState::Cancelled;
        }
        WaitState::Waiting
    }

    fn round(&self, id: TransitionId) -> Option<Round> {
        let state = self.state.lock();
        let active = state.active.as_ref().filter(|active| active.id == id)?;
        Some(Round {
            params: active.params,
            source: active.source.clone(),
            target: active.target.clone(),
            token: active.token.clone(),
            control: Arc::clone(&active.control),
            start_progress: active.start_progress,
        })
    }

    /// Prepare another round when the active entry was inverted mid-round
    ///
    /// `progress` is how far the finished round got in its own direction.
    /// Returns `false` when the entry is done.
    fn resume_inverted(&self, id: TransitionId, phase: PlaybackOutcome) -> bool {
        let mut state = self.state.lock();
        let Some(active) = state.active.as_mut().filter(|active| active.id == id) else {
            return false;
        };
        let progress = match phase {
            PlaybackOutcome::Rewound { progress } => progress.clamp(0.0, 1.0),
            PlaybackOutcome::Completed | PlaybackOutcome::Skipped if active.flipped => 1.0,
            _ => return false,
        };

        active.control.clear_rewind();
        active.start_progress = if active.flipped {
            1.0 - progress
        } else {
            // Rewound an even number of times; carry on where it was
            progress
        };
        active.flipped = false;
        debug!(
            transition = id,
            start = active.start_progress,
            rewound = active.rewound,
            "Resuming inverted transition"
        );
        true
    }

    /// Current ends of the active entry, falling back to a round's snapshot
    fn active_ends(
        &self,
        id: TransitionId,
        round: &Round,
    ) -> (Option<WidgetRef>, Option<WidgetRef>) {
        let state = self.state.lock();
        match state.active.as_ref().filter(|active| active.id == id) {
            Some(active) => (active.source.clone(), active.target.clone()),
            None => (round.source.clone(), round.target.clone()),
        }
    }

    /// Clear the active slot and promote the next live entry
    fn finish_active(&self, id: TransitionId) -> bool {
        let mut state = self.state.lock();
        let rewound = match state.active.as_ref() {
            Some(active) if active.id == id => active.rewound,
            _ => return false,
        };
        state.active = None;

        while let Some(entry) = state.pending.pop_front() {
            if entry.settle_only {
                settle(entry.source.as_ref(), entry.target.as_ref());
                debug!(transition = entry.id, "Cancelled transition settled");
                continue;
            }
            info!(transition = entry.id, "Transition promoted");
            state.active = Some(ActiveEntry::promote(entry));
            break;
        }
        rewound
    }

    /// Cancel everything queued behind the active entry
    fn cancel_pending(&self) {
        self.state.lock().cancel_from(0);
    }

    fn abandon(&self, id: TransitionId) {
        let snapshot = {
            let mut state = self.state.lock();
            let position = state.pending.iter().position(|entry| entry.id == id);
            if let Some(position) = position {
                let entry = &mut state.pending[position];
                entry.settle_only = true;
                entry.token.cancel();
                None
            } else {
                state
                    .active
                    .as_ref()
                    .filter(|active| active.id == id)
                    .map(|active| (active.source.clone(), active.target.clone()))
            }
        };

        if let Some((source, target)) = snapshot {
            warn!(transition = id, "Active transition abandoned, settling");
            settle(source.as_ref(), target.as_ref());
            self.finish_active(id);
        }
    }

    async fn execute(&self, id: TransitionId) -> Result<TransitionOutcome> {
        loop {
            let Some(round) = self.round(id) else {
                return Err(TransitionError::Cancelled.into());
            };

            let phase = match self.run_phase(&round).await {
                Ok(phase) => phase,
                Err(err) => {
                    error!(transition = id, %err, "Transition failed");
                    let (source, target) = self.active_ends(id, &round);
                    settle(source.as_ref(), target.as_ref());
                    self.finish_active(id);
                    return Err(err);
                }
            };

            if self.resume_inverted(id, phase) {
                continue;
            }

            match phase {
                PlaybackOutcome::Completed | PlaybackOutcome::Skipped => {
                    let rewound = self.finish_active(id);
                    debug!(transition = id, ?phase, "Transition finished");
                    return Ok(if rewound {
                        TransitionOutcome::Rewound
                    } else {
                        TransitionOutcome::Completed
                    });
                }
                PlaybackOutcome::Cancelled => {
                    let (source, target) = self.active_ends(id, &round);
                    settle(source.as_ref(), target.as_ref());
                    self.cancel_pending();
                    self.finish_active(id);
                    info!(transition = id, "Active transition cancelled");
                    return Err(TransitionError::Cancelled.into());
                }
                PlaybackOutcome::Rewound { .. } => {
                    // Only reachable once the entry is gone
                    return Err(TransitionError::Cancelled.into());
                }
            }
        }
    }

    async fn run_phase(&self, round: &Round) -> Result<PlaybackOutcome> {
        let target = round.target.as_ref();
        // A widget handing off to itself only ever needs to end up visible
        let source = round
            .source
            .as_ref()
            .filter(|source| !same_slot(Some(*source), target));

        let order = round.params.sort_order();
        if let Some(source) = source {
            source.set_sort_priority(order.source);
        }
        if let Some(target) = target {
            target.set_sort_priority(order.target);
        }

        let entry = match (round.params.entry_animation, target) {
            (Some(kind), Some(widget)) => Some(self.playback(widget, kind, Visibility::Visible, round)?),
            _ => None,
        };
        let exit = match (round.params.exit_animation, source) {
            (Some(kind), Some(widget)) => Some(self.playback(widget, kind, Visibility::Hidden, round)?),
            _ => None,
        };

        if round.token.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled);
        }

        let outcome = match (entry, exit) {
            (None, None) => {
                settle(source, target);
                PlaybackOutcome::Completed
            }
            (Some(entry), None) => {
                entry.widget.set_visible(true);
                let outcome = self.play(&entry, round).await;
                if finished(outcome) {
                    if let Some(source) = source {
                        source.set_visible(false);
                    }
                }
                outcome
            }
            (None, Some(exit)) => {
                if let Some(target) = target {
                    target.set_visible(true);
                }
                let outcome = self.play(&exit, round).await;
                if finished(outcome) {
                    exit.widget.set_visible(false);
                }
                outcome
            }
            (Some(entry), Some(exit)) => {
                entry.widget.set_visible(true);
                let (entry_outcome, exit_outcome) =
                    futures::future::join(self.play(&entry, round), self.play(&exit, round)).await;
                let outcome = entry_outcome.join(exit_outcome);
                if finished(outcome) {
                    exit.widget.set_visible(false);
                }
                outcome
            }
        };
        Ok(outcome)
    }

    fn playback<'a>(
        &self,
        widget: &'a WidgetRef,
        requested: AnimationKind,
        visibility: Visibility,
        round: &Round,
    ) -> Result<Playback<'a>> {
        let kind = resolve_kind(self.renderer.as_ref(), requested, self.fallback_animation)
            .ok_or_else(|| TransitionError::AnimationUnavailable {
                kind: requested.to_string(),
                widget: widget.kind(),
            })?;
        if kind != requested {
            debug!(%requested, fallback = %kind, widget = %widget.kind(), "Animation fell back");
        }
        Ok(Playback {
            widget,
            kind,
            visibility,
            length: round.params.length,
            easing: round.params.easing,
            time_mode: self.time_mode,
            start_progress: round.start_progress,
        })
    }

    async fn play(&self, playback: &Playback<'_>, round: &Round) -> PlaybackOutcome {
        playback
            .run(
                self.scheduler.as_ref(),
                self.renderer.as_ref(),
                &round.control,
                &round.token,
            )
            .await
    }
}

impl std::fmt::Debug for TransitionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransitionManager")
            .field("active", &state.active.as_ref().map(|a| a.id))
            .field("pending", &state.pending.len())
            .field("time_mode", &self.time_mode)
            .finish()
    }
}

fn finished(outcome: PlaybackOutcome) -> bool {
    matches!(
        outcome,
        PlaybackOutcome::Completed | PlaybackOutcome::Skipped
    )
}

/// Instant handoff: source hidden, target shown
fn settle(source: Option<&WidgetRef>, target: Option<&WidgetRef>) {
    if let Some(source) = source {
        if !same_slot(Some(source), target) {
            source.set_visible(false);
        }
    }
    if let Some(target) = target {
        target.set_visible(true);
    }
}

/// Handle to a transition accepted by [`TransitionManager::enqueue`]
///
/// Dropping the ticket before [`run`](Self::run) finishes releases its slot:
/// a pending transition is settled instantly in order, an active one jumps
/// to its end state.
pub struct TransitionTicket {
    manager: Arc<TransitionManager>,
    id: TransitionId,
    token: CancellationToken,
    finished: bool,
}

impl TransitionTicket {
    pub fn id(&self) -> TransitionId {
        self.id
    }

    /// Token governing this transition while it waits in the queue
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for promotion, then play the transition
    pub async fn run(mut self) -> Result<TransitionOutcome> {
        let manager = Arc::clone(&self.manager);
        let scheduler = Arc::clone(manager.scheduler());

        loop {
            match manager.poll_wait(self.id, self.token.is_cancelled()) {
                WaitState::Promoted => break,
                WaitState::Cancelled => {
                    self.finished = true;
                    info!(transition = self.id, "Queued transition cancelled");
                    return Err(TransitionError::Cancelled.into());
                }
                WaitState::Waiting => {}
            }
            tokio::select! {
                _ = scheduler.next_tick() => {}
                _ = self.token.cancelled() => {}
            }
        }

        let result = manager.execute(self.id).await;
        self.finished = true;
        result
    }
}

impl Drop for TransitionTicket {
    fn drop(&mut self) {
        if !self.finished {
            self.manager.abandon(self.id);
        }
    }
}

impl std::fmt::Debug for TransitionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionTicket")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationFrame, Easing};
    use crate::scheduler::FrameScheduler;
    use crate::widget::testing::{as_ref, MockWidget};
    use crate::widget::Widget;
    use std::time::Duration;

    #[derive(Default)]
    struct FrameLog(parking_lot::Mutex<Vec<(&'static str, AnimationFrame)>>);

    impl FrameLog {
        fn widgets(&self) -> Vec<&'static str> {
            let mut seen: Vec<&'static str> = Vec::new();
            for (kind, _) in self.0.lock().iter() {
                if seen.last() != Some(kind) {
                    seen.push(kind);
                }
            }
            seen
        }
    }

    impl AnimationRenderer for FrameLog {
        fn supports(&self, kind: AnimationKind) -> bool {
            kind != AnimationKind::Scale
        }

        fn render(&self, widget: &dyn Widget, frame: &AnimationFrame) {
            self.0.lock().push((widget.kind().as_str(), *frame));
        }
    }

    fn manager(renderer: Arc<FrameLog>) -> Arc<TransitionManager> {
        Arc::new(TransitionManager::new(
            Arc::new(FrameScheduler::new(Duration::from_millis(10))),
            renderer,
        ))
    }

    fn fade_in(ms: u64) -> VisibilityTransitionParams {
        VisibilityTransitionParams::new(Duration::from_millis(ms)).with_entry(AnimationKind::Fade)
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_transition_is_instant() {
        let mgr = manager(Arc::default());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let enqueued = mgr
            .enqueue(
                VisibilityTransitionParams::none(),
                Some(as_ref(&a)),
                Some(as_ref(&b)),
                None,
            )
            .unwrap();
        assert!(matches!(enqueued, Enqueued::Settled));
        assert!(!a.is_visible());
        assert!(b.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_animation_hides_source_at_end() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let outcome = mgr
            .transition(fade_in(50), Some(as_ref(&a)), Some(as_ref(&b)), None)
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Completed);
        assert!(!a.is_visible());
        assert!(b.is_visible());
        assert_eq!(log.widgets(), vec!["b"]);
        assert_eq!(b.sort_priority(), 1);
        assert_eq!(a.sort_priority(), 0);
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_only_shows_target_first() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let params = VisibilityTransitionParams::new(Duration::from_millis(30))
            .with_exit(AnimationKind::SlideLeft);
        mgr.transition(params, Some(as_ref(&a)), Some(as_ref(&b)), None)
            .await
            .unwrap();

        assert_eq!(b.visibility_log(), vec![true]);
        assert_eq!(a.visibility_log(), vec![true, false]);
        assert_eq!(log.widgets(), vec!["a"]);
        assert!(log
            .0
            .lock()
            .iter()
            .all(|(_, f)| f.visibility == Visibility::Hidden));
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_animate_concurrently() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let params = fade_in(40).with_exit(AnimationKind::Fade);
        mgr.transition(params, Some(as_ref(&a)), Some(as_ref(&b)), None)
            .await
            .unwrap();

        let frames = log.0.lock();
        let a_frames = frames.iter().filter(|(k, _)| *k == "a").count();
        let b_frames = frames.iter().filter(|(k, _)| *k == "b").count();
        assert_eq!(a_frames, b_frames);
        // Interleaved rather than one after the other
        assert_ne!(frames[0].0, frames[1].0);
        assert_eq!(a.sort_priority(), b.sort_priority());
        assert!(!a.is_visible());
        assert!(b.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_continuity_rejected_before_animation() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        let c = MockWidget::new("c");

        let Enqueued::Queued(first) = mgr
            .enqueue(fade_in(50), Some(as_ref(&a)), Some(as_ref(&b)), None)
            .unwrap()
        else {
            panic!("expected a queued transition");
        };

        let err = mgr
            .enqueue(fade_in(50), Some(as_ref(&a)), Some(as_ref(&c)), None)
            .err()
            .unwrap();
        assert!(err.is_contract_violation());
        assert_eq!(mgr.pending_count(), 0);
        assert!(log.0.lock().is_empty());

        first.run().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_transition_waits_for_previous() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        let c = MockWidget::new("c");
        a.set_visible(true);

        let first = mgr.transition(fade_in(50), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let second = mgr.transition(fade_in(50), Some(as_ref(&b)), Some(as_ref(&c)), None);
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), TransitionOutcome::Completed);
        assert_eq!(second.unwrap(), TransitionOutcome::Completed);
        // b finished animating before c started
        assert_eq!(log.widgets(), vec!["b", "c"]);
        assert!(!a.is_visible());
        assert!(!b.is_visible());
        assert!(c.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_stays_pending_until_promoted() {
        let mgr = manager(Arc::default());
        let [a, b, c] = ["a", "b", "c"].map(MockWidget::new);

        let Enqueued::Queued(first) = mgr
            .enqueue(fade_in(30), Some(as_ref(&a)), Some(as_ref(&b)), None)
            .unwrap()
        else {
            panic!("expected a queued transition");
        };
        let Enqueued::Queued(second) = mgr
            .enqueue(fade_in(30), Some(as_ref(&b)), Some(as_ref(&c)), None)
            .unwrap()
        else {
            panic!("expected a queued transition");
        };
        assert_eq!(mgr.active_id(), Some(first.id()));
        assert_eq!(mgr.pending_count(), 1);
        assert!(same_slot(
            mgr.expected_source().unwrap().as_ref(),
            Some(&as_ref(&c))
        ));

        let second_id = second.id();
        let waiting = tokio::spawn(second.run());
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!c.is_visible());
        assert_eq!(mgr.pending_count(), 1);

        first.run().await.unwrap();
        assert_eq!(mgr.active_id(), Some(second_id));

        assert_eq!(waiting.await.unwrap().unwrap(), TransitionOutcome::Completed);
        assert!(c.is_visible());
        assert!(mgr.is_idle());
        assert!(mgr.expected_source().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_pending_cascades_but_spares_active() {
        let mgr = manager(Arc::default());
        let [a, b, c, d] = ["a", "b", "c", "d"].map(MockWidget::new);
        a.set_visible(true);

        let first_token = CancellationToken::new();
        let second_token = CancellationToken::new();

        let first = mgr.transition(
            fade_in(50),
            Some(as_ref(&a)),
            Some(as_ref(&b)),
            Some(first_token.clone()),
        );
        let second = mgr.transition(
            fade_in(50),
            Some(as_ref(&b)),
            Some(as_ref(&c)),
            Some(second_token.clone()),
        );
        let third = mgr.transition(fade_in(50), Some(as_ref(&c)), Some(as_ref(&d)), None);
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            second_token.cancel();
        };

        let (first, second, third, ()) = tokio::join!(first, second, third, canceller);

        assert_eq!(first.unwrap(), TransitionOutcome::Completed);
        assert!(second.unwrap_err().is_cancelled());
        assert!(third.unwrap_err().is_cancelled());
        assert!(!first_token.is_cancelled());
        // Cancelled entries still settle in order
        assert!(d.is_visible());
        assert!(!b.is_visible());
        assert!(!c.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_active_cancels_queue() {
        let mgr = manager(Arc::default());
        let [a, b, c] = ["a", "b", "c"].map(MockWidget::new);
        a.set_visible(true);

        let token = CancellationToken::new();
        let first = mgr.transition(
            fade_in(100),
            Some(as_ref(&a)),
            Some(as_ref(&b)),
            Some(token.clone()),
        );
        let second = mgr.transition(fade_in(100), Some(as_ref(&b)), Some(as_ref(&c)), None);
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        };

        let (first, second, ()) = tokio::join!(first, second, canceller);
        assert!(first.unwrap_err().is_cancelled());
        assert!(second.unwrap_err().is_cancelled());
        assert!(!a.is_visible());
        assert!(!b.is_visible());
        assert!(c.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_active_completes_normally() {
        let mgr = manager(Arc::default());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let run = mgr.transition(fade_in(10_000), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let skipper = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(mgr.skip_active());
        };
        let start = tokio::time::Instant::now();
        let (outcome, ()) = tokio::join!(run, skipper);

        assert_eq!(outcome.unwrap(), TransitionOutcome::Completed);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(b.is_visible());
        assert!(!a.is_visible());
        assert!(!mgr.skip_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewind_restores_source() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let [a, b, c] = ["a", "b", "c"].map(MockWidget::new);
        a.set_visible(true);

        let params = fade_in(100).with_easing(Easing::EaseOutCubic);
        let first = mgr.transition(params, Some(as_ref(&a)), Some(as_ref(&b)), None);
        let second = mgr.transition(fade_in(100), Some(as_ref(&b)), Some(as_ref(&c)), None);
        let rewinder = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert!(mgr.rewind_active(None));
            assert_eq!(mgr.pending_count(), 0);
        };

        let (first, second, ()) = tokio::join!(first, second, rewinder);
        assert_eq!(first.unwrap(), TransitionOutcome::Rewound);
        assert!(second.unwrap_err().is_cancelled());
        assert!(a.is_visible());
        assert!(!b.is_visible());
        assert!(!c.is_visible());

        // The inverse played a's exit animation backwards, i.e. b hiding
        let frames = log.0.lock();
        let (_, last) = frames.last().unwrap();
        assert_eq!(last.visibility, Visibility::Hidden);
        assert_eq!(last.progress, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_animation_falls_back() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");

        let params = VisibilityTransitionParams::new(Duration::from_millis(20))
            .with_entry(AnimationKind::Scale);
        mgr.transition(params, None, Some(as_ref(&a)), None)
            .await
            .unwrap();
        assert!(log
            .0
            .lock()
            .iter()
            .all(|(_, f)| f.kind == AnimationKind::Fade));

        let strict = Arc::new(
            TransitionManager::new(
                Arc::new(FrameScheduler::new(Duration::from_millis(10))),
                log.clone(),
            )
            .with_fallback_animation(AnimationKind::Scale),
        );
        let b = MockWidget::new("b");
        let err = strict
            .transition(params, Some(as_ref(&a)), Some(as_ref(&b)), None)
            .await
            .unwrap_err();
        assert!(err.is_contract_violation());
        // The queue is left consistent
        assert!(strict.is_idle());
        assert!(b.is_visible());
        assert!(!a.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_ticket_releases_queue() {
        let mgr = manager(Arc::default());
        let [a, b, c] = ["a", "b", "c"].map(MockWidget::new);
        a.set_visible(true);

        let Enqueued::Queued(first) = mgr
            .enqueue(fade_in(50), Some(as_ref(&a)), Some(as_ref(&b)), None)
            .unwrap()
        else {
            panic!("expected a queued transition");
        };
        let Enqueued::Queued(second) = mgr
            .enqueue(fade_in(50), Some(as_ref(&b)), Some(as_ref(&c)), None)
            .unwrap()
        else {
            panic!("expected a queued transition");
        };

        drop(second);
        assert_eq!(mgr.pending_count(), 1);
        first.run().await.unwrap();

        assert!(mgr.is_idle());
        assert!(c.is_visible());
        assert!(!b.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_skips_everything() {
        let mgr = manager(Arc::default());
        let [a, b, c] = ["a", "b", "c"].map(MockWidget::new);
        a.set_visible(true);

        let first = mgr.transition(fade_in(10_000), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let second = mgr.transition(fade_in(10_000), Some(as_ref(&b)), Some(as_ref(&c)), None);
        let terminator = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            mgr.terminate();
        };

        let start = tokio::time::Instant::now();
        let (first, second, ()) = tokio::join!(first, second, terminator);
        assert_eq!(first.unwrap(), TransitionOutcome::Completed);
        assert_eq!(second.unwrap(), TransitionOutcome::Completed);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(!a.is_visible());
        assert!(!b.is_visible());
        assert!(c.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewind_moves_chain_back_immediately() {
        let mgr = manager(Arc::default());
        let [a, b, c] = ["a", "b", "c"].map(MockWidget::new);
        a.set_visible(true);

        let first = mgr.transition(fade_in(100), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let follow_up = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert!(mgr.rewind_active(None));

            // The abandoned chain no longer ends at b
            let err = mgr
                .enqueue(fade_in(50), Some(as_ref(&b)), Some(as_ref(&c)), None)
                .err()
                .unwrap();
            assert!(err.is_contract_violation());
            assert!(same_slot(
                mgr.expected_source().unwrap().as_ref(),
                Some(&as_ref(&a))
            ));

            mgr.transition(fade_in(50), Some(as_ref(&a)), Some(as_ref(&c)), None)
                .await
        };

        let (first, second) = tokio::join!(first, follow_up);
        assert_eq!(first.unwrap(), TransitionOutcome::Rewound);
        assert_eq!(second.unwrap(), TransitionOutcome::Completed);
        assert!(!a.is_visible());
        assert!(!b.is_visible());
        assert!(c.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewinding_twice_resumes_forward() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let run = mgr.transition(fade_in(100), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let rewinder = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert!(mgr.rewind_active(None));
            assert!(mgr.rewind_active(None));
        };
        let start = tokio::time::Instant::now();
        let (outcome, ()) = tokio::join!(run, rewinder);

        assert_eq!(outcome.unwrap(), TransitionOutcome::Completed);
        assert!(b.is_visible());
        assert!(!a.is_visible());
        // Picked up where it was rather than starting over
        assert!(start.elapsed() < Duration::from_millis(150));
        assert_eq!(log.widgets(), vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_right_after_rewind() {
        let mgr = manager(Arc::default());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let run = mgr.transition(fade_in(10_000), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let controller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(mgr.rewind_active(None));
            assert!(mgr.skip_active());
        };
        let start = tokio::time::Instant::now();
        let (outcome, ()) = tokio::join!(run, controller);

        assert_eq!(outcome.unwrap(), TransitionOutcome::Rewound);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(a.is_visible());
        assert!(!b.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_rewound_inverse() {
        let mgr = manager(Arc::default());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let token = CancellationToken::new();
        let run = mgr.transition(fade_in(1_000), Some(as_ref(&a)), Some(as_ref(&b)), None);
        let controller = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert!(mgr.rewind_active(Some(token.clone())));
            tokio::time::sleep(Duration::from_millis(40)).await;
            token.cancel();
        };

        let (outcome, ()) = tokio::join!(run, controller);
        assert!(outcome.unwrap_err().is_cancelled());
        // Settled on the inverse's end
        assert!(a.is_visible());
        assert!(!b.is_visible());
        assert!(mgr.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_both_stops_entry_and_exit() {
        let log = Arc::new(FrameLog::default());
        let mgr = manager(log.clone());
        let a = MockWidget::new("a");
        let b = MockWidget::new("b");
        a.set_visible(true);

        let token = CancellationToken::new();
        let params = fade_in(100).with_exit(AnimationKind::Fade);
        let run = mgr.transition(params, Some(as_ref(&a)), Some(as_ref(&b)), Some(token.clone()));
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        };

        let (outcome, ()) = tokio::join!(run, canceller);
        assert!(outcome.unwrap_err().is_cancelled());
        assert!(b.is_visible());
        assert!(!a.is_visible());
        assert!(mgr.is_idle());

        let frames = log.0.lock();
        assert!(frames.iter().any(|(k, _)| *k == "a"));
        assert!(frames.iter().any(|(k, _)| *k == "b"));
        // Neither side played on to its end
        assert!(frames.iter().all(|(_, f)| f.progress < 1.0));
    }
}
