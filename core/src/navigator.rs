//! History-backed navigation state machine
//!
//! The navigator tracks which widget kind is active, a version counter that
//! invalidates outdated requests, and a lock flag. It never touches widget
//! visibility; coordinators pair it with a transition manager.
//!
//! State changes are split in two phases so a caller can validate a
//! transition between them: `prepare_*` checks everything and hands back a
//! step, `apply*` commits it. Expected refusals (locked, already active,
//! nothing to return to) come back as unsuccessful results, never as errors.

use crate::error::{HistoryError, NavigationError, RequestError, Result};
use crate::history::{EntryId, HistoryStack};
use crate::params::VisibilityTransitionParams;
use crate::registry::Registry;
use crate::widget::{WidgetKind, WidgetRef};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Event recorded in a navigation history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// Kind that was active before the navigation
    Navigated { previous: WidgetKind },
    /// Transition that carried the navigation out
    Transition(VisibilityTransitionParams),
}

/// History stack shared between a navigator and its controller
pub type SharedHistory = Arc<Mutex<HistoryStack<HistoryEvent>>>;

/// Outcome of a navigator operation, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResult {
    pub previous: Option<WidgetKind>,
    pub active: Option<WidgetKind>,
    pub success: bool,
    pub history_count: usize,
    /// Entry written or consumed by the operation
    pub history_entry: Option<EntryId>,
}

/// First phase of a two-phase operation
#[derive(Debug)]
pub enum Prepared<S, R> {
    /// Validated; pass the step to the matching apply call
    Ready(S),
    /// Refused for an expected reason; the result was already published
    Refused(R),
}

/// Validated navigation waiting to be applied
pub struct NavigateStep {
    source: Option<WidgetRef>,
    target: WidgetRef,
    version: u64,
}

impl NavigateStep {
    /// Widget active when the step was prepared
    pub fn source(&self) -> Option<&WidgetRef> {
        self.source.as_ref()
    }

    pub fn target(&self) -> &WidgetRef {
        &self.target
    }
}

/// Validated return waiting to be applied
pub struct ReturnStep {
    source: WidgetRef,
    target: WidgetRef,
    entry: EntryId,
    recorded: Option<VisibilityTransitionParams>,
    version: u64,
}

impl ReturnStep {
    pub fn source(&self) -> &WidgetRef {
        &self.source
    }

    /// Widget the history entry returns to
    pub fn target(&self) -> &WidgetRef {
        &self.target
    }

    /// Transition recorded when the entry was written
    pub fn recorded_transition(&self) -> Option<VisibilityTransitionParams> {
        self.recorded
    }
}

#[derive(Default)]
struct NavigationState {
    active: Option<WidgetRef>,
    version: u64,
    locked: bool,
}

/// Navigation state machine over a widget registry
pub struct Navigator {
    registry: Arc<Registry>,
    history: SharedHistory,
    state: Mutex<NavigationState>,
    events: broadcast::Sender<NavigationResult>,
}

impl Navigator {
    /// Create a navigator with its own history
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_history(registry, SharedHistory::default(), 64)
    }

    /// Create a navigator writing to a history owned elsewhere
    pub fn with_history(registry: Arc<Registry>, history: SharedHistory, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            registry,
            history,
            state: Mutex::new(NavigationState::default()),
            events,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Observe every navigation attempt
    pub fn subscribe(&self) -> broadcast::Receiver<NavigationResult> {
        self.events.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    pub fn active_kind(&self) -> Option<WidgetKind> {
        self.state.lock().active.as_ref().map(|w| w.kind())
    }

    pub fn active_widget(&self) -> Option<WidgetRef> {
        self.state.lock().active.clone()
    }

    pub fn history_count(&self) -> usize {
        self.history.lock().len()
    }

    /// Disable navigate and return until [`Navigator::unlock`]
    pub fn lock(&self) {
        self.state.lock().locked = true;
        debug!("Navigator locked");
    }

    pub fn unlock(&self) {
        self.state.lock().locked = false;
        debug!("Navigator unlocked");
    }

    /// Navigate to `target` without any transition
    pub fn navigate(&self, target: &WidgetRef, add_to_history: bool) -> Result<NavigationResult> {
        match self.prepare_navigate(target)? {
            Prepared::Ready(step) => {
                self.apply_navigate(step, add_to_history, VisibilityTransitionParams::none())
            }
            Prepared::Refused(result) => Ok(result),
        }
    }

    /// Check that navigating to `target` is possible right now
    pub fn prepare_navigate(
        &self,
        target: &WidgetRef,
    ) -> Result<Prepared<NavigateStep, NavigationResult>> {
        let (source, version, refusal) = {
            let state = self.state.lock();
            let refusal = if state.locked {
                Some("navigator is locked")
            } else if state.active.as_ref().map(|w| w.kind()) == Some(target.kind()) {
                Some("target is already active")
            } else {
                None
            };
            (state.active.clone(), state.version, refusal)
        };
        if let Some(reason) = refusal {
            return Ok(Prepared::Refused(self.refuse(reason)));
        }

        let target = self.resolve(target)?;
        Ok(Prepared::Ready(NavigateStep {
            source,
            target,
            version,
        }))
    }

    /// Commit a prepared navigation, recording `transition` in history
    pub fn apply_navigate(
        &self,
        step: NavigateStep,
        add_to_history: bool,
        transition: VisibilityTransitionParams,
    ) -> Result<NavigationResult> {
        let mut state = self.state.lock();
        check_version(step.version, state.version)?;

        let previous = state.active.as_ref().map(|w| w.kind());
        let mut history = self.history.lock();
        let history_entry = match previous {
            Some(previous) if add_to_history => {
                let id = history.push_new_entry();
                history.append(id, HistoryEvent::Navigated { previous })?;
                history.append(id, HistoryEvent::Transition(transition))?;
                history.commit_entry(id)?;
                Some(id)
            }
            _ => None,
        };

        let active = step.target.kind();
        state.active = Some(step.target);
        state.version += 1;
        let result = NavigationResult {
            previous,
            active: Some(active),
            success: true,
            history_count: history.len(),
            history_entry,
        };
        let version = state.version;
        drop(history);
        drop(state);

        info!(
            previous = ?previous.map(|k| k.as_str()),
            %active,
            version,
            "Navigated"
        );
        Ok(self.emit(result))
    }

    /// Return to the widget recorded by the most recent history entry
    pub fn return_back(&self) -> Result<NavigationResult> {
        match self.prepare_return()? {
            Prepared::Ready(step) => self.apply_return(step),
            Prepared::Refused(result) => Ok(result),
        }
    }

    /// Check that a return is possible and find where it leads
    pub fn prepare_return(&self) -> Result<Prepared<ReturnStep, NavigationResult>> {
        let snapshot = {
            let state = self.state.lock();
            let history = self.history.lock();
            match (&state.active, history.peek()) {
                _ if state.locked => Err("navigator is locked"),
                (None, _) => Err("navigator is idle"),
                (Some(_), None) => Err("history is empty"),
                (Some(active), Some(entry)) => {
                    let mut previous = None;
                    let mut recorded = None;
                    for event in entry.events() {
                        match event {
                            HistoryEvent::Navigated { previous: kind } => previous = Some(*kind),
                            HistoryEvent::Transition(params) => recorded = Some(*params),
                        }
                    }
                    match previous {
                        Some(previous) => {
                            Ok((active.clone(), previous, entry.id(), recorded, state.version))
                        }
                        None => Err("history entry records no navigation"),
                    }
                }
            }
        };

        let (source, previous, entry, recorded, version) = match snapshot {
            Ok(snapshot) => snapshot,
            Err(reason) => return Ok(Prepared::Refused(self.refuse(reason))),
        };

        let target = self
            .registry
            .get(previous)
            .ok_or(NavigationError::NotRegistered { kind: previous })
            .inspect_err(|err| error!(%err, "Return rejected"))?;
        if !target.is_initialized() {
            let err = NavigationError::NotInitialized { kind: previous };
            error!(%err, "Return rejected");
            return Err(err.into());
        }

        Ok(Prepared::Ready(ReturnStep {
            source,
            target,
            entry,
            recorded,
            version,
        }))
    }

    /// Commit a prepared return, consuming its history entry
    pub fn apply_return(&self, step: ReturnStep) -> Result<NavigationResult> {
        let mut state = self.state.lock();
        check_version(step.version, state.version)?;

        let mut history = self.history.lock();
        if history.peek().map(|entry| entry.id()) != Some(step.entry) {
            return Err(HistoryError::NotFound { id: step.entry }.into());
        }
        let entry = history.pop()?;

        let previous = state.active.as_ref().map(|w| w.kind());
        let active = step.target.kind();
        state.active = Some(step.target);
        state.version += 1;
        let result = NavigationResult {
            previous,
            active: Some(active),
            success: true,
            history_count: history.len(),
            history_entry: Some(entry.id()),
        };
        let version = state.version;
        drop(history);
        drop(state);

        info!(%active, version, entry = %entry.id(), "Returned");
        Ok(self.emit(result))
    }

    /// Drop the active widget and all history, unlocking the navigator
    pub fn clear(&self) -> NavigationResult {
        let mut state = self.state.lock();
        let Some(previous) = state.active.take() else {
            drop(state);
            return self.refuse("navigator is idle");
        };

        state.locked = false;
        state.version += 1;
        self.history.lock().clear();
        let version = state.version;
        drop(state);

        info!(previous = %previous.kind(), version, "Navigator cleared");
        self.emit(NavigationResult {
            previous: Some(previous.kind()),
            active: None,
            success: true,
            history_count: 0,
            history_entry: None,
        })
    }

    fn resolve(&self, target: &WidgetRef) -> Result<WidgetRef> {
        let resolved = self.registry.resolve(target).inspect_err(|err| {
            error!(%err, "Navigation rejected");
        })?;
        if !resolved.is_initialized() {
            let err = NavigationError::NotInitialized {
                kind: resolved.kind(),
            };
            error!(%err, "Navigation rejected");
            return Err(err.into());
        }
        Ok(resolved)
    }

    fn refuse(&self, reason: &str) -> NavigationResult {
        let active = self.active_kind();
        warn!(reason, active = ?active.map(|k| k.as_str()), "Navigation refused");
        self.emit(NavigationResult {
            previous: active,
            active,
            success: false,
            history_count: self.history_count(),
            history_entry: None,
        })
    }

    /// Single exit point for every navigation attempt
    fn emit(&self, result: NavigationResult) -> NavigationResult {
        // Nobody listening is fine
        let _ = self.events.send(result.clone());
        result
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Navigator")
            .field("active", &state.active.as_ref().map(|w| w.kind()))
            .field("version", &state.version)
            .field("locked", &state.locked)
            .finish()
    }
}

fn check_version(captured: u64, current: u64) -> Result<()> {
    if captured != current {
        return Err(RequestError::Stale { captured, current }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationKind;
    use crate::error::Error;
    use crate::widget::testing::{as_ref, MockWidget};
    use std::time::Duration;

    fn setup(kinds: &[&'static str]) -> (Navigator, Vec<WidgetRef>) {
        let registry = Arc::new(Registry::new());
        let widgets: Vec<WidgetRef> = kinds
            .iter()
            .map(|kind| {
                let widget = as_ref(&MockWidget::new(*kind));
                registry.register(widget.clone()).unwrap();
                widget
            })
            .collect();
        (Navigator::new(registry), widgets)
    }

    #[test]
    fn test_navigate_and_return() {
        let (nav, w) = setup(&["a", "b"]);

        let first = nav.navigate(&w[0], true).unwrap();
        assert!(first.success);
        assert_eq!(first.active, Some(WidgetKind::new("a")));
        assert_eq!(nav.version(), 1);
        assert_eq!(first.history_count, 0);

        let second = nav.navigate(&w[1], true).unwrap();
        assert_eq!(nav.version(), 2);
        assert_eq!(second.previous, Some(WidgetKind::new("a")));
        assert_eq!(second.history_count, 1);
        assert!(second.history_entry.is_some());

        let back = nav.return_back().unwrap();
        assert!(back.success);
        assert_eq!(back.active, Some(WidgetKind::new("a")));
        assert_eq!(back.history_entry, second.history_entry);
        assert_eq!(nav.version(), 3);
        assert_eq!(nav.history_count(), 0);
    }

    #[test]
    fn test_expected_refusals_do_not_bump_version() {
        let (nav, w) = setup(&["a", "b"]);
        assert!(!nav.return_back().unwrap().success);

        nav.navigate(&w[0], true).unwrap();
        assert!(!nav.navigate(&w[0], true).unwrap().success);
        assert!(!nav.return_back().unwrap().success);

        nav.lock();
        let locked = nav.navigate(&w[1], true).unwrap();
        assert!(!locked.success);
        assert_eq!(locked.active, Some(WidgetKind::new("a")));
        assert_eq!(nav.version(), 1);

        nav.unlock();
        assert!(nav.navigate(&w[1], true).unwrap().success);
    }

    #[test]
    fn test_navigate_without_history() {
        let (nav, w) = setup(&["a", "b"]);
        nav.navigate(&w[0], true).unwrap();
        let result = nav.navigate(&w[1], false).unwrap();
        assert!(result.success);
        assert_eq!(result.history_entry, None);
        assert!(!nav.return_back().unwrap().success);
    }

    #[test]
    fn test_contract_violations() {
        let (nav, _) = setup(&["a"]);

        let stranger = as_ref(&MockWidget::new("stranger"));
        let err = nav.navigate(&stranger, true).unwrap_err();
        assert!(err.is_contract_violation());

        let impostor = as_ref(&MockWidget::new("a"));
        assert_eq!(
            nav.navigate(&impostor, true).unwrap_err(),
            Error::from(NavigationError::AmbiguousRegistration {
                kind: WidgetKind::new("a")
            })
        );

        let registry = nav.registry().clone();
        let pending = MockWidget::uninitialized("pending");
        registry.register(as_ref(&pending)).unwrap();
        assert_eq!(
            nav.navigate(&as_ref(&pending), true).unwrap_err(),
            Error::from(NavigationError::NotInitialized {
                kind: WidgetKind::new("pending")
            })
        );
        assert_eq!(nav.version(), 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let (nav, w) = setup(&["a", "b"]);
        assert!(!nav.clear().success);

        nav.navigate(&w[0], true).unwrap();
        nav.navigate(&w[1], true).unwrap();
        nav.lock();

        let cleared = nav.clear();
        assert!(cleared.success);
        assert_eq!(cleared.previous, Some(WidgetKind::new("b")));
        assert_eq!(nav.active_kind(), None);
        assert!(!nav.is_locked());
        assert_eq!(nav.history_count(), 0);
        assert_eq!(nav.version(), 3);
    }

    #[test]
    fn test_return_carries_recorded_transition() {
        let (nav, w) = setup(&["a", "b"]);
        let params = VisibilityTransitionParams::new(Duration::from_millis(200))
            .with_entry(AnimationKind::SlideLeft);

        nav.navigate(&w[0], true).unwrap();
        let Prepared::Ready(step) = nav.prepare_navigate(&w[1]).unwrap() else {
            panic!("navigation refused");
        };
        nav.apply_navigate(step, true, params).unwrap();

        let Prepared::Ready(step) = nav.prepare_return().unwrap() else {
            panic!("return refused");
        };
        assert_eq!(step.recorded_transition(), Some(params));
        assert_eq!(step.target().kind(), WidgetKind::new("a"));
        nav.apply_return(step).unwrap();
    }

    #[test]
    fn test_stale_step_is_rejected() {
        let (nav, w) = setup(&["a", "b", "c"]);
        nav.navigate(&w[0], true).unwrap();

        let Prepared::Ready(step) = nav.prepare_navigate(&w[1]).unwrap() else {
            panic!("navigation refused");
        };
        nav.navigate(&w[2], true).unwrap();
        assert!(nav
            .apply_navigate(step, true, VisibilityTransitionParams::none())
            .unwrap_err()
            .is_stale());
        assert_eq!(nav.active_kind(), Some(WidgetKind::new("c")));
    }

    #[tokio::test]
    async fn test_every_attempt_is_published() {
        let (nav, w) = setup(&["a"]);
        let mut rx = nav.subscribe();

        nav.navigate(&w[0], true).unwrap();
        nav.navigate(&w[0], true).unwrap();

        assert!(rx.recv().await.unwrap().success);
        assert!(!rx.recv().await.unwrap().success);
    }
}
