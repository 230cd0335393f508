use crate::animation::AnimationRenderer;
use crate::config::NavigationConfig;
use crate::error::Result;
use crate::navigator::{Navigator, Prepared, SharedHistory};
use crate::registry::Registry;
use crate::request::{
    Completion, ExitRequest, NavigationRequest, NavigationResponse, Response, ReturnRequest,
};
use crate::transition::TransitionManager;
use crate::widget::WidgetRef;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Change to the history group stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryGroupEvent {
    Pushed { group_count: usize },
    Popped { group_count: usize },
}

/// Binds a navigator to a transition manager
pub struct NavigationCoordinator {
    navigator: Arc<Navigator>,
    transitions: Arc<TransitionManager>,
    config: NavigationConfig,
    history_events: broadcast::Sender<HistoryGroupEvent>,
}

impl NavigationCoordinator {
    pub fn new(
        navigator: Arc<Navigator>,
        transitions: Arc<TransitionManager>,
        config: NavigationConfig,
    ) -> Arc<Self> {
        let (history_events, _) = broadcast::channel(config.event_capacity.max(1));
        Arc::new(Self {
            navigator,
            transitions,
            config,
            history_events,
        })
    }

    /// Build a navigator and transition manager from configuration
    pub fn from_config(
        registry: Arc<Registry>,
        renderer: Arc<dyn AnimationRenderer>,
        config: NavigationConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let navigator = Navigator::with_history(
            registry,
            SharedHistory::default(),
            config.event_capacity,
        );
        let transitions = TransitionManager::from_config(&config, renderer);
        Ok(Self::new(Arc::new(navigator), Arc::new(transitions), config))
    }

    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.navigator
    }

    pub fn transitions(&self) -> &Arc<TransitionManager> {
        &self.transitions
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn create_navigation_request(self: &Arc<Self>, target: WidgetRef) -> NavigationRequest {
        NavigationRequest::new(Arc::clone(self), target)
    }

    pub fn create_return_request(self: &Arc<Self>) -> ReturnRequest {
        ReturnRequest::new(Arc::clone(self))
    }

    pub fn create_exit_request(self: &Arc<Self>) -> ExitRequest {
        ExitRequest::new(Arc::clone(self))
    }

    /// Navigate with default settings
    pub fn navigate(self: &Arc<Self>, target: WidgetRef) -> Result<NavigationResponse> {
        self.create_navigation_request(target).execute()
    }

    /// Return with default settings
    pub fn return_back(self: &Arc<Self>) -> Result<NavigationResponse> {
        self.create_return_request().execute()
    }

    /// Exit with default settings
    pub fn exit(self: &Arc<Self>) -> Result<NavigationResponse> {
        self.create_exit_request().execute()
    }

    /// Open a history checkpoint
    pub fn push_history_group(&self) {
        let group_count = {
            let mut history = self.navigator.history().lock();
            history.add_new_group();
            history.group_count()
        };
        info!(group_count, "History group pushed");
        let _ = self
            .history_events
            .send(HistoryGroupEvent::Pushed { group_count });
    }

    /// Discard the latest checkpoint and every entry recorded since
    pub fn pop_history_group(&self) -> bool {
        let (popped, group_count) = {
            let mut history = self.navigator.history().lock();
            (history.clear_active_group(), history.group_count())
        };
        if popped {
            info!(group_count, "History group popped");
            let _ = self
                .history_events
                .send(HistoryGroupEvent::Popped { group_count });
        }
        popped
    }

    pub fn subscribe_history(&self) -> broadcast::Receiver<HistoryGroupEvent> {
        self.history_events.subscribe()
    }

    pub(crate) fn process_navigation(&self, request: NavigationRequest) -> Result<NavigationResponse> {
        let step = match self.navigator.prepare_navigate(&request.target)? {
            Prepared::Ready(step) => step,
            Prepared::Refused(result) => return Ok(Response::ready(result)),
        };

        let params = request
            .overrides
            .resolve(step.source(), Some(step.target()), &self.config);
        debug!(widget = %step.target().kind(), %params, "Navigation transition resolved");

        let enqueued = self.transitions.enqueue(
            params,
            step.source().cloned(),
            Some(step.target().clone()),
            request.cancellation,
        )?;
        let result = self.navigator.apply_navigate(
            step,
            request.add_to_history.unwrap_or(true),
            params,
        )?;
        Ok(Response::new(result, Completion::spawn(enqueued)))
    }

    pub(crate) fn process_return(&self, request: ReturnRequest) -> Result<NavigationResponse> {
        let step = match self.navigator.prepare_return()? {
            Prepared::Ready(step) => step,
            Prepared::Refused(result) => return Ok(Response::ready(result)),
        };

        let params = request.overrides.resolve_return(
            step.recorded_transition(),
            step.source(),
            step.target(),
            &self.config,
        );
        debug!(widget = %step.target().kind(), %params, "Return transition resolved");

        let enqueued = self.transitions.enqueue(
            params,
            Some(step.source().clone()),
            Some(step.target().clone()),
            request.cancellation,
        )?;
        let result = self.navigator.apply_return(step)?;
        Ok(Response::new(result, Completion::spawn(enqueued)))
    }

    pub(crate) fn process_exit(&self, request: ExitRequest) -> Result<NavigationResponse> {
        let Some(source) = self.navigator.active_widget() else {
            return Ok(Response::ready(self.navigator.clear()));
        };

        let params = request.overrides.resolve(Some(&source), None, &self.config);
        debug!(source = %source.kind(), %params, "Exit transition resolved");

        let enqueued = self
            .transitions
            .enqueue(params, Some(source), None, request.cancellation)?;
        let result = self.navigator.clear();
        Ok(Response::new(result, Completion::spawn(enqueued)))
    }
}

impl std::fmt::Debug for NavigationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationCoordinator")
            .field("navigator", &self.navigator)
            .field("transitions", &self.transitions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimationKind, Easing, NullRenderer};
    use crate::params::VisibilityTransitionParams;
    use crate::transition::TransitionOutcome;
    use crate::widget::testing::{as_ref, MockWidget};
    use crate::widget::{Widget, WidgetKind};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        coordinator: Arc<NavigationCoordinator>,
        home: Arc<MockWidget>,
        settings: Arc<MockWidget>,
        about: Arc<MockWidget>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(Registry::new());
        let home = MockWidget::new("home");
        let settings = MockWidget::animated(
            "settings",
            Some(Animation::from_millis(AnimationKind::SlideLeft, 100)),
            Some(Animation::from_millis(AnimationKind::Fade, 100)),
        );
        let about = MockWidget::new("about");
        for widget in [&home, &settings, &about] {
            registry.register(as_ref(widget)).unwrap();
        }
        let coordinator = NavigationCoordinator::from_config(
            registry,
            Arc::new(NullRenderer),
            NavigationConfig::default(),
        )
        .unwrap();
        Fixture {
            coordinator,
            home,
            settings,
            about,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_animates_and_records() {
        let f = fixture();
        let first = f.coordinator.navigate(as_ref(&f.home)).unwrap();
        assert!(first.completion().is_finished());
        first.wait().await.unwrap();
        assert!(f.home.is_visible());

        let second = f.coordinator.navigate(as_ref(&f.settings)).unwrap();
        assert!(second.result().success);
        assert_eq!(second.result().history_count, 1);
        assert!(!second.completion().is_finished());
        second.wait().await.unwrap();
        assert!(f.settings.is_visible());
        assert!(!f.home.is_visible());

        let back = f.coordinator.return_back().unwrap();
        assert_eq!(back.result().active, Some(WidgetKind::new("home")));
        back.wait().await.unwrap();
        assert!(f.home.is_visible());
        assert!(!f.settings.is_visible());
        assert_eq!(f.coordinator.navigator().version(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_request_fails_at_build_time() {
        let f = fixture();
        let err = f
            .coordinator
            .create_navigation_request(as_ref(&f.home))
            .with_length(Duration::from_millis(50))
            .unwrap()
            .with_transition(VisibilityTransitionParams::none())
            .unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(f.coordinator.navigator().version(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_request() {
        let f = fixture();
        f.coordinator.navigate(as_ref(&f.home)).unwrap();

        let request = f.coordinator.create_navigation_request(as_ref(&f.settings));
        assert!(request.is_valid());
        f.coordinator
            .navigator()
            .navigate(&as_ref(&f.about), true)
            .unwrap();
        assert!(!request.is_valid());
        assert!(request.execute().unwrap_err().is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_navigations_commit_immediately() {
        let f = fixture();
        f.coordinator.navigate(as_ref(&f.home)).unwrap();

        let to_settings = f.coordinator.navigate(as_ref(&f.settings)).unwrap();
        let to_about = f.coordinator.navigate(as_ref(&f.about)).unwrap();
        assert_eq!(f.coordinator.navigator().version(), 3);
        assert_eq!(f.coordinator.transitions().pending_count(), 1);
        assert!(!f.about.is_visible());

        to_settings.wait().await.unwrap();
        to_about.wait().await.unwrap();
        assert!(f.about.is_visible());
        assert!(!f.settings.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_navigation_keeps_state_consistent() {
        let f = fixture();
        f.coordinator.navigate(as_ref(&f.home)).unwrap();

        let token = CancellationToken::new();
        let response = f
            .coordinator
            .create_navigation_request(as_ref(&f.settings))
            .with_easing(Easing::EaseOutQuad)
            .unwrap()
            .with_cancellation(token.clone())
            .execute()
            .unwrap();
        token.cancel();

        assert!(response.wait().await.unwrap_err().is_cancelled());
        assert_eq!(
            f.coordinator.navigator().active_kind(),
            Some(WidgetKind::new("settings"))
        );
        assert!(f.settings.is_visible());
        assert!(!f.home.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_hides_active() {
        let f = fixture();
        assert!(!f.coordinator.exit().unwrap().result().success);

        f.coordinator.navigate(as_ref(&f.home)).unwrap();
        f.coordinator.navigate(as_ref(&f.settings)).unwrap();
        let exit = f.coordinator.exit().unwrap();
        assert!(exit.result().success);
        assert_eq!(f.coordinator.navigator().history_count(), 0);

        let outcome = exit.completion().is_finished();
        assert!(!outcome);
        let (_, completion) = exit.into_parts();
        assert_eq!(completion.wait().await.unwrap(), TransitionOutcome::Completed);
        assert!(!f.settings.is_visible());
        assert!(!f.home.is_visible());
    }

    #[tokio::test]
    async fn test_history_groups() {
        let f = fixture();
        let mut rx = f.coordinator.subscribe_history();
        f.coordinator.navigate(as_ref(&f.home)).unwrap();

        f.coordinator.push_history_group();
        f.coordinator
            .create_navigation_request(as_ref(&f.about))
            .with_length(Duration::ZERO)
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(f.coordinator.navigator().history_count(), 1);

        assert!(f.coordinator.pop_history_group());
        assert!(!f.coordinator.pop_history_group());
        assert_eq!(f.coordinator.navigator().history_count(), 0);

        assert_eq!(
            rx.recv().await.unwrap(),
            HistoryGroupEvent::Pushed { group_count: 2 }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            HistoryGroupEvent::Popped { group_count: 1 }
        );
    }
}
