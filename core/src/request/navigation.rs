use super::{stale, transition_builders, NavigationResponse, TransitionOverrides};
use crate::coordinator::NavigationCoordinator;
use crate::error::Result;
use crate::widget::WidgetRef;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Request to make a widget the navigator's active one
#[derive(Clone)]
#[must_use = "requests do nothing until executed"]
pub struct NavigationRequest {
    pub(crate) coordinator: Arc<NavigationCoordinator>,
    pub(crate) target: WidgetRef,
    pub(crate) version: u64,
    pub(crate) overrides: TransitionOverrides,
    pub(crate) add_to_history: Option<bool>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl NavigationRequest {
    pub(crate) fn new(coordinator: Arc<NavigationCoordinator>, target: WidgetRef) -> Self {
        let version = coordinator.navigator().version();
        Self {
            coordinator,
            target,
            version,
            overrides: TransitionOverrides::default(),
            add_to_history: None,
            cancellation: None,
        }
    }

    pub fn target(&self) -> &WidgetRef {
        &self.target
    }

    /// Navigator version this request was built against
    pub fn captured_version(&self) -> u64 {
        self.version
    }

    /// Whether the previous widget is recorded for a later return; defaults to true
    pub fn with_add_to_history(mut self, add_to_history: bool) -> Self {
        self.add_to_history = Some(add_to_history);
        self
    }

    /// False once any other navigation happened since this request was built
    pub fn is_valid(&self) -> bool {
        self.coordinator.navigator().version() == self.version
    }

    pub fn execute(self) -> Result<NavigationResponse> {
        let current = self.coordinator.navigator().version();
        if current != self.version {
            return Err(stale(self.version, current));
        }
        let coordinator = Arc::clone(&self.coordinator);
        coordinator.process_navigation(self)
    }
}

transition_builders!(NavigationRequest);

impl std::fmt::Debug for NavigationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationRequest")
            .field("target", &self.target.kind())
            .field("version", &self.version)
            .field("overrides", &self.overrides)
            .field("add_to_history", &self.add_to_history)
            .finish()
    }
}
