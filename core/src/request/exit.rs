use super::{stale, transition_builders, NavigationResponse, TransitionOverrides};
use crate::coordinator::NavigationCoordinator;
use crate::error::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Request to hide the active widget and clear the navigator
#[derive(Clone)]
#[must_use = "requests do nothing until executed"]
pub struct ExitRequest {
    pub(crate) coordinator: Arc<NavigationCoordinator>,
    pub(crate) version: u64,
    pub(crate) overrides: TransitionOverrides,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl ExitRequest {
    pub(crate) fn new(coordinator: Arc<NavigationCoordinator>) -> Self {
        let version = coordinator.navigator().version();
        Self {
            coordinator,
            version,
            overrides: TransitionOverrides::default(),
            cancellation: None,
        }
    }

    pub fn captured_version(&self) -> u64 {
        self.version
    }

    pub fn is_valid(&self) -> bool {
        self.coordinator.navigator().version() == self.version
    }

    pub fn execute(self) -> Result<NavigationResponse> {
        let current = self.coordinator.navigator().version();
        if current != self.version {
            return Err(stale(self.version, current));
        }
        let coordinator = Arc::clone(&self.coordinator);
        coordinator.process_exit(self)
    }
}

transition_builders!(ExitRequest);

impl std::fmt::Debug for ExitRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitRequest")
            .field("version", &self.version)
            .field("overrides", &self.overrides)
            .finish()
    }
}
