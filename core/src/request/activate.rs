use super::{stale, transition_builders, ActivationResponse, TransitionOverrides};
use crate::coordinator::ActivationCoordinator;
use crate::error::Result;
use crate::widget::WidgetRef;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Request to make a widget the activator's active one
#[derive(Clone)]
#[must_use = "requests do nothing until executed"]
pub struct ActivateRequest {
    pub(crate) coordinator: Arc<ActivationCoordinator>,
    pub(crate) target: WidgetRef,
    pub(crate) version: u64,
    pub(crate) overrides: TransitionOverrides,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl ActivateRequest {
    pub(crate) fn new(coordinator: Arc<ActivationCoordinator>, target: WidgetRef) -> Self {
        let version = coordinator.activator().version();
        Self {
            coordinator,
            target,
            version,
            overrides: TransitionOverrides::default(),
            cancellation: None,
        }
    }

    pub fn target(&self) -> &WidgetRef {
        &self.target
    }

    /// Activator version this request was built against
    pub fn captured_version(&self) -> u64 {
        self.version
    }

    pub fn is_valid(&self) -> bool {
        self.coordinator.activator().version() == self.version
    }

    pub fn execute(self) -> Result<ActivationResponse> {
        let current = self.coordinator.activator().version();
        if current != self.version {
            return Err(stale(self.version, current));
        }
        let coordinator = Arc::clone(&self.coordinator);
        coordinator.process_activation(self)
    }
}

transition_builders!(ActivateRequest);

impl std::fmt::Debug for ActivateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivateRequest")
            .field("target", &self.target.kind())
            .field("version", &self.version)
            .field("overrides", &self.overrides)
            .finish()
    }
}
