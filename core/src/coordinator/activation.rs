use crate::activator::Activator;
use crate::animation::AnimationRenderer;
use crate::config::NavigationConfig;
use crate::error::Result;
use crate::navigator::Prepared;
use crate::registry::Registry;
use crate::request::{ActivateRequest, ActivationResponse, Completion, Response};
use crate::transition::TransitionManager;
use crate::widget::WidgetRef;
use std::sync::Arc;
use tracing::debug;

/// Binds an activator to a transition manager
pub struct ActivationCoordinator {
    activator: Arc<Activator>,
    transitions: Arc<TransitionManager>,
    config: NavigationConfig,
}

impl ActivationCoordinator {
    pub fn new(
        activator: Arc<Activator>,
        transitions: Arc<TransitionManager>,
        config: NavigationConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            activator,
            transitions,
            config,
        })
    }

    pub fn from_config(
        registry: Arc<Registry>,
        renderer: Arc<dyn AnimationRenderer>,
        config: NavigationConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let activator = Activator::with_event_capacity(registry, config.event_capacity);
        let transitions = TransitionManager::from_config(&config, renderer);
        Ok(Self::new(activator, Arc::new(transitions), config))
    }

    pub fn activator(&self) -> &Arc<Activator> {
        &self.activator
    }

    pub fn transitions(&self) -> &Arc<TransitionManager> {
        &self.transitions
    }

    pub fn create_activate_request(self: &Arc<Self>, target: WidgetRef) -> ActivateRequest {
        ActivateRequest::new(Arc::clone(self), target)
    }

    /// Activate with default settings
    pub fn activate(self: &Arc<Self>, target: WidgetRef) -> Result<ActivationResponse> {
        self.create_activate_request(target).execute()
    }

    pub(crate) fn process_activation(&self, request: ActivateRequest) -> Result<ActivationResponse> {
        let step = match self.activator.prepare_activate(&request.target)? {
            Prepared::Ready(step) => step,
            Prepared::Refused(result) => return Ok(Response::ready(result)),
        };

        // An active widget unregistered mid-transition still ends the chain
        let source = step
            .source()
            .cloned()
            .or_else(|| self.transitions.expected_source().flatten());
        let params = request
            .overrides
            .resolve(source.as_ref(), Some(step.target()), &self.config);
        debug!(widget = %step.target().kind(), %params, "Activation transition resolved");

        let enqueued = self.transitions.enqueue(
            params,
            source,
            Some(step.target().clone()),
            request.cancellation,
        )?;
        let result = self.activator.apply_activate(step);
        Ok(Response::new(result, Completion::spawn(enqueued)))
    }
}

impl std::fmt::Debug for ActivationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationCoordinator")
            .field("activator", &self.activator)
            .field("transitions", &self.transitions)
            .finish()
    }
}
