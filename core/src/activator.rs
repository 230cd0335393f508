//! Tab-style exclusive activation without history

use crate::error::{NavigationError, Result};
use crate::navigator::Prepared;
use crate::registry::{Registry, RegistryEvent, RegistryListener};
use crate::widget::{same_widget, WidgetKind, WidgetRef};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Outcome of an activation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationResult {
    pub previous: Option<WidgetKind>,
    pub active: Option<WidgetKind>,
    pub success: bool,
    /// Registration position of the active widget
    pub index: Option<usize>,
}

/// Validated activation waiting to be applied
pub struct ActivateStep {
    source: Option<WidgetRef>,
    target: WidgetRef,
    version: u64,
}

impl ActivateStep {
    pub fn source(&self) -> Option<&WidgetRef> {
        self.source.as_ref()
    }

    pub fn target(&self) -> &WidgetRef {
        &self.target
    }
}

#[derive(Default)]
struct ActivatorState {
    active: Option<WidgetRef>,
    cached_index: Option<usize>,
    /// Registry revision the cached index was computed at
    cached_revision: u64,
    version: u64,
}

/// Keeps exactly one registered widget active at a time
pub struct Activator {
    registry: Arc<Registry>,
    state: Mutex<ActivatorState>,
    events: broadcast::Sender<ActivationResult>,
}

impl Activator {
    /// Create an activator and subscribe it to registry changes
    pub fn new(registry: Arc<Registry>) -> Arc<Self> {
        Self::with_event_capacity(registry, 64)
    }

    pub fn with_event_capacity(registry: Arc<Registry>, capacity: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(capacity.max(1));
        let activator = Arc::new(Self {
            registry: Arc::clone(&registry),
            state: Mutex::new(ActivatorState::default()),
            events,
        });
        let weak: Weak<Activator> = Arc::downgrade(&activator);
        let listener: Weak<dyn RegistryListener> = weak;
        registry.add_listener(listener);
        activator
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivationResult> {
        self.events.subscribe()
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub fn active_kind(&self) -> Option<WidgetKind> {
        self.state.lock().active.as_ref().map(|w| w.kind())
    }

    pub fn active_widget(&self) -> Option<WidgetRef> {
        self.state.lock().active.clone()
    }

    /// Registration position of the active widget
    ///
    /// Cached; recomputed only when the registry changed since the last lookup.
    pub fn active_index(&self) -> Option<usize> {
        let revision = self.registry.revision();
        let mut state = self.state.lock();
        if state.cached_revision != revision {
            state.cached_index = state
                .active
                .as_ref()
                .and_then(|active| self.registry.index_of(active.kind()));
            state.cached_revision = revision;
            debug!(index = ?state.cached_index, revision, "Active index revalidated");
        }
        state.cached_index
    }

    /// Make `target` the active widget
    pub fn activate(&self, target: &WidgetRef) -> Result<ActivationResult> {
        match self.prepare_activate(target)? {
            Prepared::Ready(step) => Ok(self.apply_activate(step)),
            Prepared::Refused(result) => Ok(result),
        }
    }

    /// Check that `target` can be activated right now
    pub fn prepare_activate(
        &self,
        target: &WidgetRef,
    ) -> Result<Prepared<ActivateStep, ActivationResult>> {
        let (source, version) = {
            let state = self.state.lock();
            (state.active.clone(), state.version)
        };
        if source.as_ref().map(|w| w.kind()) == Some(target.kind()) {
            return Ok(Prepared::Refused(self.refuse("target is already active")));
        }

        let resolved = match self.registry.resolve(target) {
            Ok(resolved) => resolved,
            Err(NavigationError::NotRegistered { .. }) => {
                return Ok(Prepared::Refused(self.refuse("target is not registered")));
            }
            Err(err) => {
                error!(%err, "Activation rejected");
                return Err(err.into());
            }
        };
        if !resolved.is_initialized() {
            return Ok(Prepared::Refused(self.refuse("target is not initialized")));
        }

        Ok(Prepared::Ready(ActivateStep {
            source,
            target: resolved,
            version,
        }))
    }

    /// Commit a prepared activation
    ///
    /// A step prepared before another activation landed is refused.
    pub fn apply_activate(&self, step: ActivateStep) -> ActivationResult {
        let revision = self.registry.revision();
        let index = self.registry.index_of(step.target.kind());

        let mut state = self.state.lock();
        if state.version != step.version {
            drop(state);
            return self.refuse("activation was overtaken");
        }
        let previous = state.active.replace(step.target).map(|w| w.kind());
        state.cached_index = index;
        state.cached_revision = revision;
        state.version += 1;
        let active = state.active.as_ref().map(|w| w.kind());
        let version = state.version;
        drop(state);

        info!(
            previous = ?previous.map(|k| k.as_str()),
            active = ?active.map(|k| k.as_str()),
            index = ?index,
            version,
            "Activated"
        );
        self.emit(ActivationResult {
            previous,
            active,
            success: true,
            index,
        })
    }

    fn refuse(&self, reason: &str) -> ActivationResult {
        let active = self.active_kind();
        warn!(reason, active = ?active.map(|k| k.as_str()), "Activation refused");
        self.emit(ActivationResult {
            previous: active,
            active,
            success: false,
            index: self.active_index(),
        })
    }

    fn emit(&self, result: ActivationResult) -> ActivationResult {
        let _ = self.events.send(result.clone());
        result
    }
}

impl RegistryListener for Activator {
    fn on_registry_event(&self, event: &RegistryEvent) {
        let RegistryEvent::Unregistered { kind, .. } = *event else {
            return;
        };

        let mut state = self.state.lock();
        let removed = match &state.active {
            Some(active) if active.kind() == kind => {
                // The same kind may have been re-registered already
                self.registry
                    .get(kind)
                    .map_or(true, |current| !same_widget(&current, active))
            }
            _ => false,
        };
        if !removed {
            return;
        }

        state.active = None;
        state.cached_index = None;
        state.cached_revision = self.registry.revision();
        state.version += 1;
        let version = state.version;
        drop(state);

        info!(%kind, version, "Active widget unregistered, activator cleared");
        self.emit(ActivationResult {
            previous: Some(kind),
            active: None,
            success: true,
            index: None,
        });
    }
}

impl std::fmt::Debug for Activator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Activator")
            .field("active", &state.active.as_ref().map(|w| w.kind()))
            .field("version", &state.version)
            .finish()
    }
}
