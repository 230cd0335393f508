//! Widget registry for kind-based lookup

use crate::error::NavigationError;
use crate::widget::{same_widget, WidgetKind, WidgetRef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Change notification emitted by a [`Registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered { kind: WidgetKind, index: usize },
    Unregistered { kind: WidgetKind, index: usize },
}

/// Synchronous observer of registry changes
///
/// Called after the registry lock is released, so listeners may query the
/// registry again.
pub trait RegistryListener: Send + Sync {
    fn on_registry_event(&self, event: &RegistryEvent);
}

#[derive(Default)]
struct RegistryInner {
    widgets: Vec<WidgetRef>,
    index: HashMap<WidgetKind, usize>,
}

impl RegistryInner {
    fn reindex(&mut self) {
        self.index = self
            .widgets
            .iter()
            .enumerate()
            .map(|(i, widget)| (widget.kind(), i))
            .collect();
    }
}

/// Registry mapping widget kinds to their single instance
pub struct Registry {
    inner: RwLock<RegistryInner>,
    revision: AtomicU64,
    listeners: RwLock<Vec<Weak<dyn RegistryListener>>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::with_event_capacity(64)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: RwLock::new(RegistryInner::default()),
            revision: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Register a widget under its kind
    pub fn register(&self, widget: WidgetRef) -> Result<usize, NavigationError> {
        let kind = widget.kind();
        let index = {
            let mut inner = self.inner.write();
            if inner.index.contains_key(&kind) {
                return Err(NavigationError::DuplicateRegistration { kind });
            }
            inner.widgets.push(widget);
            let index = inner.widgets.len() - 1;
            inner.index.insert(kind, index);
            index
        };
        self.revision.fetch_add(1, Ordering::SeqCst);

        info!(%kind, index, "Widget registered");
        self.notify(RegistryEvent::Registered { kind, index });
        Ok(index)
    }

    /// Remove the widget registered under `kind`
    pub fn unregister(&self, kind: WidgetKind) -> Option<WidgetRef> {
        let (widget, index) = {
            let mut inner = self.inner.write();
            let index = inner.index.get(&kind).copied()?;
            let widget = inner.widgets.remove(index);
            inner.reindex();
            (widget, index)
        };
        self.revision.fetch_add(1, Ordering::SeqCst);

        info!(%kind, index, "Widget unregistered");
        self.notify(RegistryEvent::Unregistered { kind, index });
        Some(widget)
    }

    /// Resolve a kind to its widget
    pub fn get(&self, kind: WidgetKind) -> Option<WidgetRef> {
        let inner = self.inner.read();
        inner
            .index
            .get(&kind)
            .and_then(|&i| inner.widgets.get(i))
            .cloned()
    }

    /// Resolve `widget` by its kind and check it is the registered instance
    pub fn resolve(&self, widget: &WidgetRef) -> Result<WidgetRef, NavigationError> {
        let kind = widget.kind();
        let registered = self
            .get(kind)
            .ok_or(NavigationError::NotRegistered { kind })?;
        if !same_widget(&registered, widget) {
            return Err(NavigationError::AmbiguousRegistration { kind });
        }
        Ok(registered)
    }

    /// Position of `kind` in registration order
    pub fn index_of(&self, kind: WidgetKind) -> Option<usize> {
        self.inner.read().index.get(&kind).copied()
    }

    /// Widget at a registration position
    pub fn at(&self, index: usize) -> Option<WidgetRef> {
        self.inner.read().widgets.get(index).cloned()
    }

    pub fn contains(&self, kind: WidgetKind) -> bool {
        self.inner.read().index.contains_key(&kind)
    }

    /// Snapshot of all registered widgets in registration order
    ///
    /// The snapshot stays valid while the registry keeps changing.
    pub fn widgets(&self) -> Vec<WidgetRef> {
        self.inner.read().widgets.clone()
    }

    pub fn kinds(&self) -> Vec<WidgetKind> {
        self.inner.read().widgets.iter().map(|w| w.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().widgets.is_empty()
    }

    /// Counter bumped on every registration change
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Subscribe to registry changes
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Attach a synchronous listener; dropped listeners are pruned lazily
    pub fn add_listener(&self, listener: Weak<dyn RegistryListener>) {
        self.listeners.write().push(listener);
    }

    fn notify(&self, event: RegistryEvent) {
        let listeners: Vec<Arc<dyn RegistryListener>> = {
            let mut listeners = self.listeners.write();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_registry_event(&event);
        }

        // No receivers is fine
        let _ = self.events.send(event);
        debug!(?event, "Registry event dispatched");
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .field("revision", &self.revision())
            .finish()
    }
}
