//! # panelnav Core
//!
//! Navigation and transition engine for stacked, mutually exclusive panels.
//!
//! This library tracks which widget is active, keeps a grouped history that
//! can be unwound with the inverse of each recorded transition, and
//! serializes animated handoffs between widgets so rapid successive requests
//! never interleave.

// Core modules
pub mod activator;
pub mod animation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod navigator;
pub mod params;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod transition;
pub mod widget;

// Re-export commonly used types
pub use activator::{ActivationResult, Activator};
pub use animation::{Animation, AnimationFrame, AnimationKind, AnimationRenderer, Easing, NullRenderer};
pub use config::NavigationConfig;
pub use coordinator::{ActivationCoordinator, HistoryGroupEvent, NavigationCoordinator};
pub use error::{Error, Result};
pub use history::{EntryId, EntryStatus, HistoryEntry, HistoryStack};
pub use navigator::{HistoryEvent, NavigationResult, Navigator, SharedHistory};
pub use params::{SortPriority, TargetKind, VisibilityTransitionParams};
pub use registry::{Registry, RegistryEvent, RegistryListener};
pub use request::{
    ActivateRequest, ActivationResponse, Completion, ExitRequest, NavigationRequest,
    NavigationResponse, Response, ReturnRequest,
};
pub use scheduler::{FrameScheduler, Scheduler, TimeMode, YieldScheduler};
pub use transition::{Enqueued, TransitionManager, TransitionOutcome, TransitionTicket};
pub use widget::{Visibility, Widget, WidgetKind, WidgetRef};

/// Current version of the panelnav-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
