//! Error types and handling for panelnav core
//!
//! Three categories of failure exist and are kept apart:
//!
//! - expected outcomes (already active, locked, empty history) are *not*
//!   errors at all; they come back as `Ok` results with `success == false`;
//! - caller contract violations are `Err` values that indicate a bug in the
//!   host ([`Error::is_contract_violation`]);
//! - staleness and cancellation are distinct `Err` values a caller is
//!   expected to branch on ([`Error::is_stale`], [`Error::is_cancelled`]).

use crate::history::{EntryId, EntryStatus};
use crate::widget::WidgetKind;
use thiserror::Error;

/// Result type alias for panelnav operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for panelnav core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// History stack errors
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Navigator and registry errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Transition queue errors
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Request building and execution errors
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// History stack errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History entry {id} not found")]
    NotFound { id: EntryId },

    #[error("History entry {id} is already {status}")]
    InvalidState { id: EntryId, status: EntryStatus },

    #[error("History is empty")]
    Empty,
}

/// Navigator and registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Widget kind '{kind}' is not registered")]
    NotRegistered { kind: WidgetKind },

    #[error("Widget '{kind}' is not initialized")]
    NotInitialized { kind: WidgetKind },

    #[error("Widget '{kind}' does not match the instance registered for its kind")]
    AmbiguousRegistration { kind: WidgetKind },

    #[error("Widget kind '{kind}' is already registered")]
    DuplicateRegistration { kind: WidgetKind },
}

/// Transition queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Transition chain broken: expected source '{expected}', got '{actual}'")]
    ChainContinuity { expected: String, actual: String },

    #[error("Animation '{kind}' is unavailable for widget '{widget}'")]
    AnimationUnavailable { kind: String, widget: WidgetKind },

    #[error("Transition cancelled")]
    Cancelled,
}

/// Request building and execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Conflicting request configuration: '{field}' cannot be combined with an explicit transition")]
    ConflictingConfiguration { field: &'static str },

    #[error("Request is stale: captured version {captured}, navigator is at {current}")]
    Stale { captured: u64, current: u64 },
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

impl Error {
    /// Whether this error is the cancelled outcome of a transition
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Transition(TransitionError::Cancelled))
    }

    /// Whether this error reports a request built against an outdated version
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Request(RequestError::Stale { .. }))
    }

    /// Whether this error indicates a bug in the calling code
    pub fn is_contract_violation(&self) -> bool {
        match self {
            Error::History(_) | Error::Navigation(_) => true,
            Error::Transition(err) => !matches!(err, TransitionError::Cancelled),
            Error::Request(err) => matches!(err, RequestError::ConflictingConfiguration { .. }),
            Error::Config(_) => false,
        }
    }
}
