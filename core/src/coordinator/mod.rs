//! Glue between state machines, the transition manager and requests

mod activation;
mod navigation;

pub use activation::ActivationCoordinator;
pub use navigation::{HistoryGroupEvent, NavigationCoordinator};
