//! Animated visibility transitions between widgets

mod manager;
pub(crate) mod playback;

pub use manager::{Enqueued, TransitionId, TransitionManager, TransitionOutcome, TransitionTicket};
