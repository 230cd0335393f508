//! Responses returned by executed requests

use crate::error::{Result, TransitionError};
use crate::transition::{Enqueued, TransitionOutcome};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Awaitable end of the transition a request triggered
///
/// Resolves immediately when nothing was animated, so callers can always
/// await it the same way.
#[derive(Debug)]
pub struct Completion {
    handle: Option<JoinHandle<Result<TransitionOutcome>>>,
}

impl Completion {
    /// Completion with nothing to wait for
    pub fn ready() -> Self {
        Self { handle: None }
    }

    /// Drive an accepted transition on the current runtime
    pub(crate) fn spawn(enqueued: Enqueued) -> Self {
        let ticket = match enqueued {
            Enqueued::Settled => return Self::ready(),
            Enqueued::Queued(ticket) => ticket,
        };
        match Handle::try_current() {
            Ok(runtime) => Self {
                handle: Some(runtime.spawn(ticket.run())),
            },
            Err(_) => {
                // Dropping the ticket settles the transition in place
                warn!(transition = ticket.id(), "No async runtime, settling transition instantly");
                Self::ready()
            }
        }
    }

    /// Whether the transition already resolved
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the transition; cancellation comes back as an error
    pub async fn wait(self) -> Result<TransitionOutcome> {
        let Some(handle) = self.handle else {
            return Ok(TransitionOutcome::Completed);
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "Transition task did not finish");
                Err(TransitionError::Cancelled.into())
            }
        }
    }
}

/// Structured result of a request plus the completion of its transition
#[derive(Debug)]
pub struct Response<R> {
    result: R,
    completion: Completion,
}

impl<R> Response<R> {
    pub(crate) fn new(result: R, completion: Completion) -> Self {
        Self { result, completion }
    }

    /// Response for a request that triggered no transition
    pub(crate) fn ready(result: R) -> Self {
        Self::new(result, Completion::ready())
    }

    pub fn result(&self) -> &R {
        &self.result
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    pub fn into_parts(self) -> (R, Completion) {
        (self.result, self.completion)
    }

    /// Wait for the transition and hand back the result
    pub async fn wait(self) -> Result<R> {
        self.completion.wait().await?;
        Ok(self.result)
    }
}
