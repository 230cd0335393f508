//! Immutable request builders and their responses
//!
//! Requests are created by a coordinator, customized with chained `with_*`
//! calls and consumed by `execute`. Each captures the version of the state
//! machine it was built against; executing it after that version moved on
//! fails with a stale error.

mod activate;
mod back;
mod exit;
mod navigation;
mod overrides;
mod response;

pub use activate::ActivateRequest;
pub use back::ReturnRequest;
pub use exit::ExitRequest;
pub use navigation::NavigationRequest;
pub use response::{Completion, Response};

pub(crate) use overrides::TransitionOverrides;

use crate::activator::ActivationResult;
use crate::navigator::NavigationResult;

pub type NavigationResponse = Response<NavigationResult>;
pub type ActivationResponse = Response<ActivationResult>;

/// Builder methods shared by every request carrying transition overrides
macro_rules! transition_builders {
    ($request:ty) => {
        impl $request {
            /// Use exactly these transition parameters
            ///
            /// Fails if an animation, length or easing was already set.
            pub fn with_transition(
                mut self,
                params: $crate::params::VisibilityTransitionParams,
            ) -> $crate::error::Result<Self> {
                self.overrides.set_transition(params)?;
                Ok(self)
            }

            /// Play `kind` instead of the widget's default animation
            pub fn with_animation(
                mut self,
                kind: $crate::animation::AnimationKind,
            ) -> $crate::error::Result<Self> {
                self.overrides.set_animation(kind)?;
                Ok(self)
            }

            /// Override the transition length; zero makes it instant
            pub fn with_length(mut self, length: std::time::Duration) -> $crate::error::Result<Self> {
                self.overrides.set_length(length)?;
                Ok(self)
            }

            pub fn with_easing(
                mut self,
                easing: $crate::animation::Easing,
            ) -> $crate::error::Result<Self> {
                self.overrides.set_easing(easing)?;
                Ok(self)
            }

            /// Tie the transition to a caller-owned cancellation token
            pub fn with_cancellation(mut self, token: tokio_util::sync::CancellationToken) -> Self {
                self.cancellation = Some(token);
                self
            }
        }
    };
}

pub(crate) use transition_builders;

/// Stale error for a request captured at `captured`
pub(crate) fn stale(captured: u64, current: u64) -> crate::error::Error {
    tracing::warn!(captured, current, "Stale request rejected");
    crate::error::RequestError::Stale { captured, current }.into()
}
