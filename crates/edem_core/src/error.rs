use crate::Step;
use thiserror::Error;

/// Internal consistency failures of the flow machinery.
///
/// These never come from bad user input (that is recovered by re-prompting);
/// they signal a caller asking for a move the flow does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition {from:?} -> {to:?} is not in the transition table")]
    NotPermitted { from: Step, to: Step },

    #[error("step {0:?} is not handled by the onboarding machine")]
    NotOnboarding(Step),

    #[error("onboarding data expects {expected:?} but flow is at {step:?}")]
    OutOfOrder { step: Step, expected: Option<Step> },
}
