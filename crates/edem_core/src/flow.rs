//! Session-level step moves: every `(stored, next)` pair a committed turn may write.
//!
//! The intake table in `onboarding` names the fine-grained FSM moves, including the
//! transient `truth_cut`. This table is what lands in storage, so `truth_cut` is
//! collapsed into its route. Staying on the same step (a re-prompt) is always allowed.

use crate::error::TransitionError;
use crate::onboarding;
use crate::Step;

pub const SESSION_TRANSITIONS: &[(Step, Step)] = &[
    // Intake
    (Step::Mask, Step::Trigger),
    (Step::Trigger, Step::Polarity),
    (Step::Polarity, Step::Body),
    (Step::Body, Step::OneWord),
    (Step::OneWord, Step::CostAgree),
    (Step::CostAgree, Step::Close),
    (Step::CostAgree, Step::Paywall),
    (Step::CostAgree, Step::Archetype),
    // Decline, then a new intake
    (Step::Close, Step::Mask),
    // Gates
    (Step::Paywall, Step::Shadow),
    (Step::Paywall, Step::Truth),
    (Step::Archetype, Step::Shadow),
    // Stage dialogue
    (Step::Shadow, Step::Truth),
    (Step::Shadow, Step::Integration),
    (Step::Shadow, Step::Paywall),
    (Step::Truth, Step::Shadow),
    (Step::Truth, Step::Integration),
    (Step::Truth, Step::Paywall),
    (Step::Integration, Step::Shadow),
    (Step::Integration, Step::Truth),
    (Step::Integration, Step::Paywall),
];

pub fn is_session_move(from: Step, to: Step) -> bool {
    (from == to && !from.is_reply_only()) || SESSION_TRANSITIONS.contains(&(from, to))
}

pub fn ensure_session_move(from: Step, to: Step) -> Result<(), TransitionError> {
    if is_session_move(from, to) {
        Ok(())
    } else {
        tracing::error!(%from, %to, "rejected session move outside the table");
        Err(TransitionError::NotPermitted { from, to })
    }
}

/// Intake moves with `truth_cut` folded into the step that precedes it.
pub fn persisted_intake_moves() -> Vec<(Step, Step)> {
    onboarding::TRANSITIONS
        .iter()
        .filter(|(from, _)| *from != Step::TruthCut)
        .flat_map(|&(from, to)| {
            if to == Step::TruthCut {
                onboarding::TRANSITIONS
                    .iter()
                    .filter(|(cut, _)| *cut == Step::TruthCut)
                    .map(|&(_, route)| (from, route))
                    .collect::<Vec<_>>()
            } else {
                vec![(from, to)]
            }
        })
        .collect()
}
