//! Stage policy: turns one turn's signals into the next dialogue stage.
//!
//! Rules are evaluated in order, first match wins:
//! 1. defensive (>= 2) → stay in shadow
//! 2. acknowledged while in shadow → truth
//! 3. ready (>= 2) → integration
//! 4. two or more turns stuck in shadow → truth
//!
//! Rule 4 reads the streak alone. The streak is only ever non-zero while the
//! session sits in shadow (`SessionState::apply_turn` zeroes it elsewhere).
//! 5. otherwise stay

use crate::signals::SignalDetection;
use crate::Stage;

pub const DEFENSIVE_THRESHOLD: u8 = 2;
pub const READINESS_THRESHOLD: u8 = 2;
pub const SHADOW_STREAK_LIMIT: u8 = 2;

pub fn decide(signals: &SignalDetection, current: Stage, shadow_streak: u8) -> Stage {
    let next = if signals.defensiveness >= DEFENSIVE_THRESHOLD {
        Stage::Shadow
    } else if signals.acknowledged() && current == Stage::Shadow {
        Stage::Truth
    } else if signals.readiness >= READINESS_THRESHOLD {
        Stage::Integration
    } else if shadow_streak >= SHADOW_STREAK_LIMIT {
        Stage::Truth
    } else {
        current
    };

    if next != current {
        tracing::debug!(from = %current, to = %next, shadow_streak, "stage transition");
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(d: u8, a: u8, r: u8) -> SignalDetection {
        SignalDetection {
            defensiveness: d,
            acknowledgement: a,
            readiness: r,
            denial: false,
        }
    }

    /// Reference model of the rule list, written independently of `decide`.
    fn expected(d: u8, a: u8, r: u8, stage: Stage, streak: u8) -> Stage {
        if d >= 2 {
            return Stage::Shadow;
        }
        if a > 0 && stage == Stage::Shadow {
            return Stage::Truth;
        }
        if r >= 2 {
            return Stage::Integration;
        }
        if streak >= 2 {
            return Stage::Truth;
        }
        stage
    }

    #[test]
    fn test_full_cross_product() {
        let mut cases = 0;
        for d in 0..=3u8 {
            for a in 0..=1u8 {
                for r in 0..=3u8 {
                    for stage in Stage::ALL {
                        for streak in 0..=3u8 {
                            let got = decide(&signals(d, a, r), stage, streak);
                            assert_eq!(
                                got,
                                expected(d, a, r, stage, streak),
                                "d={} a={} r={} stage={} streak={}",
                                d,
                                a,
                                r,
                                stage,
                                streak
                            );
                            cases += 1;
                        }
                    }
                }
            }
        }
        assert_eq!(cases, 4 * 2 * 4 * 3 * 4);
    }

    #[test]
    fn test_defensiveness_overrides_readiness_and_acknowledgement() {
        for stage in Stage::ALL {
            assert_eq!(decide(&signals(2, 3, 3), stage, 3), Stage::Shadow);
        }
    }

    #[test]
    fn test_streak_forces_truth() {
        assert_eq!(decide(&signals(1, 0, 0), Stage::Shadow, 2), Stage::Truth);
        assert_eq!(decide(&signals(0, 0, 0), Stage::Shadow, 1), Stage::Shadow);
        assert_eq!(decide(&signals(0, 0, 0), Stage::Integration, 3), Stage::Truth);
        // Readiness is checked first.
        assert_eq!(decide(&signals(0, 0, 2), Stage::Truth, 3), Stage::Integration);
    }

    #[test]
    fn test_streak_is_zero_outside_shadow() {
        let mut state = crate::SessionState::default();
        state.apply_turn(&signals(0, 0, 0), Stage::Shadow);
        state.apply_turn(&signals(0, 0, 0), Stage::Shadow);
        assert_eq!(state.shadow_streak, 2);
        let next = decide(&signals(0, 1, 0), state.stage, state.shadow_streak);
        state.apply_turn(&signals(0, 1, 0), next);
        assert_eq!(state.stage, Stage::Truth);
        assert_eq!(state.shadow_streak, 0);
        // A calm turn in truth stays there.
        assert_eq!(decide(&signals(0, 0, 0), state.stage, state.shadow_streak), Stage::Truth);
    }

    #[test]
    fn test_acknowledgement_outside_shadow_does_not_move() {
        assert_eq!(decide(&signals(0, 2, 0), Stage::Truth, 0), Stage::Truth);
        assert_eq!(decide(&signals(0, 2, 2), Stage::Truth, 0), Stage::Integration);
    }

    #[test]
    fn test_denial_is_not_acknowledgement() {
        let mut s = signals(0, 1, 0);
        s.denial = true;
        assert_eq!(decide(&s, Stage::Shadow, 0), Stage::Shadow);
    }
}
