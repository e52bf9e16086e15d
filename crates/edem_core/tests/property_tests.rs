//! Property-based tests for edem_core.
//!
//! Uses proptest to check the policy and classifier invariants over arbitrary
//! inputs rather than hand-picked examples.

use edem_core::onboarding::synthesize_truth_cut;
use edem_core::safety::{KeywordSafetyClassifier, RiskLevel, SafetyClassifier};
use edem_core::config::SafetyConfig;
use edem_core::session::SCORE_MAX;
use edem_core::{
    decide, KeywordSignalDetector, Locale, OnboardingData, Polarity, SessionState,
    SignalDetection, SignalDetector, Stage, Voice,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_stage() -> impl Strategy<Value = Stage> {
    prop_oneof![Just(Stage::Shadow), Just(Stage::Truth), Just(Stage::Integration)]
}

fn arb_voice() -> impl Strategy<Value = Voice> {
    prop_oneof![Just(Voice::Soft), Just(Voice::Hard), Just(Voice::Therapist)]
}

fn arb_polarity() -> impl Strategy<Value = Polarity> {
    proptest::sample::select(Polarity::ALL.to_vec())
}

/// Signals with each score drawn from the given ranges.
fn arb_signals_in(
    defensiveness: std::ops::RangeInclusive<u8>,
    readiness: std::ops::RangeInclusive<u8>,
) -> impl Strategy<Value = SignalDetection> {
    (defensiveness, 0u8..=3, readiness, any::<bool>()).prop_map(|(d, a, r, denial)| {
        SignalDetection {
            defensiveness: d,
            acknowledgement: a,
            readiness: r,
            denial,
        }
    })
}

fn arb_signals() -> impl Strategy<Value = SignalDetection> {
    arb_signals_in(0..=3, 0..=3)
}

// ============================================================================
// Stage policy
// ============================================================================

proptest! {
    /// Defensiveness of two or more always keeps (or returns) the user in shadow.
    #[test]
    fn defensive_turns_stay_in_shadow(
        signals in arb_signals_in(2..=3, 0..=3),
        stage in arb_stage(),
        streak in 0u8..=10,
    ) {
        prop_assert_eq!(decide(&signals, stage, streak), Stage::Shadow);
    }

    /// A long shadow streak escalates to truth unless the user is defensive.
    #[test]
    fn shadow_streak_escalates(
        signals in arb_signals_in(0..=1, 0..=1),
        streak in 2u8..=10,
    ) {
        prop_assert_eq!(decide(&signals, Stage::Shadow, streak), Stage::Truth);
    }

    /// Folding any sequence of turns keeps every score inside 0..=3.
    #[test]
    fn state_scores_stay_bounded(
        turns in proptest::collection::vec(arb_signals(), 0..40),
    ) {
        let mut state = SessionState::default();
        for signals in &turns {
            let next = decide(signals, state.stage, state.shadow_streak);
            state.apply_turn(signals, next);
            prop_assert!(state.defensiveness <= SCORE_MAX);
            prop_assert!(state.acknowledgement <= SCORE_MAX);
            prop_assert!(state.readiness <= SCORE_MAX);
        }
    }

    /// Shadow never lasts more than two calm turns in a row.
    #[test]
    fn calm_shadow_never_stalls(
        turns in proptest::collection::vec(arb_signals_in(0..=1, 0..=3), 3..20),
    ) {
        let mut state = SessionState::default();
        for signals in &turns {
            let next = decide(signals, state.stage, state.shadow_streak);
            state.apply_turn(signals, next);
            prop_assert!(state.shadow_streak <= 2);
        }
    }
}

// ============================================================================
// Classifiers
// ============================================================================

proptest! {
    /// The signal detector is total and bounded on arbitrary text.
    #[test]
    fn signals_bounded_on_any_text(text in ".{0,200}") {
        let s = KeywordSignalDetector::new().detect(&text);
        prop_assert!(s.defensiveness <= SCORE_MAX);
        prop_assert!(s.acknowledgement <= SCORE_MAX);
        prop_assert!(s.readiness <= SCORE_MAX);
    }

    /// Safety output is internally consistent for arbitrary text.
    #[test]
    fn safety_assessment_consistent(text in ".{0,200}") {
        let a = KeywordSafetyClassifier::new(SafetyConfig::default()).classify(&text, Locale::Ru);
        let crisis = a.risk_level >= RiskLevel::Medium;
        prop_assert_eq!(a.is_safe, !crisis);
        prop_assert_eq!(a.intervention.is_some(), crisis);
        prop_assert_eq!(a.triggered_words.is_empty(), a.risk_level == RiskLevel::None);
    }

    /// A high-risk phrase anywhere in the text always classifies as high.
    #[test]
    fn high_risk_phrase_dominates(prefix in "[a-zа-я ]{0,40}", suffix in "[a-zа-я ]{0,40}") {
        let text = format!("{} нет сил {} хочу умереть {}", prefix, suffix, prefix);
        let a = KeywordSafetyClassifier::new(SafetyConfig::default()).classify(&text, Locale::Ru);
        prop_assert_eq!(a.risk_level, RiskLevel::High);
    }
}

// ============================================================================
// Truth cut
// ============================================================================

proptest! {
    /// The truth cut stays short and quotes short answers verbatim.
    #[test]
    fn truth_cut_short_and_verbatim(
        polarity in arb_polarity(),
        voice in arb_voice(),
        word in "[а-яa-z]{1,30}",
    ) {
        let data = OnboardingData {
            polarity: Some(polarity),
            one_word: Some(word.clone()),
            ..Default::default()
        };
        let text = synthesize_truth_cut(&data, voice);
        prop_assert!(text.chars().count() < 180);
        let quoted = format!("«{}»", word);
        prop_assert!(text.contains(&quoted));
    }
}
