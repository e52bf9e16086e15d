//! Keyword-based Russian/English signal detection for dialogue turns.
//!
//! Classifies an utterance into defensiveness, acknowledgement and readiness
//! scores. Heuristic bag-of-phrases; the `SignalDetector` trait lets an ML
//! classifier replace it without touching the stage policy.

use crate::session::SCORE_MAX;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Per-turn read of the user's stance toward the reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalDetection {
    /// 0..=3
    pub defensiveness: u8,
    /// 0..=3; any positive value counts as recognition.
    pub acknowledgement: u8,
    /// 0..=3
    pub readiness: u8,
    /// Explicit "that is not me"; resets accumulated acknowledgement.
    pub denial: bool,
}

impl SignalDetection {
    pub fn acknowledged(&self) -> bool {
        self.acknowledgement > 0 && !self.denial
    }
}

pub trait SignalDetector: Send + Sync {
    fn detect(&self, text: &str) -> SignalDetection;

    /// Name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Phrase tables
// ============================================================================

const DEFENSIVE_STRONG: &[&str] = &[
    "это не про меня",
    "это не обо мне",
    "ты не понимаешь",
    "вы не понимаете",
    "при чём тут я",
    "причем тут я",
    "я ни при чём",
    "я тут ни при чем",
    "не надо меня анализировать",
    "бред",
    "this isn't about me",
    "this is not about me",
    "you don't understand",
    "that's not me",
    "stop analyzing me",
];

const DEFENSIVE_WEAK: &[&str] = &[
    "но",
    "это они",
    "это он",
    "это она",
    "виноваты другие",
    "просто так сложилось",
    "but",
    "they're the ones",
    "it's their fault",
];

/// Ordered by strength; the first hit decides the score.
const ACKNOWLEDGEMENT_TIERS: &[(&str, u8)] = &[
    ("да, это я", 3),
    ("это точно про меня", 3),
    ("yes, that's me", 3),
    ("узнаю себя", 2),
    ("это про меня", 2),
    ("я это узнаю", 2),
    ("i recognize that", 2),
    ("that's me", 2),
    ("похоже на меня", 1),
    ("наверное, да", 1),
    ("возможно, это так", 1),
    ("maybe that's true", 1),
    ("sounds like me", 1),
];

const DENIAL: &[&str] = &[
    "это не я",
    "не узнаю себя",
    "нет, не про меня",
    "совсем не так",
    "that's not true",
    "not me at all",
];

/// Counted once per phrase; skipped when negated ("не готова", "not ready to").
const READINESS: &[&str] = &[
    "попробую",
    "готов",
    "готова",
    "готовы",
    "хочу измениться",
    "хочу что-то сделать",
    "что мне делать",
    "давай начнём",
    "давай начнем",
    "i'll try",
    "ready to",
    "i want to change",
    "what can i do",
];

/// Words that flip a readiness phrase right after them.
const NEGATIONS: &[&str] = &["не", "not", "never", "никогда"];

static DEFENSIVE_STRONG_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| phrase_patterns(DEFENSIVE_STRONG));
static DEFENSIVE_WEAK_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| phrase_patterns(DEFENSIVE_WEAK));
static DENIAL_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| phrase_patterns(DENIAL));
static READINESS_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| phrase_patterns(READINESS));
static ACKNOWLEDGEMENT_RE: LazyLock<Vec<(Regex, u8)>> = LazyLock::new(|| {
    ACKNOWLEDGEMENT_TIERS
        .iter()
        .map(|(phrase, score)| (whole_phrase(phrase), *score))
        .collect()
});

/// Matches `phrase` only as whole words, so "но" does not hit "грустно".
fn whole_phrase(phrase: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", regex::escape(phrase))).unwrap()
}

fn phrase_patterns(phrases: &[&str]) -> Vec<Regex> {
    phrases.iter().map(|p| whole_phrase(p)).collect()
}

// ============================================================================
// KeywordSignalDetector
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct KeywordSignalDetector;

impl KeywordSignalDetector {
    pub fn new() -> Self {
        Self
    }
}

impl SignalDetector for KeywordSignalDetector {
    fn detect(&self, text: &str) -> SignalDetection {
        if text.trim().is_empty() {
            return SignalDetection::default();
        }
        let text = text.to_lowercase();

        let strong = count_matches(&text, &DEFENSIVE_STRONG_RE);
        let defensiveness = if strong > 0 {
            strong
        } else if count_matches(&text, &DEFENSIVE_WEAK_RE) > 0 {
            1
        } else {
            0
        };

        let denial = DENIAL_RE.iter().any(|re| re.is_match(&text));
        let acknowledgement = if denial {
            0
        } else {
            ACKNOWLEDGEMENT_RE
                .iter()
                .find(|(re, _)| re.is_match(&text))
                .map(|(_, score)| *score)
                .unwrap_or(0)
        };

        let detection = SignalDetection {
            defensiveness,
            acknowledgement,
            readiness: count_affirmed(&text, &READINESS_RE),
            denial,
        };
        tracing::debug!(?detection, "signals detected");
        detection
    }

    fn name(&self) -> &str {
        "keyword_signals"
    }
}

fn count_matches(text: &str, patterns: &[Regex]) -> u8 {
    let hits = patterns.iter().filter(|re| re.is_match(text)).count();
    hits.min(SCORE_MAX as usize) as u8
}

/// Like `count_matches`, but a phrase counts only if some occurrence of it is
/// not directly preceded by a negation.
fn count_affirmed(text: &str, patterns: &[Regex]) -> u8 {
    let hits = patterns
        .iter()
        .filter(|re| re.find_iter(text).any(|m| !is_negated(&text[..m.start()])))
        .count();
    hits.min(SCORE_MAX as usize) as u8
}

fn is_negated(before: &str) -> bool {
    let last_word = before
        .trim_end()
        .rsplit(|c: char| !(c.is_alphanumeric() || c == '\''))
        .next()
        .unwrap_or("");
    last_word.ends_with("n't") || NEGATIONS.contains(&last_word)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> SignalDetection {
        KeywordSignalDetector::new().detect(text)
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        assert_eq!(detect(""), SignalDetection::default());
        assert_eq!(detect("   \n\t"), SignalDetection::default());
    }

    #[test]
    fn test_strong_defensiveness_counts_and_caps() {
        assert_eq!(detect("Это не про меня").defensiveness, 1);
        assert_eq!(detect("Это не про меня, ты не понимаешь").defensiveness, 2);
        let flood = "бред, это не про меня, ты не понимаешь, при чём тут я";
        assert_eq!(detect(flood).defensiveness, SCORE_MAX);
    }

    #[test]
    fn test_weak_hedge_gives_base_score() {
        assert_eq!(detect("Да, но это они начали").defensiveness, 1);
        assert_eq!(detect("I guess, but").defensiveness, 1);
    }

    #[test]
    fn test_acknowledgement_first_match_wins() {
        // Both a tier-3 and a tier-1 phrase: the earlier table entry decides.
        let s = detect("да, это я. похоже на меня");
        assert_eq!(s.acknowledgement, 3);
        assert_eq!(detect("наверное, да").acknowledgement, 1);
        assert!(detect("узнаю себя в этом").acknowledged());
    }

    #[test]
    fn test_denial_suppresses_acknowledgement() {
        let s = detect("нет, это не я");
        assert!(s.denial);
        assert_eq!(s.acknowledgement, 0);
        assert!(!s.acknowledged());
    }

    #[test]
    fn test_readiness_capped() {
        assert_eq!(detect("попробую").readiness, 1);
        let eager = "готова, попробую, хочу измениться, давай начнём";
        assert_eq!(detect(eager).readiness, SCORE_MAX);
        assert_eq!(detect("I'll try, I'm ready to").readiness, 2);
    }

    #[test]
    fn test_readiness_word_forms_count_once() {
        assert_eq!(detect("готова").readiness, 1);
        assert_eq!(detect("я готов").readiness, 1);
        assert_eq!(detect("мы готовы").readiness, 1);
        assert_eq!(detect("готовлю ужин").readiness, 0);
    }

    #[test]
    fn test_negated_readiness_is_ignored() {
        assert_eq!(detect("я не готова").readiness, 0);
        assert_eq!(detect("Я не готов, не попробую").readiness, 0);
        assert_eq!(detect("I'm not ready to talk").readiness, 0);
        assert_eq!(detect("I am really not ready to").readiness, 0);
        // One affirmed occurrence is enough.
        assert_eq!(detect("не готова вчера, сегодня готова").readiness, 1);
    }

    #[test]
    fn test_hedges_match_whole_words_only() {
        assert_eq!(detect("мне грустно").defensiveness, 0);
        assert_eq!(detect("нормально, спокойно").defensiveness, 0);
        assert_eq!(detect("это было давно").defensiveness, 0);
        assert_eq!(detect("грустно, но терпимо").defensiveness, 1);
        assert_eq!(detect("a butterfly landed").defensiveness, 0);
    }

    #[test]
    fn test_neutral_text() {
        let s = detect("сегодня был обычный день");
        assert_eq!(s, SignalDetection::default());
    }
}
