//! Keyword emotion detection.
//!
//! Primary emotions are checked first, then secondary ones; the first
//! keyword hit decides. Nothing matching yields `Emotion::Confusion`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Anxiety,
    Sadness,
    Anger,
    Fear,
    Shame,
    Guilt,
    Loneliness,
    Emptiness,
    Confusion,
}

impl Emotion {
    pub const ALL: [Emotion; 9] = [
        Emotion::Anxiety,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Shame,
        Emotion::Guilt,
        Emotion::Loneliness,
        Emotion::Emptiness,
        Emotion::Confusion,
    ];

    /// Returned when no keyword matches.
    pub const FALLBACK: Emotion = Emotion::Confusion;

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Anxiety => "anxiety",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Shame => "shame",
            Emotion::Guilt => "guilt",
            Emotion::Loneliness => "loneliness",
            Emotion::Emptiness => "emptiness",
            Emotion::Confusion => "confusion",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Anxiety => "тревога",
            Emotion::Sadness => "грусть",
            Emotion::Anger => "злость",
            Emotion::Fear => "страх",
            Emotion::Shame => "стыд",
            Emotion::Guilt => "вина",
            Emotion::Loneliness => "одиночество",
            Emotion::Emptiness => "пустота",
            Emotion::Confusion => "растерянность",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

pub trait EmotionDetector: Send + Sync {
    /// Total: always returns a label.
    fn detect(&self, text: &str) -> Emotion;
}

const PRIMARY: &[(Emotion, &[&str])] = &[
    (Emotion::Fear, &["боюсь", "страх", "страшно", "afraid", "scared"]),
    (Emotion::Anxiety, &["тревож", "тревог", "волнуюсь", "беспоко", "anxious", "worried"]),
    (Emotion::Anger, &["злюсь", "злость", "бесит", "ярость", "раздража", "angry", "furious"]),
    (Emotion::Shame, &["стыд", "позор", "ashamed", "shame"]),
    (Emotion::Guilt, &["виноват", "вина", "guilty", "my fault"]),
    (Emotion::Sadness, &["грусть", "грустно", "печаль", "плачу", "тоска", "sad", "crying"]),
];

const SECONDARY: &[(Emotion, &[&str])] = &[
    (Emotion::Loneliness, &["одинок", "никому не нужн", "один на один", "lonely", "alone"]),
    (Emotion::Emptiness, &["пусто", "пустота", "ничего не чувствую", "empty", "numb"]),
];

#[derive(Debug, Clone, Default)]
pub struct KeywordEmotionDetector;

impl KeywordEmotionDetector {
    pub fn new() -> Self {
        Self
    }
}

impl EmotionDetector for KeywordEmotionDetector {
    fn detect(&self, text: &str) -> Emotion {
        let text = text.to_lowercase();
        PRIMARY
            .iter()
            .chain(SECONDARY)
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(emotion, _)| *emotion)
            .unwrap_or(Emotion::FALLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Emotion {
        KeywordEmotionDetector::new().detect(text)
    }

    #[test]
    fn test_primary_keywords() {
        assert_eq!(detect("Мне страшно идти на работу"), Emotion::Fear);
        assert_eq!(detect("меня всё бесит"), Emotion::Anger);
        assert_eq!(detect("мне стыдно"), Emotion::Shame);
    }

    #[test]
    fn test_primary_wins_over_secondary() {
        // "одиноко" is secondary, "грустно" is primary.
        assert_eq!(detect("мне одиноко и грустно"), Emotion::Sadness);
    }

    #[test]
    fn test_secondary_keywords() {
        assert_eq!(detect("внутри пустота"), Emotion::Emptiness);
        assert_eq!(detect("I feel so lonely"), Emotion::Loneliness);
    }

    #[test]
    fn test_fallback_is_total() {
        assert_eq!(detect(""), Emotion::FALLBACK);
        assert_eq!(detect("погода сегодня хорошая"), Emotion::Confusion);
    }

    #[test]
    fn test_keys_parse_back() {
        for emotion in Emotion::ALL {
            assert_eq!(Emotion::parse(emotion.as_str()), Some(emotion));
        }
    }
}
