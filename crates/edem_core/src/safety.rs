use crate::config::SafetyConfig;
use crate::Locale;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Assessment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(RiskLevel::None),
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub is_safe: bool,
    pub risk_level: RiskLevel,
    pub triggered_words: Vec<String>,
    /// Crisis message to show instead of the dialogue (medium/high only).
    pub intervention: Option<String>,
    pub should_switch_to_therapist: bool,
}

impl SafetyAssessment {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            risk_level: RiskLevel::None,
            triggered_words: Vec::new(),
            intervention: None,
            should_switch_to_therapist: false,
        }
    }
}

/// Crisis-language screen with override authority over the dialogue.
pub trait SafetyClassifier: Send + Sync {
    fn classify(&self, text: &str, locale: Locale) -> SafetyAssessment;
}

// ============================================================================
// Keyword tiers
// ============================================================================

const HIGH_RISK: &[&str] = &[
    "покончить с собой",
    "убить себя",
    "не хочу жить",
    "хочу умереть",
    "суицид",
    "самоубийств",
    "вскрыть вены",
    "прыгнуть с крыши",
    "kill myself",
    "end my life",
    "want to die",
    "suicide",
];

const MEDIUM_RISK: &[&str] = &[
    "причинить себе вред",
    "режу себя",
    "порезы",
    "нет смысла жить",
    "всем будет лучше без меня",
    "не вижу выхода",
    "self-harm",
    "hurt myself",
    "no reason to live",
    "better off without me",
];

const LOW_RISK: &[&str] = &[
    "безнадёжно",
    "безнадежно",
    "нет сил",
    "всё бессмысленно",
    "все бессмысленно",
    "устала жить",
    "устал жить",
    "hopeless",
    "can't go on",
    "exhausted of everything",
];

/// Clinical topics that call for the therapist voice regardless of risk tier.
const CLINICAL_TRIGGERS: &[&str] = &[
    "травма",
    "насилие",
    "паническ",
    "панику",
    "зависимост",
    "алкогол",
    "наркот",
    "депресс",
    "рпп",
    "trauma",
    "abuse",
    "panic",
    "addiction",
    "depression",
    "eating disorder",
];

// ============================================================================
// KeywordSafetyClassifier
// ============================================================================

pub struct KeywordSafetyClassifier {
    config: SafetyConfig,
}

impl KeywordSafetyClassifier {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    fn high_risk_hits(&self, text: &str) -> Vec<String> {
        let mut hits = matches(text, HIGH_RISK);
        for extra in &self.config.extra_high_risk {
            let extra = extra.to_lowercase();
            if !extra.is_empty() && text.contains(&extra) {
                hits.push(extra);
            }
        }
        hits
    }

    fn intervention(&self, locale: Locale) -> String {
        match locale {
            Locale::Ru => format!(
                "Я слышу, что тебе сейчас очень тяжело. Ты не один. \
                 Пожалуйста, позвони прямо сейчас: {}. Если есть угроза жизни, звони 112.",
                self.config.hotline_ru
            ),
            Locale::En => format!(
                "I hear that things are really hard right now. You are not alone. \
                 Please reach out now: {}. If your life is in danger, call your local emergency number.",
                self.config.hotline_en
            ),
        }
    }
}

impl SafetyClassifier for KeywordSafetyClassifier {
    fn classify(&self, text: &str, locale: Locale) -> SafetyAssessment {
        let text = text.to_lowercase();
        if text.trim().is_empty() {
            return SafetyAssessment::safe();
        }

        // Severity order: a lower tier is only consulted when every higher tier is empty.
        let (risk_level, triggered_words) = {
            let high = self.high_risk_hits(&text);
            if !high.is_empty() {
                (RiskLevel::High, high)
            } else {
                let medium = matches(&text, MEDIUM_RISK);
                if !medium.is_empty() {
                    (RiskLevel::Medium, medium)
                } else {
                    let low = matches(&text, LOW_RISK);
                    if !low.is_empty() {
                        (RiskLevel::Low, low)
                    } else {
                        (RiskLevel::None, Vec::new())
                    }
                }
            }
        };

        let clinical = CLINICAL_TRIGGERS.iter().any(|w| text.contains(w));
        let crisis = risk_level >= RiskLevel::Medium;

        if crisis {
            tracing::warn!(risk = %risk_level, words = ?triggered_words, "crisis language detected");
        }

        SafetyAssessment {
            is_safe: !crisis,
            risk_level,
            triggered_words,
            intervention: crisis.then(|| self.intervention(locale)),
            should_switch_to_therapist: clinical || crisis,
        }
    }
}

fn matches(text: &str, words: &[&str]) -> Vec<String> {
    words
        .iter()
        .filter(|w| text.contains(*w))
        .map(|w| w.to_string())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
