//! Flow positions and the per-step inbound payloads.
//!
//! Every inbound turn names the step it answers; the payload carries only that
//! step's fields. Missing fields are `None` so the onboarding machine can
//! re-prompt instead of failing deserialization.

use crate::Stage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    #[serde(rename = "onb_1_mask")]
    Mask,
    #[serde(rename = "onb_2_trigger")]
    Trigger,
    #[serde(rename = "onb_3_polarity")]
    Polarity,
    #[serde(rename = "onb_4_body")]
    Body,
    #[serde(rename = "onb_5_one_word")]
    OneWord,
    #[serde(rename = "onb_6_cost_agree")]
    CostAgree,
    #[serde(rename = "truth_cut")]
    TruthCut,
    #[serde(rename = "paywall")]
    Paywall,
    #[serde(rename = "archetype")]
    Archetype,
    #[serde(rename = "close")]
    Close,
    #[serde(rename = "shadow")]
    Shadow,
    #[serde(rename = "truth")]
    Truth,
    #[serde(rename = "integration")]
    Integration,
    #[serde(rename = "practice_report")]
    PracticeReport,
    #[serde(rename = "crisis_intervention")]
    CrisisIntervention,
    #[serde(rename = "error")]
    Error,
}

impl Step {
    pub const ALL: [Step; 16] = [
        Step::Mask,
        Step::Trigger,
        Step::Polarity,
        Step::Body,
        Step::OneWord,
        Step::CostAgree,
        Step::TruthCut,
        Step::Paywall,
        Step::Archetype,
        Step::Close,
        Step::Shadow,
        Step::Truth,
        Step::Integration,
        Step::PracticeReport,
        Step::CrisisIntervention,
        Step::Error,
    ];

    /// The six intake steps, in order.
    pub const ONBOARDING: [Step; 6] = [
        Step::Mask,
        Step::Trigger,
        Step::Polarity,
        Step::Body,
        Step::OneWord,
        Step::CostAgree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Mask => "onb_1_mask",
            Step::Trigger => "onb_2_trigger",
            Step::Polarity => "onb_3_polarity",
            Step::Body => "onb_4_body",
            Step::OneWord => "onb_5_one_word",
            Step::CostAgree => "onb_6_cost_agree",
            Step::TruthCut => "truth_cut",
            Step::Paywall => "paywall",
            Step::Archetype => "archetype",
            Step::Close => "close",
            Step::Shadow => "shadow",
            Step::Truth => "truth",
            Step::Integration => "integration",
            Step::PracticeReport => "practice_report",
            Step::CrisisIntervention => "crisis_intervention",
            Step::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.as_str() == s)
    }

    pub fn is_onboarding(&self) -> bool {
        Self::ONBOARDING.contains(self)
    }

    /// Stage hosted by this step, for the three dialogue steps.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Step::Shadow => Some(Stage::Shadow),
            Step::Truth => Some(Stage::Truth),
            Step::Integration => Some(Stage::Integration),
            _ => None,
        }
    }

    /// Steps a fresh session may open with.
    pub fn is_entry(&self) -> bool {
        matches!(self, Step::Mask | Step::Shadow)
    }

    /// Steps that are only ever emitted as reply tags and never persisted.
    pub fn is_reply_only(&self) -> bool {
        matches!(
            self,
            Step::CrisisIntervention | Step::Error | Step::PracticeReport | Step::TruthCut
        )
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound turn: the step being answered plus that step's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "payload")]
pub enum TurnInput {
    #[serde(rename = "onb_1_mask")]
    Mask {
        #[serde(default)]
        mask: Option<String>,
    },
    #[serde(rename = "onb_2_trigger")]
    Trigger {
        #[serde(default)]
        trigger: Option<String>,
    },
    /// Polarity arrives as a button label; unknown labels are re-prompted.
    #[serde(rename = "onb_3_polarity")]
    Polarity {
        #[serde(default)]
        polarity: Option<String>,
    },
    #[serde(rename = "onb_4_body")]
    Body {
        #[serde(default)]
        body: Option<String>,
    },
    #[serde(rename = "onb_5_one_word", rename_all = "camelCase")]
    OneWord {
        #[serde(default)]
        one_word: Option<String>,
    },
    #[serde(rename = "onb_6_cost_agree", rename_all = "camelCase")]
    CostAgree {
        #[serde(default)]
        cost_agree: Option<bool>,
    },
    #[serde(rename = "truth_cut")]
    TruthCut,
    #[serde(rename = "paywall")]
    Paywall,
    #[serde(rename = "archetype")]
    Archetype,
    #[serde(rename = "close")]
    Close,
    #[serde(rename = "shadow")]
    Shadow {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "truth")]
    Truth {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "integration")]
    Integration {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "practice_report", rename_all = "camelCase")]
    PracticeReport {
        practice_id: Uuid,
        #[serde(default)]
        self_report: Option<u8>,
        #[serde(default)]
        note: Option<String>,
    },
}

impl TurnInput {
    pub fn step(&self) -> Step {
        match self {
            TurnInput::Mask { .. } => Step::Mask,
            TurnInput::Trigger { .. } => Step::Trigger,
            TurnInput::Polarity { .. } => Step::Polarity,
            TurnInput::Body { .. } => Step::Body,
            TurnInput::OneWord { .. } => Step::OneWord,
            TurnInput::CostAgree { .. } => Step::CostAgree,
            TurnInput::TruthCut => Step::TruthCut,
            TurnInput::Paywall => Step::Paywall,
            TurnInput::Archetype => Step::Archetype,
            TurnInput::Close => Step::Close,
            TurnInput::Shadow { .. } => Step::Shadow,
            TurnInput::Truth { .. } => Step::Truth,
            TurnInput::Integration { .. } => Step::Integration,
            TurnInput::PracticeReport { .. } => Step::PracticeReport,
        }
    }

    /// Every free-text field of the payload, joined, for safety scanning.
    pub fn free_text(&self) -> String {
        match self {
            TurnInput::Mask { mask: t }
            | TurnInput::Trigger { trigger: t }
            | TurnInput::Polarity { polarity: t }
            | TurnInput::Body { body: t }
            | TurnInput::OneWord { one_word: t }
            | TurnInput::PracticeReport { note: t, .. } => t.clone().unwrap_or_default(),
            TurnInput::Shadow { text }
            | TurnInput::Truth { text }
            | TurnInput::Integration { text } => text.clone(),
            TurnInput::CostAgree { .. }
            | TurnInput::TruthCut
            | TurnInput::Paywall
            | TurnInput::Archetype
            | TurnInput::Close => String::new(),
        }
    }

    /// Text of a dialogue message, whichever stage step it names.
    ///
    /// Clients may lag one turn behind the stored stage; only the text matters
    /// for a dialogue turn.
    pub fn dialogue_text(&self) -> Option<&str> {
        match self {
            TurnInput::Shadow { text }
            | TurnInput::Truth { text }
            | TurnInput::Integration { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_string_forms_are_unique_and_parse_back() {
        for step in Step::ALL {
            assert_eq!(Step::parse(step.as_str()), Some(step));
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
        assert_eq!(Step::parse("onb_7"), None);
    }

    #[test]
    fn test_turn_input_from_wire_json() {
        let json = r#"{"step":"onb_5_one_word","payload":{"oneWord":"пустота"}}"#;
        let input: TurnInput = serde_json::from_str(json).unwrap();
        assert_eq!(
            input,
            TurnInput::OneWord {
                one_word: Some("пустота".into())
            }
        );
        assert_eq!(input.step(), Step::OneWord);
    }

    #[test]
    fn test_turn_input_missing_field_is_none() {
        let json = r#"{"step":"onb_2_trigger","payload":{}}"#;
        let input: TurnInput = serde_json::from_str(json).unwrap();
        assert_eq!(input, TurnInput::Trigger { trigger: None });
    }

    #[test]
    fn test_cost_agree_camel_case() {
        let json = r#"{"step":"onb_6_cost_agree","payload":{"costAgree":false}}"#;
        let input: TurnInput = serde_json::from_str(json).unwrap();
        assert_eq!(input, TurnInput::CostAgree { cost_agree: Some(false) });
        assert!(input.free_text().is_empty());
    }

    #[test]
    fn test_free_text_covers_dialogue_and_intake() {
        let shadow = TurnInput::Shadow { text: "мне тяжело".into() };
        assert_eq!(shadow.free_text(), "мне тяжело");
        assert_eq!(shadow.dialogue_text(), Some("мне тяжело"));

        let body = TurnInput::Body { body: Some("грудь".into()) };
        assert_eq!(body.free_text(), "грудь");
        assert_eq!(body.dialogue_text(), None);
    }

    #[test]
    fn test_only_mask_and_shadow_open_sessions() {
        let entries: Vec<Step> = Step::ALL.into_iter().filter(Step::is_entry).collect();
        assert_eq!(entries, vec![Step::Mask, Step::Shadow]);
    }
}
