//! Session data model: per-session dialogue state, onboarding intake, and the
//! append-only records that hang off a session.

use crate::safety::RiskLevel;
use crate::signals::SignalDetection;
use crate::{Owner, Stage, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of every signal score.
pub const SCORE_MAX: u8 = 3;

// ============================================================================
// SessionState
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub stage: Stage,
    pub defensiveness: u8,
    pub acknowledgement: u8,
    pub readiness: u8,
    /// Consecutive turns that ended in `shadow`.
    pub shadow_streak: u8,
}

impl SessionState {
    /// Fold one turn's signals and the policy's verdict into the state.
    ///
    /// All fields change together so the stage/streak pair stays consistent.
    pub fn apply_turn(&mut self, signals: &SignalDetection, next: Stage) {
        self.defensiveness = signals.defensiveness.min(SCORE_MAX);
        self.readiness = signals.readiness.min(SCORE_MAX);
        if signals.denial {
            self.acknowledgement = 0;
        } else if signals.acknowledgement > 0 {
            self.acknowledgement = (self.acknowledgement + 1).min(SCORE_MAX);
        }

        self.shadow_streak = match (self.stage, next) {
            (Stage::Shadow, Stage::Shadow) => self.shadow_streak.saturating_add(1),
            (_, Stage::Shadow) => 1,
            _ => 0,
        };
        self.stage = next;
    }
}

// ============================================================================
// Onboarding intake
// ============================================================================

/// What the user fears losing or carrying, chosen from buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Loss,
    Control,
    Rejection,
    Guilt,
    Shame,
    Other,
}

impl Polarity {
    pub const ALL: [Polarity; 6] = [
        Polarity::Loss,
        Polarity::Control,
        Polarity::Rejection,
        Polarity::Guilt,
        Polarity::Shame,
        Polarity::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Loss => "loss",
            Polarity::Control => "control",
            Polarity::Rejection => "rejection",
            Polarity::Guilt => "guilt",
            Polarity::Shame => "shame",
            Polarity::Other => "other",
        }
    }

    /// Button label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Polarity::Loss => "потеря",
            Polarity::Control => "контроль",
            Polarity::Rejection => "отвержение",
            Polarity::Guilt => "вина",
            Polarity::Shame => "стыд",
            Polarity::Other => "другое",
        }
    }

    /// Accepts either the wire key or the button label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s || p.label() == s)
    }
}

/// Structured answers collected by the six intake steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingData {
    pub mask: Option<String>,
    pub trigger: Option<String>,
    pub polarity: Option<Polarity>,
    pub body: Option<String>,
    pub one_word: Option<String>,
    pub cost_agree: Option<bool>,
}

impl OnboardingData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The intake step whose field is the first one still unset.
    ///
    /// Fields are filled strictly in order, so this is also the step the flow
    /// must be at. `None` once every field is set.
    pub fn expected_step(&self) -> Option<Step> {
        if self.mask.is_none() {
            Some(Step::Mask)
        } else if self.trigger.is_none() {
            Some(Step::Trigger)
        } else if self.polarity.is_none() {
            Some(Step::Polarity)
        } else if self.body.is_none() {
            Some(Step::Body)
        } else if self.one_word.is_none() {
            Some(Step::OneWord)
        } else if self.cost_agree.is_none() {
            Some(Step::CostAgree)
        } else {
            None
        }
    }

    /// All free-text answers joined, for archetype profiling.
    pub fn narrative(&self) -> String {
        [&self.mask, &self.trigger, &self.body, &self.one_word]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(". ")
    }
}

// ============================================================================
// Session row
// ============================================================================

/// One persisted snapshot of a session. The newest row per session wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub owner: Owner,
    pub session_id: Uuid,
    pub step: Step,
    pub state: SessionState,
    pub onboarding: OnboardingData,
    /// Archetype key from the last profiling pass.
    pub archetype: Option<String>,
    /// Row version; increases by one per committed turn.
    pub turn: u32,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(owner: Owner, session_id: Uuid, step: Step) -> Self {
        Self {
            owner,
            session_id,
            step,
            state: SessionState::default(),
            onboarding: OnboardingData::default(),
            archetype: None,
            turn: 0,
            updated_at: Utc::now(),
        }
    }

    /// Start a fresh intake on the same session, dropping earlier answers.
    pub fn restart_onboarding(&mut self) {
        self.onboarding = OnboardingData::default();
        self.step = Step::Mask;
    }
}

// ============================================================================
// Append-only records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RitualMemory {
    pub user_id: String,
    pub session_id: Uuid,
    pub emotion: String,
    pub scene: String,
    pub ritual_text: String,
    pub user_input: String,
    pub timestamp: DateTime<Utc>,
}

/// Take-home exercise assigned during integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practice {
    pub id: Uuid,
    pub owner: Owner,
    pub session_id: Uuid,
    pub practice_key: String,
    pub assigned_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub done: bool,
    /// 0..=10, set once on completion.
    pub self_report: Option<u8>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyIncident {
    pub owner: Owner,
    pub session_id: Uuid,
    pub risk_level: RiskLevel,
    pub triggered_words: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Everything one turn writes, applied atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCommit {
    pub session: SessionRecord,
    pub ritual: Option<RitualMemory>,
    pub practice: Option<Practice>,
}

impl TurnCommit {
    pub fn session_only(session: SessionRecord) -> Self {
        Self {
            session,
            ritual: None,
            practice: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
