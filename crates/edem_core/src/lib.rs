pub mod config;
pub mod error;
pub mod flow;
pub mod onboarding;
pub mod safety;
pub mod session;
pub mod signals;
pub mod stage;
pub mod step;

pub use config::EdemConfig;
pub use error::TransitionError;
pub use onboarding::{synthesize_truth_cut, FsmOutcome, OnboardingFsm};
pub use safety::{KeywordSafetyClassifier, RiskLevel, SafetyAssessment, SafetyClassifier};
pub use session::{
    OnboardingData, Polarity, Practice, RitualMemory, SafetyIncident, SessionRecord,
    SessionState, TurnCommit,
};
pub use signals::{KeywordSignalDetector, SignalDetection, SignalDetector};
pub use stage::decide;
pub use step::{Step, TurnInput};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Dialogue phase of the mirror session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Shadow,
    Truth,
    Integration,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Shadow, Stage::Truth, Stage::Integration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Shadow => "shadow",
            Stage::Truth => "truth",
            Stage::Integration => "integration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == s)
    }

    /// The flow step that hosts this stage.
    pub fn step(&self) -> Step {
        match self {
            Stage::Shadow => Step::Shadow,
            Stage::Truth => Step::Truth,
            Stage::Integration => Step::Integration,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaking style of every user-facing string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    #[default]
    Soft,
    Hard,
    Therapist,
}

impl Voice {
    pub const ALL: [Voice; 3] = [Voice::Soft, Voice::Hard, Voice::Therapist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Soft => "soft",
            Voice::Hard => "hard",
            Voice::Therapist => "therapist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

/// Access mode resolved upstream by the subscription layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Demo,
    Pro,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "demo" => Some(Mode::Demo),
            "pro" => Some(Mode::Pro),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ru" => Some(Locale::Ru),
            "en" => Some(Locale::En),
            _ => None,
        }
    }
}

/// Who a session belongs to: a registered user or an anonymous guest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    User(String),
    Guest(String),
}

impl Owner {
    pub fn kind(&self) -> &'static str {
        match self {
            Owner::User(_) => "user",
            Owner::Guest(_) => "guest",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Owner::User(id) | Owner::Guest(id) => id,
        }
    }

    pub fn from_parts(kind: &str, id: String) -> Self {
        match kind {
            "user" => Owner::User(id),
            _ => Owner::Guest(id),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Persistence collaborator for sessions, ritual memory, practices and incidents.
///
/// `commit_turn` must be atomic: either the new session row and every row
/// attached to the commit are written, or nothing is.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Newest session row for `(owner, session_id)`, if any.
    async fn load_session(&self, owner: &Owner, session_id: Uuid)
        -> anyhow::Result<Option<SessionRecord>>;

    async fn commit_turn(&self, commit: &TurnCommit) -> anyhow::Result<()>;

    /// Most recent rituals served to this user, newest first.
    async fn recent_rituals(&self, user_id: &str, limit: usize)
        -> anyhow::Result<Vec<RitualMemory>>;

    async fn session_practices(&self, session_id: Uuid) -> anyhow::Result<Vec<Practice>>;

    /// Mark a practice done. Returns `false` if it does not exist or was already reported.
    async fn complete_practice(
        &self,
        practice_id: Uuid,
        self_report: u8,
        note: Option<&str>,
    ) -> anyhow::Result<bool>;

    async fn record_incident(&self, incident: &SafetyIncident) -> anyhow::Result<()>;
}
