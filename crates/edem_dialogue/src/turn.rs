use chrono::{DateTime, FixedOffset};
use edem_core::{Locale, Mode, Owner, Step, TurnInput, Voice};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One inbound turn.
///
/// `mode` is resolved upstream by whoever knows the subscription state; the
/// engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// Absent on the very first turn; the engine allocates one.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub owner: Owner,
    #[serde(default)]
    pub voice: Voice,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub locale: Locale,
    /// Client local time, used for day-part scenes. Server time when absent.
    #[serde(default)]
    pub local_time: Option<DateTime<FixedOffset>>,
    pub input: TurnInput,
}

impl TurnRequest {
    pub fn new(owner: Owner, input: TurnInput) -> Self {
        Self {
            session_id: None,
            owner,
            voice: Voice::default(),
            mode: Mode::default(),
            locale: Locale::default(),
            local_time: None,
            input,
        }
    }

    pub fn in_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

/// What the client renders for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub next_step: Step,
    pub utterance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paywall: bool,
    pub session_id: Uuid,
}
