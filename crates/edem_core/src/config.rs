use crate::{Locale, Mode, Voice};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EdemConfig {
    pub dialogue: DialogueConfig,
    pub safety: SafetyConfig,
    pub storage: StorageConfig,
}

impl EdemConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: EdemConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("EDEM_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Some(locale) = std::env::var("EDEM_LOCALE").ok().and_then(|v| Locale::parse(&v)) {
            self.dialogue.locale = locale;
        }
        if let Some(voice) = std::env::var("EDEM_VOICE").ok().and_then(|v| Voice::parse(&v)) {
            self.dialogue.default_voice = voice;
        }
        if let Some(mode) = std::env::var("EDEM_MODE").ok().and_then(|v| Mode::parse(&v)) {
            self.dialogue.default_mode = mode;
        }
        if let Ok(v) = std::env::var("EDEM_HOTLINE_RU") {
            self.safety.hotline_ru = v;
        }
        if let Ok(v) = std::env::var("EDEM_HOTLINE_EN") {
            self.safety.hotline_en = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub locale: Locale,
    pub default_voice: Voice,
    pub default_mode: Mode,
    /// How many recent rituals are excluded from the next pick.
    pub recent_ritual_window: usize,
    /// Utterance cap for intake and truth-cut replies, in characters.
    pub max_utterance_chars: usize,
    /// Days until an assigned practice is due.
    pub practice_due_days: i64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            locale: Locale::Ru,
            default_voice: Voice::Soft,
            default_mode: Mode::Demo,
            recent_ritual_window: 3,
            max_utterance_chars: 180,
            practice_due_days: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub hotline_ru: String,
    pub hotline_en: String,
    /// Additional phrases treated as high risk, matched case-insensitively.
    pub extra_high_risk: Vec<String>,
    /// Upper bound on the incident log write before the reply goes out.
    pub incident_timeout_ms: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            hotline_ru: "8-800-2000-122 (телефон доверия, бесплатно)".to_string(),
            hotline_en: "988 Suicide & Crisis Lifeline (call or text 988)".to_string(),
            extra_high_risk: vec![],
            incident_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "edem.db".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
