//! The turn pipeline.
//!
//! Per turn: session gate → safety screen (may short-circuit) → load the
//! newest session row → route on the stored step (intake FSM, paywall,
//! archetype reveal, or signal-driven stage dialogue) → compose → one atomic
//! commit. Any collaborator failure answers with the fallback line and
//! leaves the stored session untouched.

use crate::composer::{Composer, Phrase, Reply};
use crate::turn::{TurnRequest, TurnResponse};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use edem_content::{
    Archetype, ArchetypeProfiler, EmotionDetector, KeywordEmotionDetector, PracticeCatalog,
    RitualSelector, SceneSelector,
};
use edem_core::config::DialogueConfig;
use edem_core::flow;
use edem_core::{
    decide, EdemConfig, FsmOutcome, KeywordSafetyClassifier, KeywordSignalDetector, Locale,
    OnboardingFsm, Practice, RitualMemory, SafetyAssessment, SafetyClassifier, SafetyIncident,
    SessionRecord, SessionStore, SignalDetector, Stage, Step, TurnCommit, TurnInput, Voice,
};
use edem_memory::SessionGate;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Engine
// ============================================================================

pub struct DialogueEngine {
    config: DialogueConfig,
    incident_timeout: Duration,
    store: Arc<dyn SessionStore>,
    gate: SessionGate,

    // Heuristic strategies (swappable)
    safety: Arc<dyn SafetyClassifier>,
    signals: Arc<dyn SignalDetector>,
    emotions: Arc<dyn EmotionDetector>,

    // Content selectors
    scenes: SceneSelector,
    rituals: RitualSelector,
    profiler: ArchetypeProfiler,
    practices: PracticeCatalog,

    fsm: OnboardingFsm,
    composer: Composer,
}

/// Per-turn inputs shared by the handlers.
struct Turn<'a> {
    req: &'a TurnRequest,
    session_id: Uuid,
    /// Requested voice, or therapist when a clinical topic came up.
    voice: Voice,
    at: DateTime<FixedOffset>,
}

/// A handler's verdict: the reply and the rows to write with it.
struct Outcome {
    reply: Reply,
    update: Option<serde_json::Value>,
    ritual: Option<RitualMemory>,
    practice: Option<Practice>,
    /// Practice reports touch only the practice row; everything else commits.
    commit: bool,
}

impl Outcome {
    fn reply(reply: Reply, update: Option<serde_json::Value>) -> Self {
        Self {
            reply,
            update,
            ritual: None,
            practice: None,
            commit: true,
        }
    }
}

impl DialogueEngine {
    /// Engine with the keyword strategies and the given store.
    pub fn new(config: &EdemConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config: config.dialogue.clone(),
            incident_timeout: Duration::from_millis(config.safety.incident_timeout_ms),
            store,
            gate: SessionGate::new(),
            safety: Arc::new(KeywordSafetyClassifier::new(config.safety.clone())),
            signals: Arc::new(KeywordSignalDetector::new()),
            emotions: Arc::new(KeywordEmotionDetector::new()),
            scenes: SceneSelector::new(),
            rituals: RitualSelector::new(),
            profiler: ArchetypeProfiler::new(),
            practices: PracticeCatalog::new(),
            fsm: OnboardingFsm::new(),
            composer: Composer::new(config.dialogue.max_utterance_chars),
        }
    }

    pub fn with_safety_classifier(mut self, safety: Arc<dyn SafetyClassifier>) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_signal_detector(mut self, signals: Arc<dyn SignalDetector>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_emotion_detector(mut self, emotions: Arc<dyn EmotionDetector>) -> Self {
        self.emotions = emotions;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Process one turn. Never fails: errors become the fallback reply.
    pub async fn handle_turn(&self, req: TurnRequest) -> TurnResponse {
        let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);
        let _guard = self.gate.acquire(session_id).await;

        let assessment = self.safety.classify(&req.input.free_text(), req.locale);
        if !assessment.is_safe {
            return self.crisis_response(&req, session_id, assessment).await;
        }

        let voice = if assessment.should_switch_to_therapist {
            tracing::info!(session = %session_id, "clinical topic, answering in therapist voice");
            Voice::Therapist
        } else {
            req.voice
        };
        let turn = Turn {
            req: &req,
            session_id,
            voice,
            at: req.local_time.unwrap_or_else(|| Local::now().fixed_offset()),
        };

        match self.run_turn(&turn).await {
            Ok(outcome) => TurnResponse {
                next_step: outcome.reply.next_step,
                utterance: outcome.reply.utterance,
                update: outcome.update,
                buttons: outcome.reply.buttons,
                paywall: outcome.reply.paywall,
                session_id,
            },
            Err(e) => {
                tracing::error!(session = %session_id, "Turn failed: {:#}", e);
                self.fallback_response(session_id, voice, req.locale)
            }
        }
    }

    async fn run_turn(&self, turn: &Turn<'_>) -> Result<Outcome> {
        let req = turn.req;
        let stored = self
            .store
            .load_session(&req.owner, turn.session_id)
            .await
            .context("Failed to load session")?;

        let mut record = match stored {
            Some(record) => record,
            None => {
                let entry = if req.input.step().is_entry() {
                    req.input.step()
                } else {
                    Step::Mask
                };
                tracing::info!(session = %turn.session_id, owner = %req.owner, %entry, "New session");
                SessionRecord::new(req.owner.clone(), turn.session_id, entry)
            }
        };

        if record.step == Step::Close {
            tracing::info!(session = %turn.session_id, "Restarting intake after decline");
            flow::ensure_session_move(Step::Close, Step::Mask)?;
            record.restart_onboarding();
        }
        let from = record.step;

        let outcome = match record.step {
            step if step.is_onboarding() => self.intake_turn(turn, &mut record)?,
            Step::Paywall => self.paywall_turn(turn, &mut record),
            Step::Archetype => self.archetype_turn(turn, &mut record),
            Step::Shadow | Step::Truth | Step::Integration => match &req.input {
                TurnInput::PracticeReport {
                    practice_id,
                    self_report,
                    note,
                } => {
                    self.practice_report(turn, &record, *practice_id, *self_report, note.as_deref())
                        .await?
                }
                _ => self.stage_turn(turn, &mut record).await?,
            },
            other => bail!("Stored step {} is never persisted", other),
        };

        if !outcome.commit {
            return Ok(outcome);
        }

        flow::ensure_session_move(from, outcome.reply.next_step)?;
        record.step = outcome.reply.next_step;
        record.turn += 1;
        record.updated_at = Utc::now();
        let commit = TurnCommit {
            session: record,
            ritual: outcome.ritual.clone(),
            practice: outcome.practice.clone(),
        };
        self.store
            .commit_turn(&commit)
            .await
            .context("Failed to commit turn")?;
        Ok(outcome)
    }

    // ========================================================================
    // Intake
    // ========================================================================

    fn intake_turn(&self, turn: &Turn<'_>, record: &mut SessionRecord) -> Result<Outcome> {
        let current = record.step;
        let fsm_outcome = self.fsm.advance(
            current,
            &turn.req.input,
            &mut record.onboarding,
            turn.voice,
            turn.req.mode,
        )?;

        let next = fsm_outcome.next_step();
        let reply = match &fsm_outcome {
            FsmOutcome::Retry(step) | FsmOutcome::Next(step) => {
                let phrase =
                    Phrase::prompt_for(*step).ok_or_else(|| anyhow!("No prompt for {}", step))?;
                self.composer.compose(next, &phrase, turn.voice, turn.req.mode)
            }
            FsmOutcome::Closed => {
                self.composer
                    .compose(next, &Phrase::Decline, turn.voice, turn.req.mode)
            }
            FsmOutcome::TruthCut { text, .. } => self.composer.compose(
                next,
                &Phrase::TruthCut { text },
                turn.voice,
                turn.req.mode,
            ),
        };

        let mut update = json!({ "onboarding": record.onboarding });
        if let FsmOutcome::TruthCut { text, .. } = &fsm_outcome {
            update["truthCut"] = json!(text);
        }
        tracing::debug!(session = %turn.session_id, from = %current, to = %next, "Intake step");
        Ok(Outcome::reply(reply, Some(update)))
    }

    // ========================================================================
    // Gates
    // ========================================================================

    fn paywall_turn(&self, turn: &Turn<'_>, record: &mut SessionRecord) -> Outcome {
        if turn.req.mode == edem_core::Mode::Demo {
            let reply = self
                .composer
                .compose(Step::Paywall, &Phrase::Paywall, turn.voice, turn.req.mode);
            return Outcome::reply(reply, None);
        }

        // Pro from here on: reveal the archetype if intake led here, else resume the stage.
        if record.archetype.is_none() && record.onboarding.cost_agree == Some(true) {
            return self.archetype_turn(turn, record);
        }
        let step = record.state.stage.step();
        let phrase = Phrase::prompt_for(step).unwrap_or(Phrase::AskShadow);
        let reply = self.composer.compose(step, &phrase, turn.voice, turn.req.mode);
        Outcome::reply(reply, None)
    }

    fn archetype_turn(&self, turn: &Turn<'_>, record: &mut SessionRecord) -> Outcome {
        let existing = record.archetype.as_deref().and_then(Archetype::parse);
        let profile = self
            .profiler
            .profile(&record.onboarding.narrative(), existing);
        record.archetype = Some(profile.primary.as_str().to_string());

        let phrase = Phrase::ArchetypeReveal {
            label: profile.primary.label(),
            description: profile.primary.description(),
        };
        let reply = self
            .composer
            .compose(Step::Shadow, &phrase, turn.voice, turn.req.mode);
        let update = json!({
            "archetype": profile.primary.as_str(),
            "mentalStyle": profile.mental_style,
            "communicationCues": profile.communication_cues,
        });
        Outcome::reply(reply, Some(update))
    }

    // ========================================================================
    // Stage dialogue
    // ========================================================================

    async fn stage_turn(&self, turn: &Turn<'_>, record: &mut SessionRecord) -> Result<Outcome> {
        let text = turn
            .req
            .input
            .dialogue_text()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let Some(text) = text else {
            tracing::warn!(
                session = %turn.session_id,
                stored = %record.step,
                got = %turn.req.input.step(),
                "No dialogue text for the stored step, re-prompting"
            );
            let phrase = Phrase::prompt_for(record.step).unwrap_or(Phrase::AskShadow);
            let reply = self
                .composer
                .compose(record.step, &phrase, turn.voice, turn.req.mode);
            return Ok(Outcome::reply(reply, None));
        };

        let signals = self.signals.detect(text);
        let from = record.state.stage;
        let next = decide(&signals, from, record.state.shadow_streak);
        record.state.apply_turn(&signals, next);
        let emotion = self.emotions.detect(text);
        tracing::info!(
            session = %turn.session_id,
            %from,
            to = %next,
            streak = record.state.shadow_streak,
            emotion = emotion.as_str(),
            "Stage decided"
        );

        let mut update = json!({
            "stage": next.as_str(),
            "defensiveness": record.state.defensiveness,
            "acknowledgement": record.state.acknowledgement,
            "readiness": record.state.readiness,
            "shadowStreak": record.state.shadow_streak,
            "emotion": emotion.as_str(),
        });

        match next {
            Stage::Shadow => {
                let scene = self.scenes.select(emotion, &turn.at);
                let phrase = Phrase::ShadowMirror { echo: text, scene: &scene };
                let reply = self
                    .composer
                    .compose(Step::Shadow, &phrase, turn.voice, turn.req.mode);
                update["scene"] = json!(scene);
                Ok(Outcome::reply(reply, Some(update)))
            }
            Stage::Truth => {
                let existing = record.archetype.as_deref().and_then(Archetype::parse);
                let profile = self.profiler.profile(text, existing);
                record.archetype = Some(profile.primary.as_str().to_string());
                let pattern = record
                    .onboarding
                    .polarity
                    .map(|p| p.label())
                    .unwrap_or_else(|| emotion.label());
                let phrase = Phrase::TruthNaming {
                    pattern,
                    description: Some(profile.primary.description()),
                };
                let reply = self
                    .composer
                    .compose(Step::Truth, &phrase, turn.voice, turn.req.mode);
                update["archetype"] = json!(profile.primary.as_str());
                Ok(Outcome::reply(reply, Some(update)))
            }
            Stage::Integration => {
                let owner = &turn.req.owner;
                let recent: Vec<String> = self
                    .store
                    .recent_rituals(owner.id(), self.config.recent_ritual_window)
                    .await
                    .context("Failed to read ritual history")?
                    .into_iter()
                    .map(|r| r.ritual_text)
                    .collect();
                let ritual_text = self.rituals.select(emotion, owner.id(), &recent);

                let assigned: Vec<String> = self
                    .store
                    .session_practices(turn.session_id)
                    .await
                    .context("Failed to read session practices")?
                    .into_iter()
                    .map(|p| p.practice_key)
                    .collect();
                let def = self.practices.assign(emotion, &assigned);

                let now = Utc::now();
                let practice = Practice {
                    id: Uuid::new_v4(),
                    owner: owner.clone(),
                    session_id: turn.session_id,
                    practice_key: def.key.to_string(),
                    assigned_at: now,
                    due_at: now + chrono::Duration::days(self.config.practice_due_days),
                    done: false,
                    self_report: None,
                    note: None,
                };
                let ritual = RitualMemory {
                    user_id: owner.id().to_string(),
                    session_id: turn.session_id,
                    emotion: emotion.as_str().to_string(),
                    scene: self.scenes.select(emotion, &turn.at),
                    ritual_text: ritual_text.clone(),
                    user_input: text.to_string(),
                    timestamp: now,
                };

                let phrase = Phrase::IntegrationClose {
                    ritual: &ritual_text,
                    practice: def.instruction,
                };
                let reply = self
                    .composer
                    .compose(Step::Integration, &phrase, turn.voice, turn.req.mode);
                update["ritual"] = json!(ritual_text);
                update["practiceId"] = json!(practice.id);
                update["practiceKey"] = json!(def.key);
                update["dueAt"] = json!(practice.due_at);

                Ok(Outcome {
                    reply,
                    update: Some(update),
                    ritual: Some(ritual),
                    practice: Some(practice),
                    commit: true,
                })
            }
        }
    }

    async fn practice_report(
        &self,
        turn: &Turn<'_>,
        record: &SessionRecord,
        practice_id: Uuid,
        self_report: Option<u8>,
        note: Option<&str>,
    ) -> Result<Outcome> {
        let phrase = match self_report {
            Some(score) if score <= 10 => {
                let known = self
                    .store
                    .session_practices(turn.session_id)
                    .await
                    .context("Failed to read session practices")?
                    .iter()
                    .any(|p| p.id == practice_id);
                if !known {
                    tracing::warn!(session = %turn.session_id, %practice_id, "Report for unknown practice");
                    Phrase::PracticeUnknown
                } else if self
                    .store
                    .complete_practice(practice_id, score, note)
                    .await
                    .context("Failed to complete practice")?
                {
                    tracing::info!(session = %turn.session_id, %practice_id, score, "Practice completed");
                    Phrase::PracticeThanks
                } else {
                    Phrase::PracticeAlreadyDone
                }
            }
            _ => Phrase::AskSelfReport,
        };

        let mut reply =
            self.composer
                .compose(Step::PracticeReport, &phrase, turn.voice, turn.req.mode);
        if phrase != Phrase::AskSelfReport {
            reply.next_step = record.step;
        }
        let update = (phrase == Phrase::PracticeThanks)
            .then(|| json!({ "practiceId": practice_id, "done": true }));
        Ok(Outcome {
            reply,
            update,
            ritual: None,
            practice: None,
            commit: false,
        })
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    async fn crisis_response(
        &self,
        req: &TurnRequest,
        session_id: Uuid,
        assessment: SafetyAssessment,
    ) -> TurnResponse {
        tracing::warn!(
            session = %session_id,
            risk = %assessment.risk_level,
            "Safety override, skipping dialogue"
        );

        let incident = SafetyIncident {
            owner: req.owner.clone(),
            session_id,
            risk_level: assessment.risk_level,
            triggered_words: assessment.triggered_words.clone(),
            timestamp: Utc::now(),
        };
        match tokio::time::timeout(self.incident_timeout, self.store.record_incident(&incident)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Failed to record safety incident: {:#}", e),
            Err(_) => tracing::error!(
                "Recording safety incident timed out after {:?}",
                self.incident_timeout
            ),
        }

        let utterance = assessment
            .intervention
            .unwrap_or_else(|| self.composer.fallback(Voice::Therapist, req.locale));
        TurnResponse {
            next_step: Step::CrisisIntervention,
            utterance,
            update: Some(json!({
                "safetyTriggered": true,
                "riskLevel": assessment.risk_level.as_str(),
                "voiceOverride": Voice::Therapist.as_str(),
            })),
            buttons: None,
            paywall: false,
            session_id,
        }
    }

    fn fallback_response(&self, session_id: Uuid, voice: Voice, locale: Locale) -> TurnResponse {
        TurnResponse {
            next_step: Step::Error,
            utterance: self.composer.fallback(voice, locale),
            update: None,
            buttons: None,
            paywall: false,
            session_id,
        }
    }
}
