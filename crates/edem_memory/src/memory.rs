//! Process-local [`SessionStore`] for ephemeral runs and tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use edem_core::{
    Owner, Practice, RitualMemory, SafetyIncident, SessionRecord, SessionStore, TurnCommit,
};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// Append-only rows per session, oldest first.
    sessions: HashMap<Uuid, Vec<SessionRecord>>,
    rituals: Vec<RitualMemory>,
    practices: Vec<Practice>,
    incidents: Vec<SafetyIncident>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn incidents(&self) -> Vec<SafetyIncident> {
        self.inner.lock().await.incidents.clone()
    }

    /// Every row committed for a session, oldest first.
    pub async fn session_history(&self, session_id: Uuid) -> Vec<SessionRecord> {
        self.inner
            .lock()
            .await
            .sessions
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load_session(&self, owner: &Owner, session_id: Uuid) -> Result<Option<SessionRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .get(&session_id)
            .and_then(|rows| rows.last())
            .filter(|row| &row.owner == owner)
            .cloned())
    }

    async fn commit_turn(&self, commit: &TurnCommit) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let rows = inner.sessions.entry(commit.session.session_id).or_default();
        if rows.iter().any(|row| row.turn == commit.session.turn) {
            bail!(
                "Turn {} already committed for session {}",
                commit.session.turn,
                commit.session.session_id
            );
        }
        rows.push(commit.session.clone());
        if let Some(ritual) = &commit.ritual {
            inner.rituals.push(ritual.clone());
        }
        if let Some(practice) = &commit.practice {
            inner.practices.push(practice.clone());
        }
        Ok(())
    }

    async fn recent_rituals(&self, user_id: &str, limit: usize) -> Result<Vec<RitualMemory>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rituals
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn session_practices(&self, session_id: Uuid) -> Result<Vec<Practice>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .practices
            .iter()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn complete_practice(
        &self,
        practice_id: Uuid,
        self_report: u8,
        note: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.practices.iter_mut().find(|p| p.id == practice_id && !p.done) {
            Some(practice) => {
                practice.done = true;
                practice.self_report = Some(self_report);
                practice.note = note.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_incident(&self, incident: &SafetyIncident) -> Result<()> {
        self.inner.lock().await.incidents.push(incident.clone());
        Ok(())
    }
}
