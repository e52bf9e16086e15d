use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edem_core::safety::RiskLevel;
use edem_core::{
    OnboardingData, Owner, Practice, RitualMemory, SafetyIncident, SessionRecord, SessionState,
    SessionStore, Stage, Step, TurnCommit,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, Transaction};
use std::path::Path;
use uuid::Uuid;

/// SQLite-backed [`SessionStore`].
///
/// Session rows are append-only: every committed turn inserts a new row with
/// the next `turn` number, and `(session_id, turn)` is unique, so two commits
/// racing from the same base row cannot both land.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let in_memory = path.as_os_str() == ":memory:";
        let db_url = format!("sqlite://{}?mode=rwc", path.display());

        // Every connection to :memory: is a separate database, so pin one.
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = options
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("Session store ready at {}", path.display());
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_state (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                owner_kind TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                turn INTEGER NOT NULL,
                step TEXT NOT NULL,
                stage TEXT NOT NULL,
                defensiveness INTEGER NOT NULL,
                acknowledgement INTEGER NOT NULL,
                readiness INTEGER NOT NULL,
                shadow_streak INTEGER NOT NULL,
                onboarding_json TEXT NOT NULL,
                archetype TEXT,
                updated_at INTEGER NOT NULL,
                UNIQUE (session_id, turn)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create session_state table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_session_state_owner ON session_state(owner_kind, owner_id)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create session_state owner index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ritual_memory (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                emotion TEXT NOT NULL,
                scene TEXT NOT NULL,
                ritual_text TEXT NOT NULL,
                user_input TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create ritual_memory table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ritual_memory_user ON ritual_memory(user_id, timestamp)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create ritual_memory user index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS practices (
                id TEXT PRIMARY KEY,
                owner_kind TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                practice_key TEXT NOT NULL,
                assigned_at INTEGER NOT NULL,
                due_at INTEGER NOT NULL,
                done INTEGER NOT NULL DEFAULT 0,
                self_report INTEGER,
                note TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create practices table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_practices_session ON practices(session_id)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create practices session index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS safety_incidents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_kind TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                triggered_words_json TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create safety_incidents table")?;

        Ok(())
    }

    async fn insert_session(tx: &mut Transaction<'_, Sqlite>, record: &SessionRecord) -> Result<()> {
        let onboarding_json = serde_json::to_string(&record.onboarding)
            .context("Failed to serialize onboarding data")?;
        sqlx::query(
            r#"
            INSERT INTO session_state (
                session_id, owner_kind, owner_id, turn, step, stage,
                defensiveness, acknowledgement, readiness, shadow_streak,
                onboarding_json, archetype, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.session_id.to_string())
        .bind(record.owner.kind())
        .bind(record.owner.id())
        .bind(i64::from(record.turn))
        .bind(record.step.as_str())
        .bind(record.state.stage.as_str())
        .bind(i64::from(record.state.defensiveness))
        .bind(i64::from(record.state.acknowledgement))
        .bind(i64::from(record.state.readiness))
        .bind(i64::from(record.state.shadow_streak))
        .bind(&onboarding_json)
        .bind(record.archetype.as_deref())
        .bind(record.updated_at.timestamp_millis())
        .execute(&mut **tx)
        .await
        .context("Failed to insert session row")?;
        Ok(())
    }

    async fn insert_ritual(tx: &mut Transaction<'_, Sqlite>, ritual: &RitualMemory) -> Result<()> {
        sqlx::query(
            "INSERT INTO ritual_memory (user_id, session_id, emotion, scene, ritual_text, user_input, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ritual.user_id)
        .bind(ritual.session_id.to_string())
        .bind(&ritual.emotion)
        .bind(&ritual.scene)
        .bind(&ritual.ritual_text)
        .bind(&ritual.user_input)
        .bind(ritual.timestamp.timestamp_millis())
        .execute(&mut **tx)
        .await
        .context("Failed to insert ritual memory")?;
        Ok(())
    }

    async fn insert_practice(tx: &mut Transaction<'_, Sqlite>, practice: &Practice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO practices (
                id, owner_kind, owner_id, session_id, practice_key,
                assigned_at, due_at, done, self_report, note
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(practice.id.to_string())
        .bind(practice.owner.kind())
        .bind(practice.owner.id())
        .bind(practice.session_id.to_string())
        .bind(&practice.practice_key)
        .bind(practice.assigned_at.timestamp_millis())
        .bind(practice.due_at.timestamp_millis())
        .bind(practice.done)
        .bind(practice.self_report.map(i64::from))
        .bind(practice.note.as_deref())
        .execute(&mut **tx)
        .await
        .context("Failed to insert practice")?;
        Ok(())
    }
}

// =============================================================================
// Row decoding
// =============================================================================

fn millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("Invalid timestamp {}", ms))
}

fn score(row: &SqliteRow, column: &str) -> Result<u8> {
    let raw: i64 = row.get(column);
    u8::try_from(raw).with_context(|| format!("Column {} out of range: {}", column, raw))
}

fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.get(column);
    Uuid::parse_str(&raw).with_context(|| format!("Invalid uuid in {}: {}", column, raw))
}

fn owner_columns(row: &SqliteRow) -> Owner {
    let kind: String = row.get("owner_kind");
    Owner::from_parts(&kind, row.get("owner_id"))
}

fn session_from_row(row: &SqliteRow) -> Result<SessionRecord> {
    let step_raw: String = row.get("step");
    let stage_raw: String = row.get("stage");
    let onboarding_json: String = row.get("onboarding_json");
    let turn: i64 = row.get("turn");

    Ok(SessionRecord {
        owner: owner_columns(row),
        session_id: uuid_column(row, "session_id")?,
        step: Step::parse(&step_raw).with_context(|| format!("Unknown step {}", step_raw))?,
        state: SessionState {
            stage: Stage::parse(&stage_raw)
                .with_context(|| format!("Unknown stage {}", stage_raw))?,
            defensiveness: score(row, "defensiveness")?,
            acknowledgement: score(row, "acknowledgement")?,
            readiness: score(row, "readiness")?,
            shadow_streak: score(row, "shadow_streak")?,
        },
        onboarding: serde_json::from_str::<OnboardingData>(&onboarding_json)
            .context("Failed to deserialize onboarding data")?,
        archetype: row.get("archetype"),
        turn: u32::try_from(turn).context("Turn counter out of range")?,
        updated_at: millis(row.get("updated_at"))?,
    })
}

fn practice_from_row(row: &SqliteRow) -> Result<Practice> {
    let self_report: Option<i64> = row.get("self_report");
    Ok(Practice {
        id: uuid_column(row, "id")?,
        owner: owner_columns(row),
        session_id: uuid_column(row, "session_id")?,
        practice_key: row.get("practice_key"),
        assigned_at: millis(row.get("assigned_at"))?,
        due_at: millis(row.get("due_at"))?,
        done: row.get("done"),
        self_report: self_report
            .map(u8::try_from)
            .transpose()
            .context("Self report out of range")?,
        note: row.get("note"),
    })
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn load_session(&self, owner: &Owner, session_id: Uuid) -> Result<Option<SessionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM session_state
            WHERE session_id = ? AND owner_kind = ? AND owner_id = ?
            ORDER BY turn DESC
            LIMIT 1
            "#,
        )
        .bind(session_id.to_string())
        .bind(owner.kind())
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query session_state")?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn commit_turn(&self, commit: &TurnCommit) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin turn transaction")?;

        Self::insert_session(&mut tx, &commit.session).await?;
        if let Some(ritual) = &commit.ritual {
            Self::insert_ritual(&mut tx, ritual).await?;
        }
        if let Some(practice) = &commit.practice {
            Self::insert_practice(&mut tx, practice).await?;
        }

        tx.commit().await.context("Failed to commit turn")?;
        tracing::debug!(
            session = %commit.session.session_id,
            turn = commit.session.turn,
            step = commit.session.step.as_str(),
            "Turn committed"
        );
        Ok(())
    }

    async fn recent_rituals(&self, user_id: &str, limit: usize) -> Result<Vec<RitualMemory>> {
        let rows = sqlx::query(
            "SELECT * FROM ritual_memory WHERE user_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("Failed to query ritual_memory")?;

        rows.iter()
            .map(|row| {
                Ok(RitualMemory {
                    user_id: row.get("user_id"),
                    session_id: uuid_column(row, "session_id")?,
                    emotion: row.get("emotion"),
                    scene: row.get("scene"),
                    ritual_text: row.get("ritual_text"),
                    user_input: row.get("user_input"),
                    timestamp: millis(row.get("timestamp"))?,
                })
            })
            .collect()
    }

    async fn session_practices(&self, session_id: Uuid) -> Result<Vec<Practice>> {
        let rows = sqlx::query("SELECT * FROM practices WHERE session_id = ? ORDER BY assigned_at ASC")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to query practices")?;

        rows.iter().map(practice_from_row).collect()
    }

    async fn complete_practice(
        &self,
        practice_id: Uuid,
        self_report: u8,
        note: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE practices SET done = 1, self_report = ?, note = ? WHERE id = ? AND done = 0",
        )
        .bind(i64::from(self_report))
        .bind(note)
        .bind(practice_id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to complete practice")?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_incident(&self, incident: &SafetyIncident) -> Result<()> {
        let words = serde_json::to_string(&incident.triggered_words)
            .context("Failed to serialize triggered words")?;
        sqlx::query(
            "INSERT INTO safety_incidents (owner_kind, owner_id, session_id, risk_level, triggered_words_json, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(incident.owner.kind())
        .bind(incident.owner.id())
        .bind(incident.session_id.to_string())
        .bind(incident.risk_level.as_str())
        .bind(&words)
        .bind(incident.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to record safety incident")?;
        Ok(())
    }
}

impl SqliteStore {
    /// Incidents for a session, oldest first.
    pub async fn session_incidents(&self, session_id: Uuid) -> Result<Vec<SafetyIncident>> {
        let rows = sqlx::query("SELECT * FROM safety_incidents WHERE session_id = ? ORDER BY id ASC")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to query safety_incidents")?;

        rows.iter()
            .map(|row| {
                let level: String = row.get("risk_level");
                let words: String = row.get("triggered_words_json");
                Ok(SafetyIncident {
                    owner: owner_columns(row),
                    session_id: uuid_column(row, "session_id")?,
                    risk_level: RiskLevel::parse(&level)
                        .with_context(|| format!("Unknown risk level {}", level))?,
                    triggered_words: serde_json::from_str(&words)
                        .context("Failed to deserialize triggered words")?,
                    timestamp: millis(row.get("timestamp"))?,
                })
            })
            .collect()
    }
}
