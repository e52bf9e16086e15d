use crate::{InMemoryStore, SqliteStore};
use chrono::{Duration, Utc};
use edem_core::safety::RiskLevel;
use edem_core::{
    Owner, Polarity, Practice, RitualMemory, SafetyIncident, SessionRecord, SessionStore, Stage,
    Step, TurnCommit,
};
use uuid::Uuid;

fn owner() -> Owner {
    Owner::User("u-1".to_string())
}

fn ritual(session_id: Uuid, text: &str, offset_secs: i64) -> RitualMemory {
    RitualMemory {
        user_id: "u-1".to_string(),
        session_id,
        emotion: "anxiety".to_string(),
        scene: "туман над полем".to_string(),
        ritual_text: text.to_string(),
        user_input: "мне тревожно".to_string(),
        timestamp: Utc::now() + Duration::seconds(offset_secs),
    }
}

fn practice(session_id: Uuid) -> Practice {
    let now = Utc::now();
    Practice {
        id: Uuid::new_v4(),
        owner: owner(),
        session_id,
        practice_key: "body_scan".to_string(),
        assigned_at: now,
        due_at: now + Duration::days(3),
        done: false,
        self_report: None,
        note: None,
    }
}

/// Runs the same contract checks against any store.
async fn exercise_store(store: &dyn SessionStore) {
    let session_id = Uuid::new_v4();
    assert!(store.load_session(&owner(), session_id).await.unwrap().is_none());

    // First row
    let mut record = SessionRecord::new(owner(), session_id, Step::Trigger);
    record.turn = 1;
    record.onboarding.mask = Some("лидер".to_string());
    store.commit_turn(&TurnCommit::session_only(record.clone())).await.unwrap();

    // Second row wins
    let mut next = record.clone();
    next.turn = 2;
    next.step = Step::Shadow;
    next.onboarding.polarity = Some(Polarity::Shame);
    next.state.stage = Stage::Shadow;
    next.state.shadow_streak = 2;
    next.archetype = Some("ruler".to_string());
    let p = practice(session_id);
    let commit = TurnCommit {
        session: next.clone(),
        ritual: Some(ritual(session_id, "r1", 0)),
        practice: Some(p.clone()),
    };
    store.commit_turn(&commit).await.unwrap();

    let loaded = store.load_session(&owner(), session_id).await.unwrap().unwrap();
    assert_eq!(loaded.turn, 2);
    assert_eq!(loaded.step, Step::Shadow);
    assert_eq!(loaded.state, next.state);
    assert_eq!(loaded.onboarding, next.onboarding);
    assert_eq!(loaded.archetype.as_deref(), Some("ruler"));

    // Another owner never sees it
    let stranger = Owner::Guest("u-1".to_string());
    assert!(store.load_session(&stranger, session_id).await.unwrap().is_none());

    // Re-committing an existing turn is rejected and changes nothing
    let mut dup = next.clone();
    dup.step = Step::Truth;
    assert!(store.commit_turn(&TurnCommit::session_only(dup)).await.is_err());
    let loaded = store.load_session(&owner(), session_id).await.unwrap().unwrap();
    assert_eq!(loaded.step, Step::Shadow);

    // Practices complete exactly once
    let practices = store.session_practices(session_id).await.unwrap();
    assert_eq!(practices.len(), 1);
    assert!(!practices[0].done);
    assert!(store.complete_practice(p.id, 7, Some("помогло")).await.unwrap());
    assert!(!store.complete_practice(p.id, 9, None).await.unwrap());
    assert!(!store.complete_practice(Uuid::new_v4(), 5, None).await.unwrap());
    let practices = store.session_practices(session_id).await.unwrap();
    assert!(practices[0].done);
    assert_eq!(practices[0].self_report, Some(7));
    assert_eq!(practices[0].note.as_deref(), Some("помогло"));

    store
        .record_incident(&SafetyIncident {
            owner: owner(),
            session_id,
            risk_level: RiskLevel::High,
            triggered_words: vec!["не хочу жить".to_string()],
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    let store = SqliteStore::new(":memory:").await.expect("Failed to create store");
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_in_memory_store_contract() {
    let store = InMemoryStore::new();
    exercise_store(&store).await;
    assert_eq!(store.incidents().await.len(), 1);
}

#[tokio::test]
async fn test_recent_rituals_newest_first_and_limited() {
    let store = SqliteStore::new(":memory:").await.unwrap();
    let session_id = Uuid::new_v4();
    for (turn, text) in ["r1", "r2", "r3", "r4"].iter().enumerate() {
        let mut record = SessionRecord::new(owner(), session_id, Step::Integration);
        record.turn = turn as u32 + 1;
        let commit = TurnCommit {
            session: record,
            ritual: Some(ritual(session_id, text, turn as i64)),
            practice: None,
        };
        store.commit_turn(&commit).await.unwrap();
    }

    let recent = store.recent_rituals("u-1", 3).await.unwrap();
    let texts: Vec<&str> = recent.iter().map(|r| r.ritual_text.as_str()).collect();
    assert_eq!(texts, vec!["r4", "r3", "r2"]);
    assert!(store.recent_rituals("someone-else", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_commit_writes_nothing() {
    let store = SqliteStore::new(":memory:").await.unwrap();
    let session_id = Uuid::new_v4();
    let mut record = SessionRecord::new(owner(), session_id, Step::Shadow);
    record.turn = 1;
    store.commit_turn(&TurnCommit::session_only(record.clone())).await.unwrap();

    // Same turn number: the session insert fails, so the ritual must not land either.
    let commit = TurnCommit {
        session: record,
        ritual: Some(ritual(session_id, "orphan", 0)),
        practice: Some(practice(session_id)),
    };
    assert!(store.commit_turn(&commit).await.is_err());
    assert!(store.recent_rituals("u-1", 10).await.unwrap().is_empty());
    assert!(store.session_practices(session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_incidents_round_trip() {
    let store = SqliteStore::new(":memory:").await.unwrap();
    let session_id = Uuid::new_v4();
    store
        .record_incident(&SafetyIncident {
            owner: Owner::Guest("g-9".to_string()),
            session_id,
            risk_level: RiskLevel::Medium,
            triggered_words: vec!["всё бессмысленно".to_string()],
            timestamp: Utc::now(),
        })
        .await
        .unwrap();

    let incidents = store.session_incidents(session_id).await.unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].owner, Owner::Guest("g-9".to_string()));
    assert_eq!(incidents[0].risk_level, RiskLevel::Medium);
    assert_eq!(incidents[0].triggered_words, vec!["всё бессмысленно".to_string()]);
}
