use edem_core::{Owner, SessionRecord, SessionStore, Stage, Step, TurnCommit};
use edem_memory::SqliteStore;
use tempfile::TempDir;
use uuid::Uuid;

#[tokio::test]
async fn test_session_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("edem.db");
    let owner = Owner::User("persist".to_string());
    let session_id = Uuid::new_v4();

    {
        let store = SqliteStore::new(&db_path).await.unwrap();
        let mut record = SessionRecord::new(owner.clone(), session_id, Step::Truth);
        record.turn = 7;
        record.state.stage = Stage::Truth;
        record.state.acknowledgement = 2;
        store.commit_turn(&TurnCommit::session_only(record)).await.unwrap();
    }

    let store = SqliteStore::new(&db_path).await.unwrap();
    let loaded = store.load_session(&owner, session_id).await.unwrap().unwrap();
    assert_eq!(loaded.turn, 7);
    assert_eq!(loaded.step, Step::Truth);
    assert_eq!(loaded.state.stage, Stage::Truth);
    assert_eq!(loaded.state.acknowledgement, 2);
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("edem.db");
    for _ in 0..3 {
        SqliteStore::new(&db_path).await.unwrap();
    }
}
