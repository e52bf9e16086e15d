use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Serializes turns per session.
///
/// Each session gets its own async mutex; the guard returned by
/// [`SessionGate::acquire`] is held for the whole turn. Turns on different
/// sessions never wait on each other.
#[derive(Default)]
pub struct SessionGate {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries only the map still references belong to no in-flight turn.
            locks.retain(|id, lock| *id == session_id || Arc::strong_count(lock) > 1);
            locks
                .entry(session_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Sessions currently tracked by the gate.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_session_is_serialized() {
        let gate = Arc::new(SessionGate::new());
        let session = Uuid::new_v4();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = gate.acquire(session).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_contend() {
        let gate = SessionGate::new();
        let _a = gate.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), gate.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let gate = SessionGate::new();
        for _ in 0..5 {
            let _guard = gate.acquire(Uuid::new_v4()).await;
        }
        let _held = gate.acquire(Uuid::new_v4()).await;
        assert_eq!(gate.tracked(), 1);
    }
}
