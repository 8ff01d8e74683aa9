//! Session store — in-memory sessions with per-user serialization and TTL sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::flow::session::Session;
use crate::registry::StepId;

/// In-memory session store keyed by user id.
///
/// Alongside the sessions it keeps one async mutex per user. Every mutating
/// path, event handling and sweep eviction alike, takes that guard for the
/// whole read-mutate-save sequence, so events for one user apply strictly in
/// arrival order while different users proceed in parallel.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    /// Create a new, empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            guards: Mutex::new(HashMap::new()),
        })
    }

    /// Acquire the serialization guard for one user.
    ///
    /// The guard is owned, so callers can hold it across the awaits of a
    /// full engine pass. The guards map itself is only locked long enough
    /// to clone the per-user mutex out of it.
    pub async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let guard = {
            let mut guards = self.guards.lock().await;
            Arc::clone(guards.entry(user_id.to_string()).or_default())
        };
        guard.lock_owned().await
    }

    /// Fetch a clone of a user's session, if one exists.
    pub async fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.read().await.get(user_id).cloned()
    }

    /// Fetch a user's session, creating a fresh one at `first_step` if absent.
    pub async fn get_or_create(&self, user_id: &str, first_step: StepId) -> Session {
        if let Some(session) = self.get(user_id).await {
            return session;
        }
        let session = Session::new(user_id, first_step);
        self.sessions
            .write()
            .await
            .insert(user_id.to_string(), session.clone());
        debug!(user_id, step = %first_step, "Created session");
        session
    }

    /// Persist a session, replacing any previous one for the same user.
    pub async fn save(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.user_id.clone(), session);
    }

    /// Drop a user's session. Returns it if one existed.
    pub async fn remove(&self, user_id: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(user_id);
        if removed.is_some() {
            debug!(user_id, "Removed session");
        }
        removed
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Evict sessions idle for at least `ttl`. Returns the eviction count.
    ///
    /// Candidates are collected under a read lock, then each one is
    /// re-checked under its user guard before removal, so a sweep never
    /// yanks a session out from under an in-flight event.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let candidates: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| s.idle_longer_than(ttl))
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut evicted = 0;
        for user_id in candidates {
            let _guard = self.lock_user(&user_id).await;
            let mut sessions = self.sessions.write().await;
            if sessions
                .get(&user_id)
                .is_some_and(|s| s.idle_longer_than(ttl))
            {
                sessions.remove(&user_id);
                evicted += 1;
                debug!(user_id = %user_id, "Evicted idle session");
            }
        }

        // Prune guards for users with no session and no waiter.
        {
            let sessions = self.sessions.read().await;
            let mut guards = self.guards.lock().await;
            guards.retain(|id, guard| sessions.contains_key(id) || Arc::strong_count(guard) > 1);
        }

        if evicted > 0 {
            info!(count = evicted, "Evicted idle sessions");
        }
        evicted
    }
}

/// Spawn a background task that periodically sweeps idle sessions.
pub fn spawn_sweep_task(
    store: Arc<SessionStore>,
    ttl: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so a freshly
        // started bot does not sweep an empty map.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.sweep_expired(ttl).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn get_or_create_round_trip() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let created = store.get_or_create("42", StepId::Category).await;
        assert_eq!(created.current_step(), Some(StepId::Category));
        assert_eq!(store.len().await, 1);

        // Second call returns the existing session, not a fresh one.
        let fetched = store.get_or_create("42", StepId::Category).await;
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn save_replaces() {
        let store = SessionStore::new();
        let mut session = store.get_or_create("42", StepId::Category).await;
        session
            .accept_answer("rent_apartment", Some(StepId::Rooms))
            .unwrap();
        store.save(session).await;

        let fetched = store.get("42").await.unwrap();
        assert_eq!(fetched.current_step(), Some(StepId::Rooms));
    }

    #[tokio::test]
    async fn remove_session() {
        let store = SessionStore::new();
        store.get_or_create("42", StepId::Category).await;

        assert!(store.remove("42").await.is_some());
        assert!(store.get("42").await.is_none());
        assert!(store.remove("42").await.is_none());
    }

    #[tokio::test]
    async fn sweep_evicts_only_idle() {
        let store = SessionStore::new();
        let mut stale = store.get_or_create("stale", StepId::Category).await;
        stale.last_activity_at = Utc::now() - chrono::Duration::seconds(3600);
        store.save(stale).await;
        store.get_or_create("fresh", StepId::Category).await;

        let evicted = store.sweep_expired(Duration::from_secs(1800)).await;
        assert_eq!(evicted, 1);
        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn sweep_skips_session_touched_after_candidate_scan() {
        let store = SessionStore::new();
        let mut session = store.get_or_create("42", StepId::Category).await;
        session.last_activity_at = Utc::now() - chrono::Duration::seconds(3600);
        store.save(session).await;

        // An event lands between the scan and the eviction: the re-check
        // under the guard sees the fresh activity and leaves the session.
        let mut touched = store.get("42").await.unwrap();
        touched.touch();
        store.save(touched).await;

        let evicted = store.sweep_expired(Duration::from_secs(1800)).await;
        assert_eq!(evicted, 0);
        assert!(store.get("42").await.is_some());
    }

    #[tokio::test]
    async fn per_user_guard_serializes() {
        let store = SessionStore::new();

        let first = store.lock_user("42").await;
        // A second lock for the same user must wait for the first.
        let store2 = Arc::clone(&store);
        let pending = tokio::spawn(async move {
            let _guard = store2.lock_user("42").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("guard released")
            .expect("task completed");
    }

    #[tokio::test]
    async fn guards_for_different_users_are_independent() {
        let store = SessionStore::new();
        let _a = store.lock_user("a").await;

        // Locking another user's guard must not block.
        tokio::time::timeout(Duration::from_millis(100), store.lock_user("b"))
            .await
            .expect("other user's guard is free");
    }

    #[tokio::test]
    async fn sweep_prunes_orphan_guards() {
        let store = SessionStore::new();
        drop(store.lock_user("gone").await);
        let _held = store.lock_user("waiting").await;

        store.sweep_expired(Duration::from_secs(1800)).await;

        let guards = store.guards.lock().await;
        assert!(!guards.contains_key("gone"));
        // A guard still held by a caller survives even without a session.
        assert!(guards.contains_key("waiting"));
    }
}
