use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::debug;

use super::ports::{states_match, AccessToken, Session, SessionKey, SessionStore, UserProfile};

struct PendingState {
    value: String,
    issued_at: Instant,
}

#[derive(Default)]
struct SessionRecord {
    pending: Option<PendingState>,
    session: Option<(Session, Instant)>,
}

/// Process-local session storage.
///
/// Records expire on their own clocks: pending OAuth state after `state_ttl`,
/// established sessions after `session_ttl`. Expired entries are invisible to
/// readers immediately and physically removed by [`SessionStore::purge_expired`].
pub struct InMemorySessionStore {
    records: RwLock<HashMap<SessionKey, SessionRecord>>,
    session_ttl: Duration,
    state_ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(session_ttl: Duration, state_ttl: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            session_ttl,
            state_ttl,
        }
    }

    fn pending_is_live(&self, pending: &PendingState) -> bool {
        pending.issued_at.elapsed() < self.state_ttl
    }

    fn session_is_live(&self, saved_at: Instant) -> bool {
        saved_at.elapsed() < self.session_ttl
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save_pending_state(&self, key: &SessionKey, state: String) {
        let mut records = self.records.write().await;
        records.entry(*key).or_default().pending = Some(PendingState {
            value: state,
            issued_at: Instant::now(),
        });
    }

    async fn take_pending_state(&self, key: &SessionKey) -> Option<String> {
        let mut records = self.records.write().await;
        let record = records.get_mut(key)?;
        let pending = record.pending.take();
        if record.session.is_none() {
            records.remove(key);
        }

        let pending = pending?;
        if self.pending_is_live(&pending) {
            Some(pending.value)
        } else {
            debug!("Discarding expired OAuth state");
            None
        }
    }

    async fn take_matching_state(&self, key: &SessionKey, returned: &str) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(key) else {
            return false;
        };

        let matches = record.pending.as_ref().is_some_and(|pending| {
            self.pending_is_live(pending) && states_match(&pending.value, returned)
        });
        if matches {
            record.pending = None;
            if record.session.is_none() {
                records.remove(key);
            }
        }
        matches
    }

    async fn save(
        &self,
        key: &SessionKey,
        access_token: AccessToken,
        profile: UserProfile,
    ) -> Session {
        let session = Session {
            access_token,
            profile,
            created_at: Utc::now(),
        };

        let mut records = self.records.write().await;
        let record = records.entry(*key).or_default();
        record.pending = None;
        record.session = Some((session.clone(), Instant::now()));
        session
    }

    async fn load(&self, key: &SessionKey) -> Option<Session> {
        let records = self.records.read().await;
        let (session, saved_at) = records.get(key)?.session.as_ref()?;
        self.session_is_live(*saved_at).then(|| session.clone())
    }

    async fn clear(&self, key: &SessionKey) {
        self.records.write().await.remove(key);
    }

    async fn purge_expired(&self) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();

        records.retain(|_, record| {
            if record
                .pending
                .as_ref()
                .is_some_and(|pending| !self.pending_is_live(pending))
            {
                record.pending = None;
            }
            if record
                .session
                .as_ref()
                .is_some_and(|(_, saved_at)| !self.session_is_live(*saved_at))
            {
                record.session = None;
            }
            record.pending.is_some() || record.session.is_some()
        });

        before - records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            login: "octocat".to_string(),
            display_name: Some("The Octocat".to_string()),
            avatar_url: None,
            email: None,
        }
    }

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(3600), Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_pending_state_can_only_be_taken_once() {
        let store = store();
        let key = SessionKey::generate();

        store.save_pending_state(&key, "abc".to_string()).await;

        assert_eq!(store.take_pending_state(&key).await.as_deref(), Some("abc"));
        assert_eq!(store.take_pending_state(&key).await, None);
    }

    #[tokio::test]
    async fn test_matching_take_leaves_state_on_mismatch() {
        let store = store();
        let key = SessionKey::generate();

        store.save_pending_state(&key, "abc".to_string()).await;

        assert!(!store.take_matching_state(&key, "forged").await);
        assert!(store.take_matching_state(&key, "abc").await);
        assert!(!store.take_matching_state(&key, "abc").await);
        assert_eq!(store.take_pending_state(&key).await, None);
    }

    #[tokio::test]
    async fn test_newer_pending_state_replaces_older() {
        let store = store();
        let key = SessionKey::generate();

        store.save_pending_state(&key, "first".to_string()).await;
        store.save_pending_state(&key, "second".to_string()).await;

        assert_eq!(store.take_pending_state(&key).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_expired_pending_state_is_not_returned() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600), Duration::ZERO);
        let key = SessionKey::generate();

        store.save_pending_state(&key, "abc".to_string()).await;

        assert_eq!(store.take_pending_state(&key).await, None);
    }

    #[tokio::test]
    async fn test_save_then_load_returns_session() {
        let store = store();
        let key = SessionKey::generate();

        let saved = store.save(&key, AccessToken::new("gho_1"), profile()).await;
        let loaded = store.load(&key).await.unwrap();

        assert_eq!(loaded, saved);
        assert_eq!(loaded.access_token.secret(), "gho_1");
        assert_eq!(store.load(&SessionKey::generate()).await, None);
    }

    #[tokio::test]
    async fn test_clear_removes_session_and_pending_state() {
        let store = store();
        let key = SessionKey::generate();

        store.save(&key, AccessToken::new("gho_1"), profile()).await;
        store.save_pending_state(&key, "abc".to_string()).await;
        store.clear(&key).await;

        assert_eq!(store.load(&key).await, None);
        assert_eq!(store.take_pending_state(&key).await, None);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_hidden_and_purged() {
        let store = InMemorySessionStore::new(Duration::ZERO, Duration::from_secs(600));
        let expired = SessionKey::generate();
        let pending = SessionKey::generate();

        store.save(&expired, AccessToken::new("gho_1"), profile()).await;
        store.save_pending_state(&pending, "abc".to_string()).await;

        assert_eq!(store.load(&expired).await, None);
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.take_pending_state(&pending).await.as_deref(), Some("abc"));
    }
}
