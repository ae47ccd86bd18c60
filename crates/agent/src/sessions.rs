use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::conversation::CollectionSession;

pub type SharedSession = Arc<Mutex<CollectionSession>>;

struct SessionEntry {
    session: SharedSession,
    last_active: Instant,
}

/// Process-lifetime registry of live sessions.
///
/// The registry lock is only held for map operations. Turns lock the
/// individual session, so one slow turn never stalls other sessions.
#[derive(Default)]
pub struct SessionStore {
    entries: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: CollectionSession) -> SharedSession {
        let id = session.id().to_string();
        let shared = Arc::new(Mutex::new(session));
        self.entries
            .write()
            .await
            .insert(id, SessionEntry { session: shared.clone(), last_active: Instant::now() });
        shared
    }

    /// Looks a session up and marks it as active.
    pub async fn get(&self, session_id: &str) -> Option<SharedSession> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(session_id)?;
        entry.last_active = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.entries.write().await.remove(session_id).is_some()
    }

    /// Drops sessions whose last activity is at least `max_idle` ago and
    /// returns how many were removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(Instant::now(), max_idle).await
    }

    async fn evict_idle_at(&self, now: Instant, max_idle: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.last_active) < max_idle);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
