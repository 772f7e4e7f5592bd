use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use glassdesk_core::domain::session::SessionKey;

use super::{RepositoryError, SessionRepository};

struct Entry {
    document: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemorySessionRepository {
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn expiry_from(ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, RepositoryError> {
        let entries = self.entries.read().await;
        let now = Utc::now();
        Ok(entries
            .get(key.as_str())
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.document.clone()))
    }

    async fn store(
        &self,
        key: &SessionKey,
        document: String,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.as_str().to_string(), Entry { document, expires_at: expiry_from(ttl) });
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.remove(key.as_str());
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}
