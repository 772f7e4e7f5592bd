use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use glassdesk_core::domain::session::{Channel, Session, SessionKey};
use glassdesk_core::errors::{ApplicationError, DomainError};

use crate::locks::{SessionGuard, SessionLocks};
use crate::repositories::{InMemorySessionRepository, RepositoryError, SessionRepository};

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Invariant(#[from] DomainError),
    #[error("could not encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<SessionStoreError> for ApplicationError {
    fn from(value: SessionStoreError) -> Self {
        match value {
            SessionStoreError::Invariant(error) => ApplicationError::Domain(error),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Owns every persisted conversation, one document per `(channel, user_id)`.
#[derive(Clone)]
pub struct SessionStore {
    repository: Arc<dyn SessionRepository>,
    ttl: Duration,
    locks: SessionLocks,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn SessionRepository>, ttl: Duration) -> Self {
        Self { repository, ttl, locks: SessionLocks::default() }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(InMemorySessionRepository::default()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serializes read-modify-write cycles for one key. Hold the guard for
    /// the whole cycle.
    pub async fn lock(&self, channel: Channel, user_id: &str) -> SessionGuard {
        self.locks.acquire(&SessionKey::new(channel, user_id)).await
    }

    /// Loads a session. Undecodable or inconsistent documents are discarded
    /// and reported as absent.
    pub async fn get(
        &self,
        channel: Channel,
        user_id: &str,
    ) -> Result<Option<Session>, SessionStoreError> {
        let key = SessionKey::new(channel, user_id);
        let Some(document) = self.repository.load(&key).await? else {
            return Ok(None);
        };

        match decode(&key, &document) {
            Ok(session) => Ok(Some(session)),
            Err(reason) => {
                warn!(
                    event_name = "session.discarded",
                    session_key = %key,
                    reason = %reason,
                    "discarding unusable session document"
                );
                self.repository.delete(&key).await?;
                Ok(None)
            }
        }
    }

    pub async fn get_or_create(
        &self,
        channel: Channel,
        user_id: &str,
    ) -> Result<Session, SessionStoreError> {
        if let Some(session) = self.get(channel, user_id).await? {
            return Ok(session);
        }

        let session = Session::new(channel, user_id);
        debug!(
            event_name = "session.created",
            session_key = %session.key(),
            session_id = %session.session_id.0,
            "created session"
        );
        self.save(&session).await?;
        Ok(session)
    }

    pub async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        session.validate()?;
        let document = serde_json::to_string(session)?;
        self.repository.store(&session.key(), document, self.ttl).await?;
        Ok(())
    }

    pub async fn delete(&self, channel: Channel, user_id: &str) -> Result<(), SessionStoreError> {
        self.repository.delete(&SessionKey::new(channel, user_id)).await?;
        Ok(())
    }

    /// Reinitialises a conversation, keeping its session id when one exists.
    pub async fn reset(
        &self,
        channel: Channel,
        user_id: &str,
    ) -> Result<Session, SessionStoreError> {
        let mut session = self.get_or_create(channel, user_id).await?;
        session.reset();
        self.save(&session).await?;
        Ok(session)
    }

    pub async fn purge_expired(&self) -> Result<u64, SessionStoreError> {
        Ok(self.repository.purge_expired().await?)
    }
}

fn decode(key: &SessionKey, document: &str) -> Result<Session, String> {
    let session: Session =
        serde_json::from_str(document).map_err(|error| format!("invalid json: {error}"))?;
    if &session.key() != key {
        return Err(format!("document belongs to {}", session.key()));
    }
    session.validate().map_err(|error| error.to_string())?;
    Ok(session)
}
