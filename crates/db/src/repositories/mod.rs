use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use glassdesk_core::domain::session::SessionKey;

pub mod memory;
pub mod session;

pub use memory::InMemorySessionRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Raw storage for serialized session documents.
///
/// Implementations hide expired documents from `load`; decoding and
/// invariant checks are left to the caller.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, key: &SessionKey) -> Result<Option<String>, RepositoryError>;
    async fn store(
        &self,
        key: &SessionKey,
        document: String,
        ttl: Duration,
    ) -> Result<(), RepositoryError>;
    async fn delete(&self, key: &SessionKey) -> Result<(), RepositoryError>;
    async fn purge_expired(&self) -> Result<u64, RepositoryError>;
}
