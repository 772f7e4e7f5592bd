pub mod connection;
pub mod locks;
pub mod migrations;
pub mod repositories;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use locks::{SessionGuard, SessionLocks};
pub use repositories::{
    InMemorySessionRepository, RepositoryError, SessionRepository, SqlSessionRepository,
};
pub use store::{SessionStore, SessionStoreError};
