//! Core data layer for Clevera.
//! Mirrors a user's profile and study catalog from a remote document store
//! into local state, and writes user mutations back through it.

pub mod auth;
pub mod config;
pub mod logging;
pub mod model;
pub mod provider;
pub mod store;

pub use auth::{AuthService, IdentitySink, MemoryAuth};
pub use config::{ConfigError, SyncConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::catalog::{SetId, StudySet, Term, TermId, Topic, TopicId};
pub use model::profile::{Identity, LevelProgress, Profile, UserId};
pub use provider::catalog::{CatalogProvider, MoveOutcome};
pub use provider::identity::{IdentityProvider, IdentityState};
pub use provider::session::SyncSession;
pub use provider::{ProviderError, ProviderResult};
pub use store::memory::{MemoryStore, StoreOperation, WriteRecord};
pub use store::{
    CollectionPath, CollectionSnapshot, Document, DocumentId, DocumentPath, DocumentSnapshot,
    DocumentStore, SnapshotSink, StoreError, StorePaths, StoreResult, Subscription,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
