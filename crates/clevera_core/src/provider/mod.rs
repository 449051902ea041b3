//! Client-side state providers.
//!
//! # Responsibility
//! - Mirror remote identity/profile and catalog state into local state.
//! - Expose mutation entry points that write through the store.
//!
//! # Invariants
//! - Provider state is written only by its own event processing and
//!   mutation functions.
//! - Store callbacks never touch provider state; they enqueue events that
//!   `process_events` applies on the caller's thread.
//! - Mutations without an identity are `Ok` no-ops.

pub mod catalog;
pub mod identity;
pub mod session;

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider-local id tagging every event a listener enqueues.
pub(crate) type ListenerId = u64;

/// Errors surfaced by provider operations.
#[derive(Debug)]
pub enum ProviderError {
    /// Store rejected or failed the operation. Never retried.
    Store(StoreError),
    /// Topic or set name is blank after trim.
    BlankName,
    /// A document could not be decoded or encoded.
    InvalidDocument {
        path: String,
        source: serde_json::Error,
    },
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::BlankName => write!(f, "name must not be blank"),
            Self::InvalidDocument { path, source } => {
                write!(f, "invalid document at {path}: {source}")
            }
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::BlankName => None,
            Self::InvalidDocument { source, .. } => Some(source),
        }
    }
}

impl From<StoreError> for ProviderError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl ProviderError {
    pub(crate) fn invalid_document(path: impl ToString, source: serde_json::Error) -> Self {
        Self::InvalidDocument {
            path: path.to_string(),
            source,
        }
    }
}

pub(crate) fn normalize_name(value: &str) -> ProviderResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::BlankName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, ProviderError};

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  Biology ").unwrap(), "Biology");
        assert!(matches!(normalize_name(" \t "), Err(ProviderError::BlankName)));
    }
}
