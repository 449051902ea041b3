//! Document store contract consumed by the providers.
//!
//! # Responsibility
//! - Define the hierarchical document store seam (`DocumentStore`).
//! - Define subscription handles and snapshot payloads for live reads.
//!
//! # Invariants
//! - Collection snapshots always carry the full current membership, in the
//!   order the store reports it.
//! - A cancelled or dropped `Subscription` never invokes its sink again.
//!
//! # See also
//! - `store::memory` for the in-process implementation.

pub mod memory;
pub mod path;

use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub use path::{CollectionPath, DocumentPath, StorePaths};

/// Store-generated document identifier.
pub type DocumentId = String;

/// Field map of one document, keyed by wire field name.
pub type Document = Map<String, Value>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Callback invoked with every collection snapshot of one subscription.
pub type SnapshotSink = Arc<dyn Fn(CollectionSnapshot) + Send + Sync>;

/// Errors surfaced by store implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Target document does not exist (update on a missing document).
    NotFound(String),
    /// Path segment is empty or contains a separator.
    InvalidPath(String),
    /// Store could not be reached or failed transiently.
    Unavailable(String),
    /// Store refused the write.
    Rejected(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "document not found: {path}"),
            Self::InvalidPath(value) => write!(f, "invalid store path segment: `{value}`"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::Rejected(message) => write!(f, "store rejected write: {message}"),
        }
    }
}

impl Error for StoreError {}

/// One document as observed in a snapshot or a one-shot read.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub data: Document,
}

/// Full membership of one collection at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSnapshot {
    pub documents: Vec<DocumentSnapshot>,
}

impl CollectionSnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Handle for one live subscription.
///
/// Cancels on drop. `cancel` exists so call sites can make teardown explicit.
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps a store-side detach action.
    pub fn new(id: u64, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Store-assigned subscription id, for diagnostics only.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Detaches the subscription from the store.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Hierarchical document store, namespaced by the caller through paths.
pub trait DocumentStore: Send + Sync {
    /// Creates a document with a store-generated id.
    fn add_document(&self, collection: &CollectionPath, fields: Document)
        -> StoreResult<DocumentId>;
    /// Reads one document, `None` when absent.
    fn get_document(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;
    /// Creates or overwrites one document.
    fn set_document(&self, path: &DocumentPath, fields: Document) -> StoreResult<()>;
    /// Merges fields into an existing document.
    fn update_fields(&self, path: &DocumentPath, fields: Document) -> StoreResult<()>;
    /// Deletes one document. Deleting an absent document succeeds.
    fn delete_document(&self, path: &DocumentPath) -> StoreResult<()>;
    /// One-shot read of a collection's current membership.
    fn list_documents(&self, collection: &CollectionPath) -> StoreResult<CollectionSnapshot>;
    /// Opens a live subscription; `sink` receives the current membership
    /// immediately and again after every change.
    fn subscribe_collection(
        &self,
        collection: &CollectionPath,
        sink: SnapshotSink,
    ) -> StoreResult<Subscription>;
}
