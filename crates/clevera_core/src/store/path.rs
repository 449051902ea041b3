//! Store path model and per-user namespace layout.
//!
//! # Invariants
//! - Every segment is non-empty and never contains `/`.
//! - All catalog and profile data of one user lives under
//!   `{namespace_root}/{uid}`.

use crate::config::SyncConfig;
use crate::store::{DocumentId, StoreError, StoreResult};
use std::fmt::{Display, Formatter};

/// Path of one collection, e.g. `users/u1/topics`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

/// Path of one document, e.g. `users/u1/topics/t1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    parent: CollectionPath,
    id: DocumentId,
}

impl CollectionPath {
    /// Top-level collection.
    pub fn root(name: &str) -> StoreResult<Self> {
        Ok(Self(checked_segment(name)?.to_string()))
    }

    /// Document inside this collection.
    pub fn document(&self, id: &str) -> StoreResult<DocumentPath> {
        Ok(DocumentPath {
            parent: self.clone(),
            id: checked_segment(id)?.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocumentPath {
    /// Sub-collection nested under this document.
    pub fn collection(&self, name: &str) -> StoreResult<CollectionPath> {
        Ok(CollectionPath(format!(
            "{}/{}/{}",
            self.parent.0,
            self.id,
            checked_segment(name)?
        )))
    }

    pub fn parent(&self) -> &CollectionPath {
        &self.parent
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.parent, self.id)
    }
}

/// Builds namespaced paths for one configured layout.
#[derive(Debug, Clone)]
pub struct StorePaths {
    namespace_root: String,
    profile_collection: String,
    profile_document: String,
    topics_collection: String,
    sets_collection: String,
    terms_collection: String,
}

impl StorePaths {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            namespace_root: config.namespace_root.clone(),
            profile_collection: config.profile_collection.clone(),
            profile_document: config.profile_document.clone(),
            topics_collection: config.topics_collection.clone(),
            sets_collection: config.sets_collection.clone(),
            terms_collection: config.terms_collection.clone(),
        }
    }

    fn user(&self, uid: &str) -> StoreResult<DocumentPath> {
        CollectionPath::root(&self.namespace_root)?.document(uid)
    }

    /// `users/{uid}/userProfile/profile`
    pub fn profile(&self, uid: &str) -> StoreResult<DocumentPath> {
        self.user(uid)?
            .collection(&self.profile_collection)?
            .document(&self.profile_document)
    }

    /// `users/{uid}/topics`
    pub fn topics(&self, uid: &str) -> StoreResult<CollectionPath> {
        self.user(uid)?.collection(&self.topics_collection)
    }

    /// `users/{uid}/topics/{topic_id}/sets`
    pub fn sets(&self, uid: &str, topic_id: &str) -> StoreResult<CollectionPath> {
        self.topics(uid)?
            .document(topic_id)?
            .collection(&self.sets_collection)
    }

    /// `users/{uid}/topics/{topic_id}/sets/{set_id}`
    pub fn set(&self, uid: &str, topic_id: &str, set_id: &str) -> StoreResult<DocumentPath> {
        self.sets(uid, topic_id)?.document(set_id)
    }

    /// `users/{uid}/topics/{topic_id}/sets/{set_id}/terms`
    pub fn terms(&self, uid: &str, topic_id: &str, set_id: &str) -> StoreResult<CollectionPath> {
        self.set(uid, topic_id, set_id)?
            .collection(&self.terms_collection)
    }
}

fn checked_segment(value: &str) -> StoreResult<&str> {
    if value.is_empty() || value.contains('/') {
        return Err(StoreError::InvalidPath(value.to_string()));
    }
    Ok(value)
}
