//! In-process `DocumentStore` implementation.
//!
//! # Responsibility
//! - Back tests and the CLI with the same contract the remote store honours.
//! - Record writes and inject one-shot failures so callers can assert
//!   partial-failure behavior.
//!
//! # Invariants
//! - Collection membership is reported in insertion order.
//! - Listeners are notified after the state lock is released.
//! - A failed (injected) operation performs no mutation.

use crate::store::{
    CollectionPath, CollectionSnapshot, Document, DocumentId, DocumentPath, DocumentSnapshot,
    DocumentStore, SnapshotSink, StoreError, StoreResult, Subscription,
};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

/// Store operation kinds, used for fault injection and the write log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreOperation {
    Add,
    Get,
    Set,
    Update,
    Delete,
    List,
    Subscribe,
}

impl StoreOperation {
    fn is_write(self) -> bool {
        matches!(self, Self::Add | Self::Set | Self::Update | Self::Delete)
    }
}

/// One acknowledged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub operation: StoreOperation,
    /// Full document path the write targeted.
    pub path: String,
}

#[derive(Default)]
struct MemoryState {
    collections: BTreeMap<CollectionPath, Vec<(DocumentId, Document)>>,
    listeners: BTreeMap<u64, Listener>,
    next_listener_id: u64,
    pending_faults: BTreeMap<StoreOperation, StoreError>,
    writes: Vec<WriteRecord>,
}

struct Listener {
    collection: CollectionPath,
    sink: SnapshotSink,
}

impl MemoryState {
    fn take_fault(&mut self, operation: StoreOperation) -> StoreResult<()> {
        match self.pending_faults.remove(&operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn snapshot(&self, collection: &CollectionPath) -> CollectionSnapshot {
        let documents = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| DocumentSnapshot {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        CollectionSnapshot { documents }
    }

    fn record_write(&mut self, operation: StoreOperation, path: String) {
        debug_assert!(operation.is_write());
        self.writes.push(WriteRecord { operation, path });
    }

    fn pending_notifications(
        &self,
        collection: &CollectionPath,
    ) -> Vec<(SnapshotSink, CollectionSnapshot)> {
        let listeners: Vec<SnapshotSink> = self
            .listeners
            .values()
            .filter(|listener| &listener.collection == collection)
            .map(|listener| Arc::clone(&listener.sink))
            .collect();
        if listeners.is_empty() {
            return Vec::new();
        }
        let snapshot = self.snapshot(collection);
        listeners
            .into_iter()
            .map(|sink| (sink, snapshot.clone()))
            .collect()
    }
}

/// Shared in-memory document store.
///
/// Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `operation` fail with `error`, without mutating state.
    pub fn fail_next(&self, operation: StoreOperation, error: StoreError) {
        self.lock().pending_faults.insert(operation, error);
    }

    /// Acknowledged writes in the order they were applied.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Number of live subscriptions on one collection.
    pub fn listener_count_for(&self, collection: &CollectionPath) -> usize {
        self.lock()
            .listeners
            .values()
            .filter(|listener| &listener.collection == collection)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_and_notify<T>(
        &self,
        operation: StoreOperation,
        collection: &CollectionPath,
        apply: impl FnOnce(&mut MemoryState) -> StoreResult<(T, String)>,
    ) -> StoreResult<T> {
        let (value, notifications) = {
            let mut state = self.lock();
            state.take_fault(operation)?;
            let (value, path) = apply(&mut state)?;
            state.record_write(operation, path);
            (value, state.pending_notifications(collection))
        };
        for (sink, snapshot) in notifications {
            sink(snapshot);
        }
        Ok(value)
    }
}

impl DocumentStore for MemoryStore {
    fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> StoreResult<DocumentId> {
        self.write_and_notify(StoreOperation::Add, collection, |state| {
            let id = Uuid::new_v4().simple().to_string();
            let path = format!("{collection}/{id}");
            state
                .collections
                .entry(collection.clone())
                .or_default()
                .push((id.clone(), fields));
            Ok((id, path))
        })
    }

    fn get_document(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let mut state = self.lock();
        state.take_fault(StoreOperation::Get)?;
        Ok(state.collections.get(path.parent()).and_then(|docs| {
            docs.iter()
                .find(|(id, _)| id == path.id())
                .map(|(_, data)| data.clone())
        }))
    }

    fn set_document(&self, path: &DocumentPath, fields: Document) -> StoreResult<()> {
        self.write_and_notify(StoreOperation::Set, path.parent(), |state| {
            let docs = state.collections.entry(path.parent().clone()).or_default();
            match docs.iter_mut().find(|(id, _)| id == path.id()) {
                Some((_, data)) => *data = fields,
                None => docs.push((path.id().to_string(), fields)),
            }
            Ok(((), path.to_string()))
        })
    }

    fn update_fields(&self, path: &DocumentPath, fields: Document) -> StoreResult<()> {
        self.write_and_notify(StoreOperation::Update, path.parent(), |state| {
            let data = state
                .collections
                .get_mut(path.parent())
                .and_then(|docs| docs.iter_mut().find(|(id, _)| id == path.id()))
                .map(|(_, data)| data)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            data.extend(fields);
            Ok(((), path.to_string()))
        })
    }

    fn delete_document(&self, path: &DocumentPath) -> StoreResult<()> {
        self.write_and_notify(StoreOperation::Delete, path.parent(), |state| {
            if let Some(docs) = state.collections.get_mut(path.parent()) {
                docs.retain(|(id, _)| id != path.id());
            }
            Ok(((), path.to_string()))
        })
    }

    fn list_documents(&self, collection: &CollectionPath) -> StoreResult<CollectionSnapshot> {
        let mut state = self.lock();
        state.take_fault(StoreOperation::List)?;
        Ok(state.snapshot(collection))
    }

    fn subscribe_collection(
        &self,
        collection: &CollectionPath,
        sink: SnapshotSink,
    ) -> StoreResult<Subscription> {
        let (listener_id, initial) = {
            let mut state = self.lock();
            state.take_fault(StoreOperation::Subscribe)?;
            state.next_listener_id += 1;
            let listener_id = state.next_listener_id;
            state.listeners.insert(
                listener_id,
                Listener {
                    collection: collection.clone(),
                    sink: Arc::clone(&sink),
                },
            );
            (listener_id, state.snapshot(collection))
        };
        debug!(
            "event=store_subscribe module=memory_store status=ok listener_id={} collection={}",
            listener_id, collection
        );
        sink(initial);

        let weak: Weak<Mutex<MemoryState>> = Arc::downgrade(&self.state);
        Ok(Subscription::new(listener_id, move || {
            if let Some(state) = weak.upgrade() {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.listeners.remove(&listener_id);
            }
        }))
    }
}
