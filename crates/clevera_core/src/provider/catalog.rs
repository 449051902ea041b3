//! Catalog provider: live mirror of one user's topics and their sets.
//!
//! # Responsibility
//! - Keep one topics subscription open while an identity is present.
//! - Keep exactly one sets subscription per currently known topic.
//! - Create topics/sets and move sets between topics.
//!
//! # Invariants
//! - Every topics notification replaces the topic list wholesale, with
//!   `sets` reset to empty, then tears down every sets subscription and
//!   opens a fresh one per topic (full rebuild, no diffing).
//! - A sets notification only updates the topic it was opened for, and is
//!   dropped when its listener is no longer the active one for that topic.
//! - Identity change or disposal cancels every owned subscription.
//! - Creates are visible only through later notifications.
//!
//! `move_set` is create-then-delete with no rollback: if the delete fails
//! the set stays visible under both topics.

use crate::config::SyncConfig;
use crate::model::catalog::{SetFields, SetId, StudySet, Term, Topic, TopicFields, TopicId};
use crate::model::profile::{Identity, Profile, UserId};
use crate::model::{decode, encode};
use crate::provider::{normalize_name, ListenerId, ProviderError, ProviderResult};
use crate::store::{
    CollectionPath, CollectionSnapshot, DocumentStore, SnapshotSink, StorePaths, Subscription,
};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Result of `move_set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Copied under the destination (new id) and deleted from the source.
    Moved { new_set_id: SetId },
    /// Source set document does not exist; nothing was written.
    SourceMissing,
    /// No identity or empty set id; nothing was written.
    Skipped,
}

enum CatalogEvent {
    Topics {
        listener: ListenerId,
        snapshot: CollectionSnapshot,
    },
    Sets {
        listener: ListenerId,
        topic_id: TopicId,
        snapshot: CollectionSnapshot,
    },
}

struct ActiveListener {
    id: ListenerId,
    _subscription: Subscription,
}

/// Owns the mirrored topic/set hierarchy of the observed identity.
pub struct CatalogProvider {
    store: Arc<dyn DocumentStore>,
    paths: StorePaths,
    owner: Option<UserId>,
    topics: Vec<Topic>,
    topics_listener: Option<ActiveListener>,
    set_listeners: BTreeMap<TopicId, ActiveListener>,
    sender: Sender<CatalogEvent>,
    events: Receiver<CatalogEvent>,
    next_listener_id: ListenerId,
}

impl CatalogProvider {
    pub fn new(store: Arc<dyn DocumentStore>, config: &SyncConfig) -> Self {
        let (sender, events) = mpsc::channel();
        Self {
            store,
            paths: StorePaths::new(config),
            owner: None,
            topics: Vec::new(),
            topics_listener: None,
            set_listeners: BTreeMap::new(),
            sender,
            events,
            next_listener_id: 0,
        }
    }

    /// Mirrored topics, in store order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }

    /// Owning topic and set for `set_id`, if currently mirrored.
    pub fn find_set(&self, set_id: &str) -> Option<(&Topic, &StudySet)> {
        self.topics
            .iter()
            .find_map(|topic| topic.find_set(set_id).map(|set| (topic, set)))
    }

    /// Mirrored sets the profile has starred, in starred order.
    ///
    /// Ids that no longer resolve to a mirrored set are skipped.
    pub fn starred_sets(&self, profile: &Profile) -> Vec<&StudySet> {
        profile
            .starred_set_ids
            .iter()
            .filter_map(|set_id| self.find_set(set_id).map(|(_, set)| set))
            .collect()
    }

    /// Identity whose namespace is currently mirrored.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn has_topics_listener(&self) -> bool {
        self.topics_listener.is_some()
    }

    /// Topic ids with an open sets subscription.
    pub fn set_listener_topics(&self) -> Vec<&str> {
        self.set_listeners.keys().map(String::as_str).collect()
    }

    /// Reacts to the current identity: on change, cancels everything and
    /// opens a topics subscription for the new identity (if any).
    pub fn observe_identity(&mut self, identity: Option<&Identity>) -> ProviderResult<()> {
        let uid = identity.map(|identity| identity.uid.as_str());
        if self.owner.as_deref() == uid {
            return Ok(());
        }

        self.teardown();
        let Some(uid) = uid else {
            info!("event=catalog_owner module=catalog status=cleared");
            return Ok(());
        };

        let path = self.paths.topics(uid)?;
        let listener = self.open_listener(&path, |listener, snapshot| CatalogEvent::Topics {
            listener,
            snapshot,
        })?;
        self.topics_listener = Some(listener);
        self.owner = Some(uid.to_string());
        info!("event=catalog_owner module=catalog status=subscribed uid={uid}");
        Ok(())
    }

    /// Applies queued snapshot notifications in arrival order.
    ///
    /// Returns the number of notifications applied; stale ones are dropped
    /// and not counted.
    pub fn process_events(&mut self) -> ProviderResult<usize> {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            match event {
                CatalogEvent::Topics { listener, snapshot } => {
                    if !is_active(self.topics_listener.as_ref(), listener) {
                        debug!(
                            "event=topics_snapshot module=catalog status=dropped listener={listener}"
                        );
                        continue;
                    }
                    self.apply_topics(&snapshot);
                    self.rebuild_set_listeners()?;
                }
                CatalogEvent::Sets {
                    listener,
                    topic_id,
                    snapshot,
                } => {
                    if !is_active(self.set_listeners.get(&topic_id), listener) {
                        debug!(
                            "event=sets_snapshot module=catalog status=dropped topic_id={topic_id} listener={listener}"
                        );
                        continue;
                    }
                    self.apply_sets(&topic_id, &snapshot);
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    fn apply_topics(&mut self, snapshot: &CollectionSnapshot) {
        self.topics = snapshot
            .documents
            .iter()
            .filter_map(|doc| match Topic::from_snapshot(doc) {
                Ok(topic) => Some(topic),
                Err(err) => {
                    warn!(
                        "event=topics_snapshot module=catalog status=skipped_document topic_id={} error={}",
                        doc.id, err
                    );
                    None
                }
            })
            .collect();
        info!(
            "event=topics_snapshot module=catalog status=applied count={}",
            self.topics.len()
        );
    }

    fn apply_sets(&mut self, topic_id: &str, snapshot: &CollectionSnapshot) {
        let Some(topic) = self.topics.iter_mut().find(|topic| topic.id == topic_id) else {
            return;
        };
        topic.sets = snapshot
            .documents
            .iter()
            .filter_map(|doc| match StudySet::from_snapshot(doc) {
                Ok(set) => Some(set),
                Err(err) => {
                    warn!(
                        "event=sets_snapshot module=catalog status=skipped_document topic_id={} set_id={} error={}",
                        topic_id, doc.id, err
                    );
                    None
                }
            })
            .collect();
        debug!(
            "event=sets_snapshot module=catalog status=applied topic_id={} count={}",
            topic_id,
            topic.sets.len()
        );
    }

    fn rebuild_set_listeners(&mut self) -> ProviderResult<()> {
        self.set_listeners.clear();
        let Some(uid) = self.owner.clone() else {
            return Ok(());
        };

        let topic_ids: Vec<TopicId> = self.topics.iter().map(|topic| topic.id.clone()).collect();
        for topic_id in topic_ids {
            let path = self.paths.sets(&uid, &topic_id)?;
            let event_topic_id = topic_id.clone();
            let listener = self.open_listener(&path, move |listener, snapshot| {
                CatalogEvent::Sets {
                    listener,
                    topic_id: event_topic_id.clone(),
                    snapshot,
                }
            })?;
            self.set_listeners.insert(topic_id, listener);
        }
        info!(
            "event=set_listeners_rebuilt module=catalog status=ok count={}",
            self.set_listeners.len()
        );
        Ok(())
    }

    fn open_listener(
        &mut self,
        path: &CollectionPath,
        wrap: impl Fn(ListenerId, CollectionSnapshot) -> CatalogEvent + Send + Sync + 'static,
    ) -> ProviderResult<ActiveListener> {
        self.next_listener_id += 1;
        let id = self.next_listener_id;
        let sender = self.sender.clone();
        let sink: SnapshotSink = Arc::new(move |snapshot: CollectionSnapshot| {
            // Receiver gone means the provider was dropped.
            let _ = sender.send(wrap(id, snapshot));
        });
        let subscription = self.store.subscribe_collection(path, sink)?;
        Ok(ActiveListener {
            id,
            _subscription: subscription,
        })
    }

    fn teardown(&mut self) {
        let cancelled = self.set_listeners.len() + usize::from(self.topics_listener.is_some());
        self.set_listeners.clear();
        self.topics_listener = None;
        self.topics.clear();
        self.owner = None;
        if cancelled > 0 {
            info!("event=catalog_teardown module=catalog status=ok cancelled={cancelled}");
        }
    }

    /// Cancels every owned subscription and clears mirrored state.
    pub fn dispose(&mut self) {
        self.teardown();
        while self.events.try_recv().is_ok() {}
    }

    /// Creates a topic. No-op without an identity.
    pub fn add_topic(
        &self,
        name: &str,
        emoji: &str,
        description: Option<&str>,
    ) -> ProviderResult<()> {
        let Some(uid) = self.owner.as_deref() else {
            debug!("event=add_topic module=catalog status=skipped reason=no_identity");
            return Ok(());
        };
        let fields = TopicFields {
            name: normalize_name(name)?,
            emoji: emoji.to_string(),
            description: description.unwrap_or_default().to_string(),
        };
        let path = self.paths.topics(uid)?;
        let fields = encode(&fields).map_err(|err| ProviderError::invalid_document(&path, err))?;
        let topic_id = self.store.add_document(&path, fields)?;
        info!("event=add_topic module=catalog status=ok topic_id={topic_id}");
        Ok(())
    }

    /// Creates a set under `topic_id`. No-op without an identity.
    pub fn add_set(
        &self,
        name: &str,
        topic_id: &str,
        description: Option<&str>,
    ) -> ProviderResult<()> {
        let Some(uid) = self.owner.as_deref() else {
            debug!("event=add_set module=catalog status=skipped reason=no_identity");
            return Ok(());
        };
        let fields = SetFields {
            name: normalize_name(name)?,
            description: description.unwrap_or_default().to_string(),
        };
        let path = self.paths.sets(uid, topic_id)?;
        let fields = encode(&fields).map_err(|err| ProviderError::invalid_document(&path, err))?;
        let set_id = self.store.add_document(&path, fields)?;
        info!("event=add_set module=catalog status=ok topic_id={topic_id} set_id={set_id}");
        Ok(())
    }

    /// Moves a set by copying name/description under the destination topic
    /// and then deleting the source document.
    ///
    /// The two writes are independent; a failed delete is returned as an
    /// error after the copy already exists.
    pub fn move_set(
        &self,
        set_id: &str,
        source_topic_id: &str,
        destination_topic_id: &str,
    ) -> ProviderResult<MoveOutcome> {
        let Some(uid) = self.owner.as_deref() else {
            debug!("event=move_set module=catalog status=skipped reason=no_identity");
            return Ok(MoveOutcome::Skipped);
        };
        if set_id.is_empty() {
            debug!("event=move_set module=catalog status=skipped set_id={set_id}");
            return Ok(MoveOutcome::Skipped);
        }

        let source_path = self.paths.set(uid, source_topic_id, set_id)?;
        let Some(fields) = self.store.get_document(&source_path)? else {
            warn!(
                "event=move_set module=catalog status=source_missing set_id={set_id} topic_id={source_topic_id}"
            );
            return Ok(MoveOutcome::SourceMissing);
        };
        let record: SetFields =
            decode(&fields).map_err(|err| ProviderError::invalid_document(&source_path, err))?;

        let destination = self.paths.sets(uid, destination_topic_id)?;
        let fields =
            encode(&record).map_err(|err| ProviderError::invalid_document(&destination, err))?;
        let new_set_id = self.store.add_document(&destination, fields)?;

        if let Err(err) = self.store.delete_document(&source_path) {
            error!(
                "event=move_set module=catalog status=partial set_id={set_id} new_set_id={new_set_id} error={err}"
            );
            return Err(err.into());
        }
        info!(
            "event=move_set module=catalog status=ok set_id={set_id} new_set_id={new_set_id} from={source_topic_id} to={destination_topic_id}"
        );
        Ok(MoveOutcome::Moved { new_set_id })
    }

    /// One-shot read of a set's terms. Empty without an identity.
    pub fn fetch_terms(&self, topic_id: &str, set_id: &str) -> ProviderResult<Vec<Term>> {
        let Some(uid) = self.owner.as_deref() else {
            return Ok(Vec::new());
        };
        let path = self.paths.terms(uid, topic_id, set_id)?;
        let snapshot = self.store.list_documents(&path)?;
        snapshot
            .documents
            .iter()
            .map(|doc| {
                Term::from_snapshot(doc).map_err(|err| {
                    ProviderError::invalid_document(format!("{path}/{}", doc.id), err)
                })
            })
            .collect()
    }
}

fn is_active(active: Option<&ActiveListener>, listener: ListenerId) -> bool {
    active.is_some_and(|active| active.id == listener)
}
