use clevera_core::{
    CatalogProvider, CollectionPath, DocumentStore, Identity, MemoryStore, MoveOutcome, Profile,
    ProviderError, StoreError, StoreOperation, StorePaths, SyncConfig,
};
use serde_json::json;
use std::sync::Arc;

fn doc(value: serde_json::Value) -> clevera_core::Document {
    value.as_object().cloned().expect("fixture must be an object")
}

fn setup() -> (MemoryStore, CatalogProvider) {
    let store = MemoryStore::new();
    let catalog = CatalogProvider::new(Arc::new(store.clone()), &SyncConfig::default());
    (store, catalog)
}

fn signed_in(uid: &str) -> (MemoryStore, CatalogProvider) {
    let (store, mut catalog) = setup();
    catalog
        .observe_identity(Some(&Identity::new(uid)))
        .expect("topics subscription should open");
    catalog.process_events().expect("initial snapshot");
    (store, catalog)
}

fn paths() -> StorePaths {
    StorePaths::new(&SyncConfig::default())
}

fn seed_topic(store: &MemoryStore, uid: &str, name: &str) -> String {
    store
        .add_document(
            &paths().topics(uid).unwrap(),
            doc(json!({"name": name, "emoji": "📘"})),
        )
        .unwrap()
}

fn seed_set(store: &MemoryStore, uid: &str, topic_id: &str, name: &str) -> String {
    store
        .add_document(
            &paths().sets(uid, topic_id).unwrap(),
            doc(json!({"name": name, "description": ""})),
        )
        .unwrap()
}

fn set_names(catalog: &CatalogProvider, topic_id: &str) -> Vec<String> {
    catalog
        .topic(topic_id)
        .expect("topic should be mirrored")
        .sets
        .iter()
        .map(|set| set.name.clone())
        .collect()
}

#[test]
fn topics_subscription_follows_identity() {
    let (store, mut catalog) = setup();
    catalog.observe_identity(None).unwrap();
    assert!(!catalog.has_topics_listener());
    assert_eq!(store.listener_count(), 0);

    catalog.observe_identity(Some(&Identity::new("u1"))).unwrap();
    assert!(catalog.has_topics_listener());
    assert_eq!(catalog.owner(), Some("u1"));
    assert_eq!(store.listener_count(), 1);

    catalog.observe_identity(None).unwrap();
    assert!(!catalog.has_topics_listener());
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn add_topic_becomes_visible_only_after_notification() {
    let (_store, mut catalog) = signed_in("u1");

    catalog.add_topic("  Biology ", "🧬", None).unwrap();
    assert!(catalog.topics().is_empty());

    catalog.process_events().unwrap();
    let topics = catalog.topics();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].name, "Biology");
    assert_eq!(topics[0].emoji, "🧬");
    assert_eq!(topics[0].description, "");
    assert!(topics[0].sets.is_empty());
}

#[test]
fn add_set_updates_only_its_topic() {
    let (store, mut catalog) = signed_in("u1");
    let biology = seed_topic(&store, "u1", "Biology");
    let history = seed_topic(&store, "u1", "History");
    catalog.process_events().unwrap();

    catalog
        .add_set("Chapter 1", &biology, Some("cells"))
        .unwrap();
    catalog.process_events().unwrap();

    assert_eq!(set_names(&catalog, &biology), vec!["Chapter 1"]);
    assert!(set_names(&catalog, &history).is_empty());
    let (topic, set) = catalog
        .find_set(&catalog.topic(&biology).unwrap().sets[0].id)
        .expect("set should resolve");
    assert_eq!(topic.id, biology);
    assert_eq!(set.description, "cells");
}

#[test]
fn one_sets_listener_per_topic_after_rebuild() {
    let (store, mut catalog) = signed_in("u1");
    let a = seed_topic(&store, "u1", "A");
    let b = seed_topic(&store, "u1", "B");
    catalog.process_events().unwrap();

    let mut expected = vec![a.as_str(), b.as_str()];
    expected.sort();
    assert_eq!(catalog.set_listener_topics(), expected);
    assert_eq!(
        store.listener_count_for(&paths().sets("u1", &a).unwrap()),
        1
    );
    assert_eq!(
        store.listener_count_for(&paths().sets("u1", &b).unwrap()),
        1
    );
}

#[test]
fn removing_topic_cancels_its_sets_listener_and_keeps_others() {
    let (store, mut catalog) = signed_in("u1");
    let a = seed_topic(&store, "u1", "A");
    let b = seed_topic(&store, "u1", "B");
    seed_set(&store, "u1", &a, "a-1");
    seed_set(&store, "u1", &b, "b-1");
    catalog.process_events().unwrap();
    assert_eq!(set_names(&catalog, &a), vec!["a-1"]);
    assert_eq!(set_names(&catalog, &b), vec!["b-1"]);

    // B's old listener fires after the topic removal is queued.
    store
        .delete_document(&paths().topics("u1").unwrap().document(&b).unwrap())
        .unwrap();
    seed_set(&store, "u1", &b, "b-2");
    catalog.process_events().unwrap();

    assert!(catalog.topic(&b).is_none());
    assert_eq!(set_names(&catalog, &a), vec!["a-1"]);
    assert_eq!(catalog.set_listener_topics(), vec![a.as_str()]);
    let b_sets: CollectionPath = paths().sets("u1", &b).unwrap();
    assert_eq!(store.listener_count_for(&b_sets), 0);

    seed_set(&store, "u1", &b, "b-3");
    assert_eq!(catalog.process_events().unwrap(), 0);
    assert_eq!(catalog.topics().len(), 1);
    assert_eq!(set_names(&catalog, &a), vec!["a-1"]);
}

#[test]
fn move_set_copies_then_deletes_source() {
    let (store, mut catalog) = signed_in("u1");
    let from = seed_topic(&store, "u1", "From");
    let to = seed_topic(&store, "u1", "To");
    let set_id = store
        .add_document(
            &paths().sets("u1", &from).unwrap(),
            doc(json!({"name": "Deck", "description": "verbs"})),
        )
        .unwrap();
    catalog.process_events().unwrap();

    let new_set_id = match catalog.move_set(&set_id, &from, &to).unwrap() {
        MoveOutcome::Moved { new_set_id } => new_set_id,
        other => panic!("expected a completed move, got {other:?}"),
    };
    catalog.process_events().unwrap();

    assert!(set_names(&catalog, &from).is_empty());
    let moved = catalog.topic(&to).unwrap().find_set(&new_set_id).unwrap();
    assert_eq!(moved.name, "Deck");
    assert_eq!(moved.description, "verbs");
    assert_ne!(new_set_id, set_id);
}

#[test]
fn move_of_missing_source_writes_nothing() {
    let (store, mut catalog) = signed_in("u1");
    let a = seed_topic(&store, "u1", "A");
    let b = seed_topic(&store, "u1", "B");
    seed_set(&store, "u1", &a, "a-1");
    catalog.process_events().unwrap();
    let writes_before = store.writes();
    let topics_before = catalog.topics().to_vec();

    let outcome = catalog.move_set("nonexistent-id", &a, &b).unwrap();
    catalog.process_events().unwrap();

    assert_eq!(outcome, MoveOutcome::SourceMissing);
    assert_eq!(store.writes(), writes_before);
    assert_eq!(catalog.topics(), topics_before.as_slice());
}

#[test]
fn failed_delete_leaves_set_in_both_topics() {
    let (store, mut catalog) = signed_in("u1");
    let from = seed_topic(&store, "u1", "From");
    let to = seed_topic(&store, "u1", "To");
    let set_id = seed_set(&store, "u1", &from, "Deck");
    catalog.process_events().unwrap();
    store.fail_next(
        StoreOperation::Delete,
        StoreError::Unavailable("connection reset".to_string()),
    );

    let err = catalog.move_set(&set_id, &from, &to).unwrap_err();
    catalog.process_events().unwrap();

    assert!(matches!(
        err,
        ProviderError::Store(StoreError::Unavailable(_))
    ));
    assert_eq!(set_names(&catalog, &from), vec!["Deck"]);
    assert_eq!(set_names(&catalog, &to), vec!["Deck"]);
}

#[test]
fn move_with_empty_id_is_skipped() {
    let (store, mut catalog) = signed_in("u1");
    let a = seed_topic(&store, "u1", "A");
    catalog.process_events().unwrap();
    let writes_before = store.writes().len();

    assert_eq!(catalog.move_set("", &a, "other").unwrap(), MoveOutcome::Skipped);
    assert_eq!(store.writes().len(), writes_before);
}

#[test]
fn move_within_same_topic_rekeys_set() {
    let (store, mut catalog) = signed_in("u1");
    let a = seed_topic(&store, "u1", "A");
    let set_id = seed_set(&store, "u1", &a, "a-1");
    catalog.process_events().unwrap();

    let new_set_id = match catalog.move_set(&set_id, &a, &a).unwrap() {
        MoveOutcome::Moved { new_set_id } => new_set_id,
        other => panic!("expected a completed move, got {other:?}"),
    };
    catalog.process_events().unwrap();

    assert_ne!(new_set_id, set_id);
    let topic = catalog.topic(&a).unwrap();
    assert!(topic.find_set(&set_id).is_none());
    assert_eq!(topic.find_set(&new_set_id).unwrap().name, "a-1");
    assert_eq!(set_names(&catalog, &a), vec!["a-1"]);
}

#[test]
fn failed_destination_create_leaves_source_untouched() {
    let (store, mut catalog) = signed_in("u1");
    let from = seed_topic(&store, "u1", "From");
    let to = seed_topic(&store, "u1", "To");
    let set_id = seed_set(&store, "u1", &from, "Deck");
    catalog.process_events().unwrap();
    let writes_before = store.writes().len();
    store.fail_next(
        StoreOperation::Add,
        StoreError::Rejected("quota exceeded".to_string()),
    );

    let err = catalog.move_set(&set_id, &from, &to).unwrap_err();
    catalog.process_events().unwrap();

    assert!(matches!(err, ProviderError::Store(StoreError::Rejected(_))));
    assert_eq!(store.writes().len(), writes_before);
    assert!(store
        .writes()
        .iter()
        .all(|write| write.operation != StoreOperation::Delete));
    assert!(store
        .get_document(&paths().set("u1", &from, &set_id).unwrap())
        .unwrap()
        .is_some());
    assert_eq!(set_names(&catalog, &from), vec!["Deck"]);
    assert!(set_names(&catalog, &to).is_empty());
}

#[test]
fn failed_creates_propagate_store_errors() {
    let (store, mut catalog) = signed_in("u1");
    let topic_id = seed_topic(&store, "u1", "A");
    catalog.process_events().unwrap();
    let writes_before = store.writes().len();

    store.fail_next(
        StoreOperation::Add,
        StoreError::Unavailable("offline".to_string()),
    );
    let err = catalog.add_topic("Biology", "🧬", None).unwrap_err();
    assert!(matches!(err, ProviderError::Store(StoreError::Unavailable(_))));

    store.fail_next(
        StoreOperation::Add,
        StoreError::Unavailable("offline".to_string()),
    );
    let err = catalog.add_set("Chapter 1", &topic_id, None).unwrap_err();
    assert!(matches!(err, ProviderError::Store(StoreError::Unavailable(_))));

    catalog.process_events().unwrap();
    assert_eq!(store.writes().len(), writes_before);
    assert_eq!(catalog.topics().len(), 1);
    assert!(set_names(&catalog, &topic_id).is_empty());
}

#[test]
fn mutations_without_identity_are_silent_no_ops() {
    let (store, catalog) = setup();

    catalog.add_topic("Biology", "🧬", None).unwrap();
    catalog.add_set("Chapter 1", "t1", None).unwrap();
    assert_eq!(catalog.move_set("s1", "t1", "t2").unwrap(), MoveOutcome::Skipped);
    assert!(catalog.fetch_terms("t1", "s1").unwrap().is_empty());
    assert!(store.writes().is_empty());
}

#[test]
fn blank_names_are_rejected_without_writes() {
    let (store, catalog) = signed_in("u1");
    assert!(matches!(
        catalog.add_topic("   ", "x", None),
        Err(ProviderError::BlankName)
    ));
    assert!(matches!(
        catalog.add_set("", "t1", None),
        Err(ProviderError::BlankName)
    ));
    assert!(store.writes().is_empty());
}

#[test]
fn identity_switch_replaces_mirrored_namespace() {
    let (store, mut catalog) = signed_in("u1");
    seed_topic(&store, "u1", "Mine");
    seed_topic(&store, "u2", "Theirs");
    catalog.process_events().unwrap();
    assert_eq!(catalog.topics()[0].name, "Mine");

    catalog.observe_identity(Some(&Identity::new("u2"))).unwrap();
    assert!(catalog.topics().is_empty());
    catalog.process_events().unwrap();

    assert_eq!(catalog.owner(), Some("u2"));
    assert_eq!(catalog.topics().len(), 1);
    assert_eq!(catalog.topics()[0].name, "Theirs");
    assert_eq!(
        store.listener_count_for(&paths().topics("u1").unwrap()),
        0
    );
    // One topics listener plus one sets listener for u2's only topic.
    assert_eq!(store.listener_count(), 2);
}

#[test]
fn dispose_cancels_every_subscription() {
    let (store, mut catalog) = signed_in("u1");
    seed_topic(&store, "u1", "A");
    seed_topic(&store, "u1", "B");
    catalog.process_events().unwrap();
    assert_eq!(store.listener_count(), 3);

    catalog.dispose();
    assert_eq!(store.listener_count(), 0);
    assert!(catalog.topics().is_empty());

    seed_topic(&store, "u1", "C");
    assert_eq!(catalog.process_events().unwrap(), 0);
}

#[test]
fn malformed_topic_documents_are_skipped() {
    let (store, mut catalog) = signed_in("u1");
    store
        .add_document(&paths().topics("u1").unwrap(), doc(json!({"emoji": "?"})))
        .unwrap();
    seed_topic(&store, "u1", "Valid");
    catalog.process_events().unwrap();

    assert_eq!(catalog.topics().len(), 1);
    assert_eq!(catalog.topics()[0].name, "Valid");
}

#[test]
fn fetch_terms_reads_on_demand() {
    let (store, mut catalog) = signed_in("u1");
    let topic = seed_topic(&store, "u1", "Biology");
    let set = seed_set(&store, "u1", &topic, "Cells");
    let terms_path = paths().terms("u1", &topic, &set).unwrap();
    store
        .add_document(
            &terms_path,
            doc(json!({"term": "mitochondria", "definition": "powerhouse"})),
        )
        .unwrap();
    catalog.process_events().unwrap();

    assert!(catalog.topic(&topic).unwrap().sets[0].terms.is_empty());
    let terms = catalog.fetch_terms(&topic, &set).unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].term, "mitochondria");
    assert_eq!(terms[0].definition, "powerhouse");
}

#[test]
fn starred_sets_skip_dangling_ids() {
    let (store, mut catalog) = signed_in("u1");
    let topic = seed_topic(&store, "u1", "Biology");
    let first = seed_set(&store, "u1", &topic, "First");
    let second = seed_set(&store, "u1", &topic, "Second");
    catalog.process_events().unwrap();

    let mut profile = Profile::new_default(&Identity::new("u1"), "New User");
    profile.starred_set_ids = vec![second.clone(), "deleted-set".to_string(), first.clone()];

    let names: Vec<_> = catalog
        .starred_sets(&profile)
        .into_iter()
        .map(|set| set.name.as_str())
        .collect();
    assert_eq!(names, vec!["Second", "First"]);
}
