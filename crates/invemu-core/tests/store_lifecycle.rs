//! Store lifecycle and transport glue against a real data directory.
//!
//! Covers what only shows up once persistence is involved:
//! - Rejected updates never touch the files on disk.
//! - Concurrent updates serialize on the single-writer lock.
//! - The transport handlers answer with encoded bytes.

use invemu_core::document::is_favorite;
use invemu_core::exchange::{REQUEST_DUMP, RESPONSE_DUMP};
use invemu_core::{
    find_by_id, find_by_slug, Document, InventoryStore, StoreConfig, StoreError, UpdateRequest,
    BINARY_CONTENT_TYPE,
};
use invemu_test_utils::{character, document, profile, record, update_request};
use invemu_value::{Codec, Mapping, Navigate, TaggedCodec, Value, ValuePath};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

fn codec() -> Arc<dyn Codec> {
    Arc::new(TaggedCodec::new())
}

fn encode(records: Vec<Mapping>) -> Vec<u8> {
    codec().encode(&document(records)).unwrap()
}

fn inventory() -> Vec<Mapping> {
    vec![
        character("c", "Char_A", &[("Gear", "g0")]),
        record("g1", "Gear_Mask"),
        record("R1", "Banner_1"),
        record("R2", "Banner_2"),
        profile("p", 5, Value::Int16(100)),
    ]
}

async fn open(dir: &TempDir) -> InventoryStore {
    InventoryStore::open(StoreConfig::new(dir.path()), codec(), Some(encode(inventory())))
        .await
        .unwrap()
}

async fn persisted(store: &InventoryStore) -> Document {
    let bytes = tokio::fs::read(store.persistence().primary_path()).await.unwrap();
    Document::decode(codec().as_ref(), &bytes).unwrap()
}

#[tokio::test]
async fn empty_update_keeps_persisted_content() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let before = persisted(&store).await;

    let outcome = store.apply_update(&UpdateRequest::default()).await.unwrap();
    assert!(outcome.changed.is_empty());
    assert!(outcome.persist.is_durable());
    assert_eq!(persisted(&store).await, before);
}

#[tokio::test]
async fn unknown_id_persists_nothing() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let primary = tokio::fs::read(store.persistence().primary_path()).await.unwrap();
    let backup = tokio::fs::read(store.persistence().backup_path()).await.unwrap();

    let value = update_request(Some(("c", &["doesNotExist"], &[])), &[]);
    let err = store
        .apply_update(&UpdateRequest::from_value(&value).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Patch(ref e) if e.is_unknown_item()));

    assert_eq!(tokio::fs::read(store.persistence().primary_path()).await.unwrap(), primary);
    assert_eq!(tokio::fs::read(store.persistence().backup_path()).await.unwrap(), backup);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_all_land() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(open(&tmp).await);

    let handles: Vec<_> = ["R1", "R2", "g1"]
        .into_iter()
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut request = UpdateRequest::default();
                request.is_favorite.insert(id.to_string(), true);
                store.apply_update(&request).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let on_disk = persisted(&store).await;
    for id in ["R1", "R2", "g1"] {
        assert!(is_favorite(find_by_id(&on_disk, id).unwrap()), "{id}");
    }
    assert_eq!(
        store
            .with_document(|doc| doc.encode(codec().as_ref()).unwrap())
            .await,
        store.snapshot_bytes().to_vec()
    );
}

#[tokio::test]
async fn update_request_answered_with_envelope() {
    let tmp = TempDir::new().unwrap();
    let store = InventoryStore::open(
        StoreConfig::new(tmp.path()).with_debug_dir(tmp.path().join("debug")),
        codec(),
        Some(encode(inventory())),
    )
    .await
    .unwrap();
    store.start_session().await;

    let request = codec()
        .encode(&update_request(Some(("c", &["g1"], &[])), &[("R1", true)]))
        .unwrap();
    let response = store.handle_update_request(&request).await.unwrap();
    assert_eq!(response.content_type, BINARY_CONTENT_TYPE);

    let envelope = codec().decode(&response.body).unwrap();
    let items: ValuePath = "body.response.current_items".parse().unwrap();
    let items = envelope.resolve_sequence(&items).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].get("id"), Some(&Value::from("c")));

    let account: ValuePath = "body.account_id".parse().unwrap();
    assert_eq!(
        envelope.resolve_str(&account).unwrap(),
        store.identity().account_id()
    );

    let debug = tmp.path().join("debug");
    assert_eq!(tokio::fs::read(debug.join(REQUEST_DUMP)).await.unwrap(), request);
    assert_eq!(
        tokio::fs::read(debug.join(RESPONSE_DUMP)).await.unwrap(),
        response.body.to_vec()
    );
}

#[tokio::test]
async fn inventory_load_syncs_and_serves_snapshot() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let upstream = encode(vec![profile("up", 42, Value::Int32(123_456))]);

    let response = store.handle_inventory_load(&upstream).await;
    assert_eq!(&*response.body, &*store.snapshot_bytes());

    let served = Document::decode(codec().as_ref(), &response.body).unwrap();
    let level: ValuePath = "data.currentLevel.val".parse().unwrap();
    let profile = find_by_slug(&served, "Profile").unwrap();
    assert_eq!(profile.resolve(&level).unwrap(), &Value::Int8(42));
    assert_eq!(served.len(), inventory().len());
}

#[tokio::test]
async fn unreadable_upstream_still_serves() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let before = store.snapshot_bytes();
    let response = store.handle_inventory_load(b"not an inventory").await;
    assert_eq!(response.body, before);
}

#[tokio::test]
async fn regenerate_replaces_and_persists() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let mut request = UpdateRequest::default();
    request.is_favorite.insert("R1".into(), true);
    store.apply_update(&request).await.unwrap();

    let new = Document::from_value(document(vec![
        record("n1", "Banner_1"),
        character("nc", "Char_A", &[("Gear", "x")]),
    ]))
    .unwrap();
    let outcome = store.regenerate(new).await;
    assert_eq!(outcome.value.favorites_carried, 1);
    assert!(!outcome.is_degraded());

    let on_disk = persisted(&store).await;
    assert_eq!(on_disk.len(), 2);
    assert!(is_favorite(find_by_id(&on_disk, "n1").unwrap()));
}
