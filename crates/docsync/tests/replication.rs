//! End-to-end replication scenarios.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;

use docsync::replicate::{LEVEL_CHANGE, LEVEL_NO_CHANGE};
use docsync::store::{MemoryStorage, SortKey, SortOrder, SqliteStorage, UuidStorage};
use docsync::{
    ConflictPolicy, ContentHash, Outcome, QueryOptions, ReplicateConfig, ReplicateStorage, Side,
    Storage, StorageExt,
};
use docsync_testkit::{seed, InstrumentedStorage, ReplicationFixture, TransferEvent};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn verbose() -> ReplicateConfig {
    ReplicateConfig {
        report_level: Some(LEVEL_NO_CHANGE),
        ..ReplicateConfig::default()
    }
    .with_all_attachment_checks()
}

fn thirty_a() -> Bytes {
    Bytes::from("a".repeat(30))
}

#[tokio::test]
async fn test_document_and_attachment_reach_remote() {
    init_tracing();
    let local = Arc::new(MemoryStorage::new());
    let remote = Arc::new(MemoryStorage::new());
    let storage = ReplicateStorage::new(local.clone(), remote.clone(), verbose()).unwrap();

    storage.put("foo", json!({"title": "foo"})).await.unwrap();
    storage.put_attachment("foo", "foo", thirty_a()).await.unwrap();

    let report = storage.repair_report().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::PutRemote, "foo", None),
            (Outcome::PutRemoteAttachment, "foo", Some("foo")),
        ]
    );
    assert_eq!(remote.get("foo").await.unwrap(), json!({"title": "foo"}));
    assert_eq!(remote.get_attachment("foo", "foo").await.unwrap(), thirty_a());

    let signatures = storage.replicator().signatures();
    assert_eq!(
        signatures.get_attachment("foo", "foo").await.unwrap().map(|h| h.to_hex()),
        Some("cd762363c1c11ecb48611583520bba111f0034d4".to_string())
    );
    assert_eq!(
        signatures.get_hash("foo").await.unwrap(),
        Some(ContentHash::of_body(&json!({"title": "foo"})).unwrap())
    );

    let report = storage.repair_report().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::NoChange, "foo", None),
            (Outcome::NoChangeAttachment, "foo", Some("foo")),
        ]
    );
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_attachment_conflict_keeps_local() {
    let fixture = ReplicationFixture::new();
    let config = ReplicateConfig {
        conflict_handling: ConflictPolicy::KeepLocal,
        ..verbose()
    };
    let replicator = fixture.replicator(config).unwrap();

    fixture.local.put("doc", json!({"title": "doc"})).await.unwrap();
    replicator.repair().await.unwrap();

    fixture
        .local
        .put_attachment("doc", "conflict", Bytes::from_static(b"local"))
        .await
        .unwrap();
    fixture
        .remote
        .put_attachment("doc", "conflict", Bytes::from_static(b"remote"))
        .await
        .unwrap();

    let report = replicator.repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::NoChange, "doc", None),
            (Outcome::ForcePutRemoteAttachment, "doc", Some("conflict")),
        ]
    );

    for side in [&fixture.local, &fixture.remote] {
        assert_eq!(
            side.get_attachment_text("doc", "conflict").await.unwrap(),
            "local"
        );
    }
    assert_eq!(
        replicator
            .signatures()
            .get_attachment("doc", "conflict")
            .await
            .unwrap(),
        Some(ContentHash::of_bytes(b"local"))
    );
}

#[tokio::test]
async fn test_identical_changes_are_false_conflicts() {
    let fixture = ReplicationFixture::new();
    let replicator = fixture.replicator(verbose()).unwrap();

    seed(&*fixture.local, "doc", json!({"v": 1}), &[("a", &b"same"[..])])
        .await
        .unwrap();
    seed(&*fixture.remote, "doc", json!({"v": 1}), &[("a", &b"same"[..])])
        .await
        .unwrap();

    let report = replicator.repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::FalseConflict, "doc", None),
            (Outcome::FalseConflictAttachment, "doc", Some("a")),
        ]
    );
    assert!(!report.has_error());

    let report = replicator.repair().await.unwrap();
    assert_eq!(report.count(Outcome::NoChange), 1);
    assert_eq!(report.count(Outcome::NoChangeAttachment), 1);
}

#[tokio::test]
async fn test_deletion_cascades_to_attachments_and_signatures() {
    let local = Arc::new(MemoryStorage::new());
    let remote = Arc::new(MemoryStorage::new());
    let storage = ReplicateStorage::new(local.clone(), remote.clone(), verbose()).unwrap();

    seed(&storage, "doc", json!({}), &[("a", &b"1"[..]), ("b", &b"2"[..])])
        .await
        .unwrap();
    storage.repair().await.unwrap();
    assert_eq!(remote.all_attachments("doc").await.unwrap().len(), 2);

    storage.remove("doc").await.unwrap();
    let report = storage.repair_report().await.unwrap();

    assert_eq!(report.summary(), vec![(Outcome::DeleteRemote, "doc", None)]);
    assert!(remote.is_empty());
    let signatures = storage.replicator().signatures();
    assert!(signatures.list_ids().await.unwrap().is_empty());
    assert!(signatures.attachment_names("doc").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_changed_attachment_blocks_deletion() {
    init_tracing();
    let fixture = ReplicationFixture::new();
    let replicator = fixture.replicator(verbose()).unwrap();

    seed(&*fixture.local, "doc", json!({}), &[("a", &b"1"[..])])
        .await
        .unwrap();
    replicator.repair().await.unwrap();

    fixture.local.remove("doc").await.unwrap();
    fixture
        .remote
        .put_attachment("doc", "a", Bytes::from_static(b"changed"))
        .await
        .unwrap();

    let report = replicator.repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![(Outcome::UnexpectedRemoteAttachment, "doc", None)]
    );
    assert!(report.has_error());
    assert!(fixture.remote.get_optional("doc").await.unwrap().is_some());

    let strict = fixture
        .replicator(ReplicateConfig::default().with_all_attachment_checks())
        .unwrap();
    let err = strict.repair().await.unwrap_err();
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn test_documents_leaving_the_scope_are_deleted_remotely() {
    let fixture = ReplicationFixture::new();

    seed(&*fixture.local, "id", json!({"title": "first"}), &[("foo", &b"x"[..])])
        .await
        .unwrap();
    fixture.replicator(verbose()).unwrap().repair().await.unwrap();

    fixture
        .local
        .put("second", json!({"title": "second"}))
        .await
        .unwrap();

    let config = ReplicateConfig {
        query: Some(QueryOptions {
            sort_on: vec![SortKey("title".into(), SortOrder::Descending)],
            limit: Some((0, 1)),
            ..QueryOptions::default()
        }),
        ..verbose()
    };
    let report = fixture.replicator(config).unwrap().repair().await.unwrap();

    assert_eq!(
        report.summary(),
        vec![
            (Outcome::PutRemote, "second", None),
            (Outcome::NoChangeAttachment, "id", Some("foo")),
            (Outcome::DeleteRemote, "id", None),
        ]
    );
    assert!(fixture.remote.get_optional("id").await.unwrap().is_none());
    assert!(fixture.local.get_optional("id").await.unwrap().is_some());
}

fn title_window(config: ReplicateConfig) -> ReplicateConfig {
    ReplicateConfig {
        query: Some(QueryOptions {
            sort_on: vec![SortKey("title".into(), SortOrder::Descending)],
            limit: Some((0, 1)),
            ..QueryOptions::default()
        }),
        ..config
    }
}

/// Replicates `id` once, then adds a better-ranked document on `crowded` so
/// `id` drops out of that side's scope while both sides rewrite its
/// attachment.
async fn crowd_out_with_attachment_conflict(
    fixture: &ReplicationFixture,
    config: &ReplicateConfig,
    crowded: Side,
) {
    seed(&*fixture.local, "id", json!({"title": "a"}), &[("foo", &b"a"[..])])
        .await
        .unwrap();
    fixture.replicator(config.clone()).unwrap().repair().await.unwrap();
    assert_eq!(
        fixture.remote.get_attachment("id", "foo").await.unwrap(),
        Bytes::from_static(b"a")
    );

    let newcomer: &dyn Storage = match crowded {
        Side::Local => &*fixture.local,
        Side::Remote => &*fixture.remote,
    };
    newcomer.put("second", json!({"title": "b"})).await.unwrap();
    fixture
        .local
        .put_attachment("id", "foo", Bytes::from_static(b"b"))
        .await
        .unwrap();
    fixture
        .remote
        .put_attachment("id", "foo", Bytes::from_static(b"c"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_scope_window_ignores_signature_document() {
    let local = Arc::new(MemoryStorage::new());
    let remote = Arc::new(MemoryStorage::new());
    let config = title_window(ReplicateConfig {
        report_level: Some(LEVEL_CHANGE),
        ..ReplicateConfig::default()
    });
    let storage = ReplicateStorage::new(local.clone(), remote.clone(), config).unwrap();

    storage.put("a", json!({"title": "a"})).await.unwrap();

    let first = storage.repair_report().await.unwrap();
    assert_eq!(first.summary(), vec![(Outcome::PutRemote, "a", None)]);

    let second = storage.repair_report().await.unwrap();
    assert!(second.is_empty(), "{:?}", second.summary());
    assert_eq!(remote.get("a").await.unwrap(), json!({"title": "a"}));
    assert_eq!(local.len(), 2);
}

#[tokio::test]
async fn test_local_scope_exit_with_attachment_conflict() {
    let fixture = ReplicationFixture::new();
    let config = title_window(verbose());
    crowd_out_with_attachment_conflict(&fixture, &config, Side::Local).await;

    let report = fixture.replicator(config).unwrap().repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::PutRemote, "second", None),
            (Outcome::UnresolvedAttachmentConflict, "id", Some("foo")),
            (Outcome::UnexpectedRemoteAttachment, "id", None),
        ]
    );
    assert!(report.has_error());
    assert_eq!(
        fixture.remote.get_attachment("id", "foo").await.unwrap(),
        Bytes::from_static(b"c")
    );
}

#[tokio::test]
async fn test_local_scope_exit_with_attachment_conflict_fails_fast() {
    let fixture = ReplicationFixture::new();
    let config = title_window(ReplicateConfig::default().with_all_attachment_checks());
    crowd_out_with_attachment_conflict(&fixture, &config, Side::Local).await;

    let err = fixture.replicator(config).unwrap().repair().await.unwrap_err();
    assert_eq!(err.status_code(), 409);
    assert!(fixture.remote.get_optional("id").await.unwrap().is_some());
}

#[tokio::test]
async fn test_local_scope_exit_keeps_remote_attachment() {
    let fixture = ReplicationFixture::new();
    let config = title_window(ReplicateConfig {
        conflict_handling: ConflictPolicy::KeepRemote,
        ..verbose()
    });
    crowd_out_with_attachment_conflict(&fixture, &config, Side::Local).await;

    let report = fixture.replicator(config).unwrap().repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::PutRemote, "second", None),
            (Outcome::ForcePutLocalAttachment, "id", Some("foo")),
            (Outcome::DeleteRemote, "id", None),
        ]
    );
    assert!(!report.has_error());
    assert_eq!(
        fixture.local.get_attachment("id", "foo").await.unwrap(),
        Bytes::from_static(b"c")
    );
    assert!(fixture.remote.get_optional("id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_scope_exit_with_attachment_conflict() {
    let fixture = ReplicationFixture::new();
    let config = title_window(verbose());
    crowd_out_with_attachment_conflict(&fixture, &config, Side::Remote).await;

    let report = fixture.replicator(config).unwrap().repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::PutLocal, "second", None),
            (Outcome::UnresolvedAttachmentConflict, "id", Some("foo")),
            (Outcome::UnexpectedLocalAttachment, "id", None),
        ]
    );
    assert!(report.has_error());
    assert!(fixture.local.get_optional("id").await.unwrap().is_some());
}

#[tokio::test]
async fn test_remote_scope_exit_keeps_local_attachment() {
    let fixture = ReplicationFixture::new();
    let config = title_window(ReplicateConfig {
        conflict_handling: ConflictPolicy::KeepLocal,
        ..verbose()
    });
    crowd_out_with_attachment_conflict(&fixture, &config, Side::Remote).await;

    let report = fixture.replicator(config).unwrap().repair().await.unwrap();
    assert_eq!(
        report.summary(),
        vec![
            (Outcome::PutLocal, "second", None),
            (Outcome::ForcePutRemoteAttachment, "id", Some("foo")),
            (Outcome::DeleteLocal, "id", None),
        ]
    );
    assert_eq!(
        fixture.remote.get_attachment("id", "foo").await.unwrap(),
        Bytes::from_static(b"b")
    );
    assert!(fixture.local.get_optional("id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_post_rekeys_local_document() {
    let local = Arc::new(MemoryStorage::new());
    let remote = Arc::new(UuidStorage::new(MemoryStorage::new()));
    let signatures = Arc::new(MemoryStorage::new());
    let config = ReplicateConfig {
        use_remote_post: true,
        report_level: Some(LEVEL_CHANGE),
        ..ReplicateConfig::default()
    }
    .with_all_attachment_checks();
    let storage = ReplicateStorage::with_signature_storage(
        local.clone(),
        remote.clone(),
        signatures,
        config,
    )
    .unwrap();

    seed(&*local, "draft", json!({"title": "draft"}), &[("x", &b"data"[..])])
        .await
        .unwrap();
    let report = storage.repair_report().await.unwrap();

    let entries = report.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].outcome, Outcome::PostRemote);
    assert_eq!(entries[0].id, "draft");
    let new_id = entries[0].message.clone().unwrap();
    assert_ne!(new_id, "draft");
    assert_eq!(entries[1].outcome, Outcome::PutRemoteAttachment);
    assert_eq!(entries[1].id, new_id);

    assert!(local.get_optional("draft").await.unwrap().is_none());
    assert_eq!(local.get(&new_id).await.unwrap(), json!({"title": "draft"}));
    assert_eq!(remote.get(&new_id).await.unwrap(), json!({"title": "draft"}));
    assert_eq!(
        remote.get_attachment(&new_id, "x").await.unwrap(),
        Bytes::from_static(b"data")
    );
}

#[tokio::test]
async fn test_remote_post_requires_capability() {
    let fixture = ReplicationFixture::new();
    fixture.local.put("draft", json!({})).await.unwrap();

    let config = ReplicateConfig {
        use_remote_post: true,
        ..ReplicateConfig::default()
    };
    let err = fixture.replicator(config).unwrap().repair().await.unwrap_err();
    assert_eq!(err.status_code(), 501);
}

#[tokio::test]
async fn test_unresolved_conflict_fails_fast() {
    let fixture = ReplicationFixture::new();
    fixture.local.put("a", json!({"v": 1})).await.unwrap();
    fixture.remote.put("a", json!({"v": 2})).await.unwrap();
    fixture.local.put("b", json!({"v": 1})).await.unwrap();

    let storage = ReplicateStorage::with_signature_storage(
        fixture.local.clone(),
        fixture.remote.clone(),
        fixture.signatures.clone(),
        ReplicateConfig::default(),
    )
    .unwrap();

    let err = storage.repair().await.unwrap_err();
    assert_eq!(err.status_code(), 409);
    assert_eq!(err.to_string(), "Conflict on 'a'");
    assert_eq!(fixture.remote.get("a").await.unwrap(), json!({"v": 2}));
}

#[tokio::test]
async fn test_attachment_uploads_are_bounded() {
    init_tracing();
    let local = Arc::new(MemoryStorage::new());
    let remote = Arc::new(InstrumentedStorage::new(Duration::from_millis(25)));
    let config = ReplicateConfig {
        parallel_operation_attachment_amount: 2,
        ..verbose()
    };
    let storage = ReplicateStorage::with_signature_storage(
        local.clone(),
        remote.clone(),
        Arc::new(MemoryStorage::new()),
        config,
    )
    .unwrap();

    let attachments: Vec<(String, Vec<u8>)> = (0..4)
        .map(|i| (format!("part{}", i), vec![b'x'; i + 1]))
        .collect();
    local.put("doc", json!({})).await.unwrap();
    for (name, data) in &attachments {
        local
            .put_attachment("doc", name, Bytes::from(data.clone()))
            .await
            .unwrap();
    }

    let report = storage.repair_report().await.unwrap();
    assert_eq!(report.count(Outcome::PutRemoteAttachment), 4);
    assert_eq!(remote.peak_in_flight(), 2);

    let mut in_flight = 0usize;
    for event in remote.events() {
        match event {
            TransferEvent::Start(_) => in_flight += 1,
            TransferEvent::Stop(_) => in_flight -= 1,
        }
        assert!(in_flight <= 2);
    }
    assert_eq!(in_flight, 0);
    assert_eq!(remote.events().len(), 8);

    let names: Vec<_> = report
        .entries()
        .iter()
        .filter_map(|e| e.attachment.as_deref())
        .collect();
    assert_eq!(names, vec!["part0", "part1", "part2", "part3"]);
}

#[tokio::test]
async fn test_sqlite_pair_built_from_spec() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let local_path = dir.path().join("local.db");
    let remote_path = dir.path().join("remote.db");

    let storage = docsync::registry()
        .create_from_json(json!({
            "type": "replicate",
            "local_sub_storage": {"type": "sqlite", "path": local_path.to_str().unwrap()},
            "remote_sub_storage": {"type": "sqlite", "path": remote_path.to_str().unwrap()},
            "check_local_attachment_creation": true,
            "parallel_operation_amount": 4,
        }))
        .unwrap();

    for i in 0..5 {
        storage
            .put(&format!("doc{}", i), json!({"n": i}))
            .await
            .unwrap();
    }
    storage
        .put_attachment("doc0", "blob", Bytes::from_static(b"blob"))
        .await
        .unwrap();
    storage.repair().await.unwrap();
    storage.repair().await.unwrap();

    let remote = SqliteStorage::open(&remote_path).unwrap();
    let rows = remote.build_query(&QueryOptions::list()).await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(remote.get("doc3").await.unwrap(), json!({"n": 3}));
    assert_eq!(
        remote.get_attachment("doc0", "blob").await.unwrap(),
        Bytes::from_static(b"blob")
    );
}
