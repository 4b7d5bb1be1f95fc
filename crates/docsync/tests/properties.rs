//! Property tests over generated replication scenarios.

use proptest::prelude::*;
use serde_json::json;

use docsync::replicate::LEVEL_NO_CHANGE;
use docsync::{ConflictPolicy, Outcome, ReplicateConfig, Storage, StorageExt};
use docsync_testkit::generators::{scenarios, DocumentScenario};
use docsync_testkit::ReplicationFixture;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn load(fixture: &ReplicationFixture, items: &[DocumentScenario]) {
    for item in items {
        if let Some(body) = &item.local {
            fixture.local.put(&item.id, body.clone()).await.unwrap();
        }
        if let Some(body) = &item.remote {
            fixture.remote.put(&item.id, body.clone()).await.unwrap();
        }
    }
}

fn config(policy: ConflictPolicy) -> ReplicateConfig {
    ReplicateConfig {
        conflict_handling: policy,
        report_level: Some(LEVEL_NO_CHANGE),
        parallel_operation_amount: 3,
        ..ReplicateConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn winner_policy_converges(
        items in scenarios(8),
        keep_local in any::<bool>(),
    ) {
        let policy = if keep_local { ConflictPolicy::KeepLocal } else { ConflictPolicy::KeepRemote };
        runtime().block_on(async {
            let fixture = ReplicationFixture::new();
            load(&fixture, &items).await;
            let replicator = fixture.replicator(config(policy)).unwrap();

            let report = replicator.repair().await.unwrap();
            prop_assert!(!report.has_error());

            for item in &items {
                let expected = match (&item.local, &item.remote) {
                    (Some(l), Some(_)) if keep_local => l.clone(),
                    (_, Some(r)) => r.clone(),
                    (Some(l), None) => l.clone(),
                    (None, None) => unreachable!(),
                };
                prop_assert_eq!(fixture.local.get(&item.id).await.unwrap(), expected.clone());
                prop_assert_eq!(fixture.remote.get(&item.id).await.unwrap(), expected);
            }

            let again = replicator.repair().await.unwrap();
            prop_assert_eq!(again.len(), items.len());
            prop_assert_eq!(again.count(Outcome::NoChange), items.len());
            Ok(())
        })?;
    }

    #[test]
    fn continue_policy_leaves_conflicts_alone(items in scenarios(8)) {
        runtime().block_on(async {
            let fixture = ReplicationFixture::new();
            load(&fixture, &items).await;
            let replicator = fixture.replicator(config(ConflictPolicy::Continue)).unwrap();

            let report = replicator.repair().await.unwrap();
            for item in &items {
                if let (Some(l), Some(r)) = (&item.local, &item.remote) {
                    if l != r {
                        prop_assert_eq!(
                            report.for_id(&item.id).map(|e| e.outcome).collect::<Vec<_>>(),
                            vec![Outcome::SkipConflict]
                        );
                        prop_assert_eq!(fixture.local.get(&item.id).await.unwrap(), l.clone());
                        prop_assert_eq!(fixture.remote.get(&item.id).await.unwrap(), r.clone());
                    }
                }
            }
            Ok(())
        })?;
    }
}

#[test]
fn repair_is_idempotent_with_attachments() {
    runtime().block_on(async {
        let fixture = ReplicationFixture::new();
        let replicator = fixture
            .replicator(config(ConflictPolicy::KeepLocal).with_all_attachment_checks())
            .unwrap();

        fixture.local.put("a", json!({"n": 1})).await.unwrap();
        fixture
            .local
            .put_attachment_json("a", "meta", &json!({"k": "v"}))
            .await
            .unwrap();
        fixture.remote.put("b", json!({"n": 2})).await.unwrap();

        replicator.repair().await.unwrap();
        let again = replicator.repair().await.unwrap();

        assert!(again
            .entries()
            .iter()
            .all(|e| matches!(e.outcome, Outcome::NoChange | Outcome::NoChangeAttachment)));
        assert_eq!(again.len(), 3);
        let meta: serde_json::Value = fixture
            .remote
            .get_attachment_json("a", "meta")
            .await
            .unwrap();
        assert_eq!(meta, json!({"k": "v"}));
    });
}
