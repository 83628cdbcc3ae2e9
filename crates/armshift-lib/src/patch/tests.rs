use super::*;
use crate::cluster::fake::FakeStore;
use crate::constraints::{BatchDirective, Concern, MarkerSet, SchedulingConstraints};
use crate::models::fixtures::{deployment, statefulset};
use crate::models::{WorkloadKey, WorkloadKind};
use crate::observability::EventLogger;
use k8s_openapi::api::core::v1::{Affinity, NodeAffinity};
use serde_json::json;
use std::sync::Arc;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        interval_ms: 1,
    }
}

fn applier(store: Arc<FakeStore>) -> PatchApplier {
    PatchApplier::new(
        store,
        fast_policy(),
        MarkerSet::default(),
        EventLogger::new("test"),
    )
}

fn key(name: &str) -> WorkloadKey {
    WorkloadKey::new(WorkloadKind::Deployment, "shop", name)
}

fn constraints_of(store: &FakeStore, key: &WorkloadKey) -> SchedulingConstraints {
    store
        .object(key)
        .and_then(|r| r.pod_spec().map(SchedulingConstraints::from_pod_spec))
        .unwrap_or_default()
}

#[tokio::test]
async fn test_partial_batch_failure_continues() {
    let store = Arc::new(FakeStore::with(vec![
        deployment("shop", "one", &["a"]),
        deployment("shop", "two", &["b"]),
        deployment("shop", "three", &["c"]),
    ]));
    store.fail_patches(&key("two"), usize::MAX);

    let keys = vec![key("one"), key("two"), key("three")];
    let report = applier(store.clone())
        .run(BatchDirective::Migrate, &keys)
        .await;

    assert_eq!(report.workloads[0].status, PatchStatus::Patched { attempts: 1 });
    assert!(matches!(report.workloads[1].status, PatchStatus::Failed { .. }));
    assert_eq!(report.workloads[2].status, PatchStatus::Patched { attempts: 1 });
    assert_eq!(store.patch_count(&key("one")), 1);
    assert_eq!(store.patch_count(&key("two")), 5);
    assert_eq!(store.patch_count(&key("three")), 1);
    assert_eq!((report.patched(), report.unchanged(), report.failed()), (2, 0, 1));

    let markers = MarkerSet::default();
    assert!(constraints_of(&store, &key("one")).migration_applied(&markers));
    assert!(!constraints_of(&store, &key("two")).migration_applied(&markers));
}

#[tokio::test]
async fn test_transient_write_errors_are_retried() {
    let store = Arc::new(FakeStore::with(vec![deployment("shop", "web", &["nginx"])]));
    store.fail_patches(&key("web"), 2);

    let report = applier(store.clone())
        .run(BatchDirective::ArmPatch, &[key("web")])
        .await;

    assert_eq!(report.workloads[0].status, PatchStatus::Patched { attempts: 3 });
    assert_eq!(store.patch_count(&key("web")), 3);
}

#[tokio::test]
async fn test_patch_contains_only_changed_field() {
    let markers = MarkerSet::default();
    let mut resource = deployment("shop", "web", &["nginx"]);
    resource.pod_spec_mut().affinity = Some(Affinity {
        node_affinity: Some(NodeAffinity {
            preferred_during_scheduling_ignored_during_execution: Some(vec![
                markers.arm_preference(),
            ]),
            ..Default::default()
        }),
        ..Default::default()
    });
    let store = Arc::new(FakeStore::with(vec![resource]));

    let report = applier(store.clone())
        .run(BatchDirective::ArmPatch, &[key("web")])
        .await;

    assert_eq!(report.workloads[0].status, PatchStatus::Patched { attempts: 1 });
    assert_eq!(
        report.workloads[0].skipped.iter().map(|s| s.concern).collect::<Vec<_>>(),
        vec![Concern::Affinity]
    );

    let patches = store.patches.lock().unwrap();
    assert_eq!(patches.len(), 1);
    let tolerations = serde_json::to_value(vec![markers.arm_toleration()]).unwrap();
    assert_eq!(
        patches[0].1,
        json!({"spec": {"template": {"spec": {"tolerations": tolerations}}}})
    );
}

#[tokio::test]
async fn test_repeat_is_unchanged_without_write() {
    let store = Arc::new(FakeStore::with(vec![statefulset("shop", "db", &["postgres"])]));
    let db = WorkloadKey::new(WorkloadKind::StatefulSet, "shop", "db");
    let applier = applier(store.clone());

    let first = applier.run(BatchDirective::Migrate, &[db.clone()]).await;
    let second = applier.run(BatchDirective::Migrate, &[db.clone()]).await;

    assert_eq!(first.workloads[0].status, PatchStatus::Patched { attempts: 1 });
    assert_eq!(second.workloads[0].status, PatchStatus::Unchanged);
    assert_eq!(second.workloads[0].skipped.len(), 2);
    assert_eq!(store.patch_count(&db), 1);
}

#[tokio::test]
async fn test_rollback_restores_constraints() {
    let store = Arc::new(FakeStore::with(vec![deployment("shop", "web", &["nginx"])]));
    let applier = applier(store.clone());
    let before = constraints_of(&store, &key("web"));

    applier.run(BatchDirective::ArmPatch, &[key("web")]).await;
    assert!(constraints_of(&store, &key("web")).arm_patched(&MarkerSet::default()));

    let report = applier
        .run(BatchDirective::RollbackArmPatch, &[key("web")])
        .await;
    assert_eq!(report.workloads[0].status, PatchStatus::Patched { attempts: 1 });
    assert_eq!(constraints_of(&store, &key("web")), before);
}

#[tokio::test]
async fn test_read_failure_reported_per_workload() {
    let mut store = FakeStore::with(vec![
        deployment("shop", "one", &["a"]),
        deployment("shop", "two", &["b"]),
    ]);
    store.failing_gets.insert(key("one"));
    let store = Arc::new(store);

    let report = applier(store.clone())
        .run(BatchDirective::Migrate, &[key("one"), key("missing"), key("two")])
        .await;

    match &report.workloads[0].status {
        PatchStatus::Failed { error } => assert!(error.starts_with("get Deployment")),
        other => panic!("expected read failure, got {:?}", other),
    }
    assert!(matches!(report.workloads[1].status, PatchStatus::Failed { .. }));
    assert_eq!(report.workloads[2].status, PatchStatus::Patched { attempts: 1 });
    assert_eq!(store.patch_count(&key("one")), 0);
}

#[tokio::test]
async fn test_apply_with_identical_documents_skips_write() {
    let store = Arc::new(FakeStore::default());
    let doc = json!({"spec": {"replicas": 1}});

    let status = applier(store.clone())
        .apply(&doc, &doc, &key("web"))
        .await
        .unwrap();

    assert_eq!(status, PatchStatus::Unchanged);
    assert_eq!(store.patch_count(&key("web")), 0);
}
