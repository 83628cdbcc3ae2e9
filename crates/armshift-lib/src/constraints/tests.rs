use super::*;
use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelectorRequirement, NodeSelectorTerm, PodSpec,
    PreferredSchedulingTerm, Toleration,
};

fn zone_preference() -> PreferredSchedulingTerm {
    PreferredSchedulingTerm {
        weight: 10,
        preference: NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: "topology.kubernetes.io/zone".to_string(),
                operator: "In".to_string(),
                values: Some(vec!["eu-west-1a".to_string()]),
            }]),
            match_fields: None,
        },
    }
}

fn gpu_toleration() -> Toleration {
    Toleration {
        key: Some("nvidia.com/gpu".to_string()),
        operator: Some("Exists".to_string()),
        effect: Some("NoSchedule".to_string()),
        ..Default::default()
    }
}

fn seeded() -> SchedulingConstraints {
    SchedulingConstraints {
        node_selector: [("disktype".to_string(), "ssd".to_string())].into(),
        tolerations: vec![gpu_toleration()],
        preferred_terms: vec![zone_preference()],
    }
}

#[test]
fn test_from_pod_spec_normalizes_absent_fields() {
    let constraints = SchedulingConstraints::from_pod_spec(&PodSpec::default());
    assert_eq!(constraints, SchedulingConstraints::default());

    let spec = PodSpec {
        affinity: Some(Affinity {
            node_affinity: Some(NodeAffinity {
                preferred_during_scheduling_ignored_during_execution: Some(vec![
                    zone_preference(),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        tolerations: Some(vec![gpu_toleration()]),
        ..Default::default()
    };
    let constraints = SchedulingConstraints::from_pod_spec(&spec);
    assert_eq!(constraints.preferred_terms, vec![zone_preference()]);
    assert_eq!(constraints.tolerations.len(), 1);
    assert!(constraints.node_selector.is_empty());
}

#[test]
fn test_write_to_leaves_unchanged_fields_alone() {
    let mut spec = PodSpec::default();
    let baseline = SchedulingConstraints::from_pod_spec(&spec);
    let mut desired = baseline.clone();
    desired.tolerations = vec![gpu_toleration()];

    desired.write_to(&mut spec, &baseline);

    assert_eq!(spec.tolerations, Some(vec![gpu_toleration()]));
    assert!(spec.node_selector.is_none());
    assert!(spec.affinity.is_none());
}

#[test]
fn test_write_to_creates_affinity_path() {
    let mut spec = PodSpec::default();
    let baseline = SchedulingConstraints::default();
    let markers = MarkerSet::default();
    let desired = SchedulingConstraints {
        preferred_terms: vec![markers.arm_preference()],
        ..Default::default()
    };

    desired.write_to(&mut spec, &baseline);

    let terms = spec
        .affinity
        .and_then(|a| a.node_affinity)
        .and_then(|n| n.preferred_during_scheduling_ignored_during_execution)
        .unwrap();
    assert_eq!(terms, vec![markers.arm_preference()]);
}

#[test]
fn test_add_preferred_term_is_idempotent() {
    let markers = MarkerSet::default();
    let term = markers.arm_preference();
    let once = add_preferred_term(&[zone_preference()], &term);
    let twice = add_preferred_term(&once, &term);

    assert_eq!(once, twice);
    assert_eq!(once.len(), 2);
    assert!(has_preferred_term(&once, &term));
}

#[test]
fn test_preferred_term_match_ignores_weight() {
    let markers = MarkerSet::default();
    let mut heavier = markers.arm_preference();
    heavier.weight = 1;

    assert!(has_preferred_term(&[heavier.clone()], &markers.arm_preference()));
    assert!(remove_preferred_term(&[heavier], &markers.arm_preference()).is_empty());
}

#[test]
fn test_remove_preferred_term_keeps_others() {
    let markers = MarkerSet::default();
    let list = vec![zone_preference(), markers.arm_preference()];
    let removed = remove_preferred_term(&list, &markers.arm_preference());

    assert_eq!(removed, vec![zone_preference()]);
    assert!(!has_preferred_term(&removed, &markers.arm_preference()));
    assert_eq!(remove_preferred_term(&removed, &markers.arm_preference()), removed);
}

#[test]
fn test_toleration_markers_match_by_key() {
    let markers = MarkerSet::default();
    let mut variant = markers.migration_toleration();
    variant.operator = Some("Exists".to_string());
    variant.value = None;

    let list = vec![gpu_toleration(), variant];
    assert!(has_toleration_marker(&list, &markers.migration_toleration_key));
    assert_eq!(
        add_toleration_marker(&list, &markers.migration_toleration()),
        list
    );

    let removed = remove_toleration_marker(&list, &markers.migration_toleration_key);
    assert_eq!(removed, vec![gpu_toleration()]);
    assert!(!has_toleration_marker(&removed, &markers.migration_toleration_key));
}

#[test]
fn test_node_selector_marker() {
    let selector: BTreeMap<String, String> = [("disktype".to_string(), "ssd".to_string())].into();
    let set = set_node_selector_marker(&selector, "node.cloudpilot.ai/managed", "true");

    assert!(has_node_selector_marker(&set, "node.cloudpilot.ai/managed", "true"));
    assert!(!has_node_selector_marker(&set, "node.cloudpilot.ai/managed", "false"));
    assert_eq!(set_node_selector_marker(&set, "node.cloudpilot.ai/managed", "true"), set);

    let removed = remove_node_selector_marker(&set, "node.cloudpilot.ai/managed");
    assert_eq!(removed, selector);
}

#[test]
fn test_migrate_plan_and_rollback_restore_original() {
    let markers = MarkerSet::default();
    let original = seeded();

    let migrated = plan(BatchDirective::Migrate, &original, &markers);
    assert!(migrated.skipped.is_empty());
    assert!(migrated.desired.migration_applied(&markers));
    assert_eq!(migrated.desired.tolerations.len(), 2);

    let rolled_back = plan(BatchDirective::RollbackMigrate, &migrated.desired, &markers);
    assert_eq!(rolled_back.desired, original);
}

#[test]
fn test_repeated_directive_is_noop_with_skips() {
    let markers = MarkerSet::default();
    let first = plan(BatchDirective::ArmPatch, &seeded(), &markers);
    assert!(first.desired.arm_patched(&markers));

    let second = plan(BatchDirective::ArmPatch, &first.desired, &markers);
    assert!(second.is_noop(&first.desired));
    assert_eq!(
        second.skipped,
        vec![
            Skip {
                directive: ConstraintDirective::AddArmPreference,
                concern: Concern::Affinity,
            },
            Skip {
                directive: ConstraintDirective::AddArmToleration,
                concern: Concern::Toleration,
            },
        ]
    );
}

#[test]
fn test_rollback_without_patch_skips_everything() {
    let markers = MarkerSet::default();
    let result = plan(BatchDirective::RollbackArmPatch, &seeded(), &markers);

    assert!(result.is_noop(&seeded()));
    assert_eq!(result.skipped.len(), 2);
    assert_eq!(
        result.skipped[0].describe(),
        "has no arm preference, skip the prefer affinity"
    );
}

#[test]
fn test_partial_migration_only_adds_missing_half() {
    let markers = MarkerSet::default();
    let mut current = seeded();
    current.tolerations.push(markers.migration_toleration());

    let result = plan(BatchDirective::Migrate, &current, &markers);
    assert_eq!(result.desired.tolerations, current.tolerations);
    assert_eq!(
        result.skipped,
        vec![Skip {
            directive: ConstraintDirective::AddMigrationMarker,
            concern: Concern::Toleration,
        }]
    );
    assert!(result.desired.migration_applied(&markers));
}

#[test]
fn test_batch_directive_parse() {
    assert_eq!("migrate".parse::<BatchDirective>(), Ok(BatchDirective::Migrate));
    assert_eq!(
        "arm-rollback".parse::<BatchDirective>(),
        Ok(BatchDirective::RollbackArmPatch)
    );
    assert!("shrink".parse::<BatchDirective>().is_err());
}
