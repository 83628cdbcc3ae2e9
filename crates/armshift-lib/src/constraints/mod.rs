//! Scheduling constraint mutation
//!
//! Pure functions over a workload's node-affinity preferences, tolerations
//! and node selector. Nothing in this module performs I/O.

mod directive;
mod markers;

#[cfg(test)]
mod tests;

pub use directive::{plan, BatchDirective, Concern, ConstraintDirective, Plan, Skip};
pub use markers::{MarkerSet, ARCH_LABEL, ARM64};

use k8s_openapi::api::core::v1::{PodSpec, PreferredSchedulingTerm, Toleration};
use std::collections::BTreeMap;

/// Normalized view of the scheduling fields of a pod spec
///
/// Absent lists and maps are loaded as empty, so mutators never need to
/// distinguish `None` from empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulingConstraints {
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
    pub preferred_terms: Vec<PreferredSchedulingTerm>,
}

impl SchedulingConstraints {
    pub fn from_pod_spec(spec: &PodSpec) -> Self {
        Self {
            node_selector: spec.node_selector.clone().unwrap_or_default(),
            tolerations: spec.tolerations.clone().unwrap_or_default(),
            preferred_terms: spec
                .affinity
                .as_ref()
                .and_then(|a| a.node_affinity.as_ref())
                .and_then(|n| n.preferred_during_scheduling_ignored_during_execution.clone())
                .unwrap_or_default(),
        }
    }

    /// Write back only the fields that differ from `baseline`
    ///
    /// Untouched fields keep their original shape (including `None`), so a
    /// merge patch computed afterwards only names what actually changed.
    pub fn write_to(&self, spec: &mut PodSpec, baseline: &SchedulingConstraints) {
        if self.node_selector != baseline.node_selector {
            spec.node_selector = Some(self.node_selector.clone());
        }
        if self.tolerations != baseline.tolerations {
            spec.tolerations = Some(self.tolerations.clone());
        }
        if self.preferred_terms != baseline.preferred_terms {
            let node_affinity = spec
                .affinity
                .get_or_insert_with(Default::default)
                .node_affinity
                .get_or_insert_with(Default::default);
            node_affinity.preferred_during_scheduling_ignored_during_execution =
                Some(self.preferred_terms.clone());
        }
    }

    pub fn migration_applied(&self, markers: &MarkerSet) -> bool {
        has_node_selector_marker(
            &self.node_selector,
            &markers.migration_node_selector_key,
            &markers.migration_node_selector_value,
        ) && has_toleration_marker(&self.tolerations, &markers.migration_toleration_key)
    }

    pub fn arm_patched(&self, markers: &MarkerSet) -> bool {
        has_preferred_term(&self.preferred_terms, &markers.arm_preference())
            || has_toleration_marker(&self.tolerations, &markers.arm_toleration_key)
    }
}

/// Preference terms are equal when their selector expressions are equal; weight is ignored
fn same_preference(a: &PreferredSchedulingTerm, b: &PreferredSchedulingTerm) -> bool {
    a.preference == b.preference
}

pub fn has_preferred_term(list: &[PreferredSchedulingTerm], term: &PreferredSchedulingTerm) -> bool {
    list.iter().any(|t| same_preference(t, term))
}

pub fn add_preferred_term(
    list: &[PreferredSchedulingTerm],
    term: &PreferredSchedulingTerm,
) -> Vec<PreferredSchedulingTerm> {
    let mut out = list.to_vec();
    if !has_preferred_term(list, term) {
        out.push(term.clone());
    }
    out
}

pub fn remove_preferred_term(
    list: &[PreferredSchedulingTerm],
    term: &PreferredSchedulingTerm,
) -> Vec<PreferredSchedulingTerm> {
    list.iter()
        .filter(|t| !same_preference(t, term))
        .cloned()
        .collect()
}

/// Tolerations are markers identified by key alone
pub fn has_toleration_marker(list: &[Toleration], key: &str) -> bool {
    list.iter().any(|t| t.key.as_deref() == Some(key))
}

pub fn add_toleration_marker(list: &[Toleration], marker: &Toleration) -> Vec<Toleration> {
    let mut out = list.to_vec();
    let present = marker
        .key
        .as_deref()
        .map(|key| has_toleration_marker(list, key))
        .unwrap_or(false);
    if !present {
        out.push(marker.clone());
    }
    out
}

pub fn remove_toleration_marker(list: &[Toleration], key: &str) -> Vec<Toleration> {
    list.iter()
        .filter(|t| t.key.as_deref() != Some(key))
        .cloned()
        .collect()
}

pub fn has_node_selector_marker(selector: &BTreeMap<String, String>, key: &str, value: &str) -> bool {
    selector.get(key).map(|v| v == value).unwrap_or(false)
}

pub fn set_node_selector_marker(
    selector: &BTreeMap<String, String>,
    key: &str,
    value: &str,
) -> BTreeMap<String, String> {
    let mut out = selector.clone();
    out.insert(key.to_string(), value.to_string());
    out
}

pub fn remove_node_selector_marker(
    selector: &BTreeMap<String, String>,
    key: &str,
) -> BTreeMap<String, String> {
    let mut out = selector.clone();
    out.remove(key);
    out
}
