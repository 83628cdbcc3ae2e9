//! Marker definitions for the migration and ARM64 lifecycles

use k8s_openapi::api::core::v1::{
    NodeSelectorRequirement, NodeSelectorTerm, PreferredSchedulingTerm, Toleration,
};
use serde::{Deserialize, Serialize};

/// Well-known node label carrying the CPU architecture
pub const ARCH_LABEL: &str = "kubernetes.io/arch";

/// Target architecture value
pub const ARM64: &str = "arm64";

/// Names and values of the tolerations, selector and affinity term this tool manages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    pub migration_toleration_key: String,
    pub migration_toleration_value: String,
    pub migration_node_selector_key: String,
    pub migration_node_selector_value: String,
    pub arm_toleration_key: String,
    pub arm_toleration_value: String,
    pub arm_preference_weight: i32,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            migration_toleration_key: "cloudpilot.ai/provider-disable".to_string(),
            migration_toleration_value: "true".to_string(),
            migration_node_selector_key: "node.cloudpilot.ai/managed".to_string(),
            migration_node_selector_value: "true".to_string(),
            arm_toleration_key: ARCH_LABEL.to_string(),
            arm_toleration_value: ARM64.to_string(),
            arm_preference_weight: 100,
        }
    }
}

impl MarkerSet {
    pub fn migration_toleration(&self) -> Toleration {
        no_schedule_toleration(
            &self.migration_toleration_key,
            &self.migration_toleration_value,
        )
    }

    pub fn arm_toleration(&self) -> Toleration {
        no_schedule_toleration(&self.arm_toleration_key, &self.arm_toleration_value)
    }

    /// Soft node affinity towards `kubernetes.io/arch In [arm64]`
    pub fn arm_preference(&self) -> PreferredSchedulingTerm {
        PreferredSchedulingTerm {
            weight: self.arm_preference_weight,
            preference: NodeSelectorTerm {
                match_expressions: Some(vec![NodeSelectorRequirement {
                    key: ARCH_LABEL.to_string(),
                    operator: "In".to_string(),
                    values: Some(vec![ARM64.to_string()]),
                }]),
                match_fields: None,
            },
        }
    }
}

fn no_schedule_toleration(key: &str, value: &str) -> Toleration {
    Toleration {
        key: Some(key.to_string()),
        operator: Some("Equal".to_string()),
        value: Some(value.to_string()),
        effect: Some("NoSchedule".to_string()),
        toleration_seconds: None,
    }
}
