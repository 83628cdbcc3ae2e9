//! Named directives and batch plans

use super::{
    add_preferred_term, add_toleration_marker, has_node_selector_marker, has_preferred_term,
    has_toleration_marker, remove_node_selector_marker, remove_preferred_term,
    remove_toleration_marker, set_node_selector_marker, MarkerSet, SchedulingConstraints,
};
use std::fmt;
use std::str::FromStr;

/// Part of the pod spec a directive touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    Affinity,
    Toleration,
    NodeSelector,
}

/// A single idempotent transformation of scheduling constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintDirective {
    AddArmPreference,
    RemoveArmPreference,
    AddArmToleration,
    RemoveArmToleration,
    AddMigrationMarker,
    RemoveMigrationMarker,
}

impl ConstraintDirective {
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintDirective::AddArmPreference => "add-arm-preference",
            ConstraintDirective::RemoveArmPreference => "remove-arm-preference",
            ConstraintDirective::AddArmToleration => "add-arm-toleration",
            ConstraintDirective::RemoveArmToleration => "remove-arm-toleration",
            ConstraintDirective::AddMigrationMarker => "add-migration-marker",
            ConstraintDirective::RemoveMigrationMarker => "remove-migration-marker",
        }
    }

    /// Apply the directive, returning the concerns that were already in the desired state
    pub fn apply(
        &self,
        current: &SchedulingConstraints,
        markers: &MarkerSet,
    ) -> (SchedulingConstraints, Vec<Concern>) {
        let mut next = current.clone();
        let mut settled = Vec::new();

        match self {
            ConstraintDirective::AddArmPreference => {
                let term = markers.arm_preference();
                if has_preferred_term(&current.preferred_terms, &term) {
                    settled.push(Concern::Affinity);
                } else {
                    next.preferred_terms = add_preferred_term(&current.preferred_terms, &term);
                }
            }
            ConstraintDirective::RemoveArmPreference => {
                let term = markers.arm_preference();
                if has_preferred_term(&current.preferred_terms, &term) {
                    next.preferred_terms = remove_preferred_term(&current.preferred_terms, &term);
                } else {
                    settled.push(Concern::Affinity);
                }
            }
            ConstraintDirective::AddArmToleration => {
                if has_toleration_marker(&current.tolerations, &markers.arm_toleration_key) {
                    settled.push(Concern::Toleration);
                } else {
                    next.tolerations =
                        add_toleration_marker(&current.tolerations, &markers.arm_toleration());
                }
            }
            ConstraintDirective::RemoveArmToleration => {
                if has_toleration_marker(&current.tolerations, &markers.arm_toleration_key) {
                    next.tolerations =
                        remove_toleration_marker(&current.tolerations, &markers.arm_toleration_key);
                } else {
                    settled.push(Concern::Toleration);
                }
            }
            ConstraintDirective::AddMigrationMarker => {
                let key = &markers.migration_node_selector_key;
                let value = &markers.migration_node_selector_value;
                if has_node_selector_marker(&current.node_selector, key, value) {
                    settled.push(Concern::NodeSelector);
                } else {
                    next.node_selector = set_node_selector_marker(&current.node_selector, key, value);
                }

                if has_toleration_marker(&current.tolerations, &markers.migration_toleration_key) {
                    settled.push(Concern::Toleration);
                } else {
                    next.tolerations = add_toleration_marker(
                        &current.tolerations,
                        &markers.migration_toleration(),
                    );
                }
            }
            ConstraintDirective::RemoveMigrationMarker => {
                let key = &markers.migration_node_selector_key;
                if current.node_selector.contains_key(key) {
                    next.node_selector = remove_node_selector_marker(&current.node_selector, key);
                } else {
                    settled.push(Concern::NodeSelector);
                }

                if has_toleration_marker(&current.tolerations, &markers.migration_toleration_key) {
                    next.tolerations = remove_toleration_marker(
                        &current.tolerations,
                        &markers.migration_toleration_key,
                    );
                } else {
                    settled.push(Concern::Toleration);
                }
            }
        }

        (next, settled)
    }
}

impl fmt::Display for ConstraintDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Directive set chosen by the operator for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchDirective {
    Migrate,
    RollbackMigrate,
    ArmPatch,
    RollbackArmPatch,
}

impl BatchDirective {
    pub fn steps(&self) -> &'static [ConstraintDirective] {
        match self {
            BatchDirective::Migrate => &[ConstraintDirective::AddMigrationMarker],
            BatchDirective::RollbackMigrate => &[ConstraintDirective::RemoveMigrationMarker],
            BatchDirective::ArmPatch => &[
                ConstraintDirective::AddArmPreference,
                ConstraintDirective::AddArmToleration,
            ],
            BatchDirective::RollbackArmPatch => &[
                ConstraintDirective::RemoveArmPreference,
                ConstraintDirective::RemoveArmToleration,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BatchDirective::Migrate => "migrate",
            BatchDirective::RollbackMigrate => "rollback-migrate",
            BatchDirective::ArmPatch => "arm-patch",
            BatchDirective::RollbackArmPatch => "rollback-arm-patch",
        }
    }
}

impl fmt::Display for BatchDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BatchDirective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "migrate" => Ok(BatchDirective::Migrate),
            "rollback-migrate" | "rollback" => Ok(BatchDirective::RollbackMigrate),
            "arm-patch" => Ok(BatchDirective::ArmPatch),
            "rollback-arm-patch" | "arm-rollback" => Ok(BatchDirective::RollbackArmPatch),
            other => Err(format!("unknown directive '{}'", other)),
        }
    }
}

/// A concern left untouched because it was already in the desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skip {
    pub directive: ConstraintDirective,
    pub concern: Concern,
}

impl Skip {
    pub fn describe(&self) -> &'static str {
        use ConstraintDirective::*;
        match (self.directive, self.concern) {
            (AddArmPreference, _) => "already has arm preference, skip the prefer affinity",
            (AddArmToleration, _) => "already has arm64 toleration, skip it",
            (AddMigrationMarker, Concern::NodeSelector) => {
                "already has migration node selector, skip it"
            }
            (AddMigrationMarker, _) => "already has migration toleration, skip it",
            (RemoveArmPreference, _) => "has no arm preference, skip the prefer affinity",
            (RemoveArmToleration, _) => "has no arm64 toleration, skip it",
            (RemoveMigrationMarker, Concern::NodeSelector) => {
                "has no migration node selector, skip it"
            }
            (RemoveMigrationMarker, _) => "has no migration toleration, skip it",
        }
    }
}

/// Desired constraints for one workload and the concerns that needed no change
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub desired: SchedulingConstraints,
    pub skipped: Vec<Skip>,
}

impl Plan {
    pub fn is_noop(&self, current: &SchedulingConstraints) -> bool {
        &self.desired == current
    }
}

/// Run every step of a batch directive over the current constraints
pub fn plan(directive: BatchDirective, current: &SchedulingConstraints, markers: &MarkerSet) -> Plan {
    let mut desired = current.clone();
    let mut skipped = Vec::new();

    for step in directive.steps() {
        let (next, settled) = step.apply(&desired, markers);
        desired = next;
        skipped.extend(settled.into_iter().map(|concern| Skip {
            directive: *step,
            concern,
        }));
    }

    Plan { desired, skipped }
}
