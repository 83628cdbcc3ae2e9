//! RFC 7386 JSON merge patch generation

use serde_json::{Map, Value};

/// Smallest merge patch turning `original` into `desired`
///
/// Objects are diffed recursively, removed keys become `null` and any other
/// changed value (arrays included) is replaced whole.
pub fn create_merge_patch(original: &Value, desired: &Value) -> Value {
    match (original, desired) {
        (Value::Object(original), Value::Object(desired)) => {
            let mut patch = Map::new();

            for (key, desired_value) in desired {
                match original.get(key) {
                    Some(original_value) if original_value == desired_value => {}
                    Some(original_value) => {
                        patch.insert(key.clone(), create_merge_patch(original_value, desired_value));
                    }
                    None => {
                        patch.insert(key.clone(), desired_value.clone());
                    }
                }
            }

            for key in original.keys() {
                if !desired.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }

            Value::Object(patch)
        }
        _ => desired.clone(),
    }
}

/// A patch with no fields changes nothing
pub fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().map(Map::is_empty).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_documents_give_empty_patch() {
        let doc = json!({"spec": {"replicas": 3, "template": {"spec": {"containers": []}}}});
        let patch = create_merge_patch(&doc, &doc.clone());
        assert!(is_empty_patch(&patch));
    }

    #[test]
    fn test_only_changed_branch_is_emitted() {
        let original = json!({
            "metadata": {"name": "web", "labels": {"app": "web"}},
            "spec": {"template": {"spec": {
                "containers": [{"name": "c0", "image": "nginx"}],
                "tolerations": [{"key": "a", "operator": "Exists"}]
            }}}
        });
        let mut desired = original.clone();
        desired["spec"]["template"]["spec"]["tolerations"] = json!([
            {"key": "a", "operator": "Exists"},
            {"key": "b", "operator": "Equal", "value": "true", "effect": "NoSchedule"}
        ]);

        let patch = create_merge_patch(&original, &desired);
        assert_eq!(
            patch,
            json!({"spec": {"template": {"spec": {"tolerations": [
                {"key": "a", "operator": "Exists"},
                {"key": "b", "operator": "Equal", "value": "true", "effect": "NoSchedule"}
            ]}}}})
        );
    }

    #[test]
    fn test_removed_keys_become_null() {
        let original = json!({"nodeSelector": {"disktype": "ssd", "managed": "true"}});
        let desired = json!({"nodeSelector": {"disktype": "ssd"}});
        assert_eq!(
            create_merge_patch(&original, &desired),
            json!({"nodeSelector": {"managed": null}})
        );
    }

    #[test]
    fn test_non_object_patch_is_not_empty() {
        assert!(!is_empty_patch(&json!(null)));
        assert!(!is_empty_patch(&json!({"a": 1})));
    }
}
