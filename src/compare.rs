//! Recursive metadata comparison for the `compare` command.
//!
//! Walks two ffprobe JSON documents in parallel and splits every leaf into
//! either a difference or a match. Lists are compared positionally; a
//! missing counterpart renders as an empty value.

/// One compared leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    /// Parent key path ("" at the root).
    pub section: String,
    /// Full dot/bracket key path of the leaf.
    pub setting: String,
    /// Value in the first document.
    pub left: String,
    /// Value in the second document.
    pub right: String,
}

/// Comparison outcome: differing leaves and matching leaves.
#[derive(Debug, Default)]
pub struct Comparison {
    pub differences: Vec<ComparisonRow>,
    pub matches: Vec<ComparisonRow>,
}

/// Compare two JSON documents leaf-by-leaf.
pub fn compare_values(left: &serde_json::Value, right: &serde_json::Value) -> Comparison {
    let mut result = Comparison::default();
    compare_inner(left, right, "", &mut result);
    result
}

fn compare_inner(
    left: &serde_json::Value,
    right: &serde_json::Value,
    parent: &str,
    out: &mut Comparison,
) {
    use serde_json::Value;

    match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let full_key = if parent.is_empty() {
                    key.clone()
                } else {
                    format!("{parent}.{key}")
                };
                let left_child = a.get(key).unwrap_or(&Value::Null);
                let right_child = b.get(key).unwrap_or(&Value::Null);
                compare_child(left_child, right_child, parent, &full_key, out);
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let max_len = a.len().max(b.len());
            for i in 0..max_len {
                let full_key = format!("{parent}[{i}]");
                let left_child = a.get(i).unwrap_or(&Value::Null);
                let right_child = b.get(i).unwrap_or(&Value::Null);
                compare_child(left_child, right_child, parent, &full_key, out);
            }
        }
        _ => {
            push_leaf(left, right, parent, parent, out);
        }
    }
}

fn compare_child(
    left: &serde_json::Value,
    right: &serde_json::Value,
    parent: &str,
    full_key: &str,
    out: &mut Comparison,
) {
    use serde_json::Value;

    match (left, right) {
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
            compare_inner(left, right, full_key, out);
        }
        _ => {
            push_leaf(left, right, parent, full_key, out);
        }
    }
}

fn push_leaf(
    left: &serde_json::Value,
    right: &serde_json::Value,
    section: &str,
    setting: &str,
    out: &mut Comparison,
) {
    let row = ComparisonRow {
        section: section.to_string(),
        setting: setting.to_string(),
        left: crate::table::scalar_to_string(left),
        right: crate::table::scalar_to_string(right),
    };
    if left == right {
        out.matches.push(row);
    } else {
        out.differences.push(row);
    }
}
