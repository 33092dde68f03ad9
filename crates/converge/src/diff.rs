//! Structural diffing between JSON-like values
//!
//! Comparison is order-insensitive for lists: two arrays are equivalent when
//! their elements can be paired off one-to-one, so repeated elements count
//! (["a", "a"] is not equivalent to ["a"]). Objects compare key-by-key.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value present on one side only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Dotted path to the containing attribute
    pub path: String,
    /// The value that was added or removed
    pub value: Value,
}

/// A scalar (or type) mismatch at a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    /// Dotted path to the attribute
    pub path: String,
    /// Observed value
    pub from: Value,
    /// Desired value
    pub to: Value,
}

/// Structural diff between an observed and a desired value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Present in desired only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<DiffEntry>,
    /// Present in observed only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<DiffEntry>,
    /// Present on both sides with different values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<ValueChange>,
}

impl DiffSummary {
    /// Check if the diff found no differences
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of recorded differences
    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// Check two values for order-insensitive structural equality
pub fn values_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, av)| b.get(key).is_some_and(|bv| values_equivalent(av, bv)))
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return false;
            }
            let mut unmatched: Vec<&Value> = b.iter().collect();
            for av in a {
                match unmatched.iter().position(|bv| values_equivalent(av, bv)) {
                    Some(i) => {
                        unmatched.swap_remove(i);
                    }
                    None => return false,
                }
            }
            true
        }
        _ => a == b,
    }
}

/// Compute a structural diff between observed and desired state
///
/// Returns `None` when the two values are equivalent, so callers can treat
/// "no drift" as the absence of a summary.
pub fn diff_values(existing: &Value, desired: &Value) -> Option<DiffSummary> {
    let mut summary = DiffSummary::default();
    walk("", existing, desired, &mut summary);
    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}

fn walk(path: &str, existing: &Value, desired: &Value, out: &mut DiffSummary) {
    match (existing, desired) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_val) in old {
                let child = join(path, key);
                match new.get(key) {
                    Some(new_val) => walk(&child, old_val, new_val, out),
                    None => out.removed.push(DiffEntry {
                        path: child,
                        value: old_val.clone(),
                    }),
                }
            }
            for (key, new_val) in new {
                if !old.contains_key(key) {
                    out.added.push(DiffEntry {
                        path: join(path, key),
                        value: new_val.clone(),
                    });
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            // Pair off equivalent elements; whatever cannot be paired is drift.
            let mut unmatched: Vec<&Value> = new.iter().collect();
            for old_val in old {
                match unmatched.iter().position(|nv| values_equivalent(old_val, nv)) {
                    Some(i) => {
                        unmatched.swap_remove(i);
                    }
                    None => out.removed.push(DiffEntry {
                        path: path.to_string(),
                        value: old_val.clone(),
                    }),
                }
            }
            for new_val in unmatched {
                out.added.push(DiffEntry {
                    path: path.to_string(),
                    value: new_val.clone(),
                });
            }
        }
        _ => {
            if existing != desired {
                out.changed.push(ValueChange {
                    path: path.to_string(),
                    from: existing.clone(),
                    to: desired.clone(),
                });
            }
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
