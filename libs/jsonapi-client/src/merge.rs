//! Recursive merge of JSON values.

use serde_json::Value;

/// Merge `source` into `target`.
///
/// When both sides are objects, keys are merged recursively. Otherwise
/// `source` replaces `target`, so later scalars win and arrays are replaced
/// as a whole.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                deep_merge(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, source) => *target = source,
    }
}
