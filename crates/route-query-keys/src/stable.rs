//! Order-independent JSON text.
//!
//! Two values that are equal after sorting every object's keys, at every
//! depth, produce the same string. Array order is significant and kept.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::KeyError;

/// Serializes a borrowed [`Value`] with object keys in ascending `str` order.
///
/// The ordering does not rely on the `Map` backing type, so it holds even
/// when another crate in the build turns on `serde_json/preserve_order`.
#[derive(Debug, Clone, Copy)]
pub struct Sorted<'a>(pub &'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Sorted(value))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Sorted(item))?;
                }
                out.end()
            }
            scalar => scalar.serialize(serializer),
        }
    }
}

/// Canonical JSON text for `value`.
pub fn stable_stringify(value: &Value) -> Result<String, KeyError> {
    Ok(serde_json::to_string(&Sorted(value))?)
}

/// Canonical JSON text for any serializable value.
///
/// Encoder failures (for example maps with non-string keys) are returned
/// as-is rather than masked.
pub fn stable_stringify_serialize<T: Serialize + ?Sized>(value: &T) -> Result<String, KeyError> {
    let value = serde_json::to_value(value)?;
    stable_stringify(&value)
}
