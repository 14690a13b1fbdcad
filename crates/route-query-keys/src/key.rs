use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stable::Sorted;
use crate::{ArgsBag, KeyError, Verb};

/// Ordered key identifying one logical request: `[verb, url, args?]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    #[must_use]
    pub fn verb(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.0.get(1).map_or("", String::as_str)
    }

    /// Canonical argument text, present only when the bag had keys.
    #[must_use]
    pub fn args(&self) -> Option<&str> {
        self.0.get(2).map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Prefix match used for bulk invalidation (`["$get", url]` matches
    /// every argument variant of that URL).
    #[must_use]
    pub fn starts_with<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        prefix.len() <= self.0.len()
            && prefix
                .iter()
                .zip(&self.0)
                .all(|(expected, actual)| expected.as_ref() == actual)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl AsRef<[String]> for QueryKey {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

/// Compose the key for `verb` against an already-resolved URL.
///
/// The third element is emitted only when `args` has at least one key.
pub fn derive_key(verb: Verb, url: &str, args: Option<&ArgsBag>) -> Result<QueryKey, KeyError> {
    let mut parts = vec![verb.token().to_string(), url.to_string()];

    if let Some(bag) = args.filter(|bag| !bag.is_empty()) {
        let text = serde_json::to_string(&SortedBag(bag))?;
        parts.push(text);
    }

    Ok(QueryKey(parts))
}

// Serializes a bag without cloning it into a `Value::Object`.
struct SortedBag<'a>(&'a ArgsBag);

impl Serialize for SortedBag<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut entries: Vec<(&String, &Value)> = self.0.iter().collect();
        entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

        let mut out = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            out.serialize_entry(key, &Sorted(value))?;
        }
        out.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stable_stringify;

    fn bag(value: Value) -> ArgsBag {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn empty_bag_yields_two_elements() {
        let key = derive_key(Verb::Get, "https://x/", Some(&ArgsBag::new())).unwrap();
        assert_eq!(key.as_slice(), ["$get", "https://x/"]);
        assert_eq!(key.args(), None);
    }

    #[test]
    fn missing_bag_yields_two_elements() {
        let key = derive_key(Verb::Delete, "https://x/", None).unwrap();
        assert_eq!(key.as_slice(), ["$delete", "https://x/"]);
    }

    #[test]
    fn non_empty_bag_appends_canonical_text() {
        let args = json!({"id": "a"});
        let key = derive_key(Verb::Get, "https://x/a", Some(&bag(args.clone()))).unwrap();
        assert_eq!(
            key.as_slice(),
            [
                "$get".to_string(),
                "https://x/a".to_string(),
                stable_stringify(&args).unwrap()
            ]
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let first = bag(json!({"query": {"b": 1, "a": 2}, "param": {"id": "1"}}));
        let second = bag(json!({"param": {"id": "1"}, "query": {"a": 2, "b": 1}}));
        assert_ne!(
            first.keys().collect::<Vec<_>>(),
            second.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            derive_key(Verb::Get, "u", Some(&first)).unwrap(),
            derive_key(Verb::Get, "u", Some(&second)).unwrap()
        );
    }

    #[test]
    fn prefix_matching() {
        let key = derive_key(Verb::Get, "u", Some(&bag(json!({"a": 1})))).unwrap();
        assert!(key.starts_with(&["$get"]));
        assert!(key.starts_with(&["$get", "u"]));
        assert!(!key.starts_with(&["$post", "u"]));
        assert!(!key.starts_with(&["$get", "u", "x", "y"]));
    }

    #[test]
    fn serializes_as_plain_array() {
        let key = derive_key(Verb::Post, "u", None).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), r#"["$post","u"]"#);
        assert_eq!(key.to_string(), r#"["$post","u"]"#);
    }
}
