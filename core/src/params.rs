//! Parameter accumulator for a single request chain.
//!
//! # Design
//! `ParamStore` wraps an insertion-ordered `serde_json::Map`. Merging is
//! last-write-wins: a key that already exists keeps its position but takes
//! the newer value. Pruning is destructive by contract; once `is_valid` has
//! run, the store holds only the entries that will actually be sent.
//!
//! `authinfo` carries credentials, so `Debug` masks its value.

use std::fmt;

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Ordered request parameters.
pub type Params = Map<String, Value>;

/// Parameters whose values never show up in `Debug` output.
const SECRET_KEYS: &[&str] = &["authinfo"];

#[derive(Clone, Default, PartialEq)]
pub struct ParamStore {
    entries: Params,
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStore")
            .field("entries", &MaskedEntries(&self.entries))
            .finish()
    }
}

struct MaskedEntries<'a>(&'a Params);

impl fmt::Debug for MaskedEntries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.0 {
            if SECRET_KEYS.contains(&key.as_str()) {
                map.entry(key, &"<redacted>");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `params` over the stored entries.
    ///
    /// When `func` is given it is placed ahead of `params`, so an explicit
    /// `func` key inside `params` still wins.
    pub fn merge<I, K, V>(&mut self, params: I, func: Option<&str>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut incoming = Params::new();
        if let Some(func) = func {
            incoming.insert("func".to_string(), Value::from(func));
        }
        for (key, value) in params {
            incoming.insert(key.into(), value.into());
        }
        for (key, value) in incoming {
            self.entries.insert(key, value);
        }
    }

    /// Discard every stored entry and take `params` instead.
    pub fn replace(&mut self, params: Params) {
        self.entries = params;
    }

    /// Prune empty values and report whether anything is left to send.
    ///
    /// Nested structures lose their own empty members first, one level deep,
    /// and are then dropped if nothing remains inside them.
    pub fn is_valid(&mut self) -> bool {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .filter_map(|(key, value)| {
                let value = prune_children(value);
                (!is_empty_value(&value)).then_some((key, value))
            })
            .collect();
        !self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// String view of a parameter, if it holds one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether `key` would still be present after `is_valid` prunes.
    pub fn survives_pruning(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|value| !is_empty_value(&prune_children(value.clone())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &Params {
        &self.entries
    }

    /// Form-encode the entries as `key=value` pairs joined by `&`.
    ///
    /// Nested values flatten to `key[sub]=value`, booleans to `1`/`0`, and
    /// nulls are skipped.
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            append_value(&mut serializer, key, value);
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParamStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = ParamStore::new();
        store.merge(iter, None);
        store
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn prune_children(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().filter(|v| !is_empty_value(v)).collect()),
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !is_empty_value(v)).collect()),
        other => other,
    }
}

fn append_value(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Bool(b) => {
            serializer.append_pair(key, if *b { "1" } else { "0" });
        }
        Value::Number(n) => {
            serializer.append_pair(key, &n.to_string());
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                append_value(serializer, &format!("{key}[{index}]"), item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                append_value(serializer, &format!("{key}[{sub}]"), item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_last_write_wins() {
        let mut store: ParamStore = [("a", "1"), ("b", "2")].into_iter().collect();
        store.merge([("b", json!({"nested": true})), ("c", json!("3"))], None);

        assert_eq!(store.get("a"), Some(&json!("1")));
        assert_eq!(store.get("b"), Some(&json!({"nested": true})));
        assert_eq!(store.get("c"), Some(&json!("3")));
    }

    #[test]
    fn merge_keeps_position_of_overwritten_key() {
        let mut store: ParamStore = [("a", "1"), ("b", "2")].into_iter().collect();
        store.merge([("a", "9")], None);
        let keys: Vec<&str> = store.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn merge_with_func_puts_func_first() {
        let mut store = ParamStore::new();
        store.merge([("elid", "5")], Some("account.edit"));
        let keys: Vec<&str> = store.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, ["func", "elid"]);
        assert_eq!(store.get_str("func"), Some("account.edit"));
    }

    #[test]
    fn explicit_func_param_overrides_func_argument() {
        let mut store = ParamStore::new();
        store.merge([("func", "explicit")], Some("implicit"));
        assert_eq!(store.get_str("func"), Some("explicit"));
    }

    #[test]
    fn func_argument_overrides_earlier_func() {
        let mut store = ParamStore::new();
        store.merge([("a", "1")], Some("first"));
        store.merge(Vec::<(String, Value)>::new(), Some("second"));
        assert_eq!(store.get_str("func"), Some("second"));
    }

    #[test]
    fn is_valid_prunes_empty_values() {
        let mut store: ParamStore = [
            ("a", json!("1")),
            ("b", json!("")),
            ("c", Value::Null),
            ("d", json!([])),
            ("e", json!({})),
            ("f", json!(0)),
            ("g", json!(false)),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.len(), 7);

        assert!(store.is_valid());

        let keys: Vec<&str> = store.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "f", "g"]);
    }

    #[test]
    fn is_valid_prunes_one_nested_level() {
        let mut store: ParamStore = [
            ("keep", json!({"x": "1", "y": "", "z": {"deep": ""}})),
            ("drop", json!({"x": "", "y": null})),
        ]
        .into_iter()
        .collect();

        assert!(store.is_valid());
        assert!(!store.contains_key("drop"));
        // Deeper levels are left as they are.
        assert_eq!(store.get("keep"), Some(&json!({"x": "1", "z": {"deep": ""}})));
    }

    #[test]
    fn is_valid_is_idempotent_after_first_call() {
        let mut store: ParamStore = [("a", "1"), ("b", "")].into_iter().collect();
        assert!(store.contains_key("b"));

        assert!(store.is_valid());
        let after_first = store.clone();
        assert!(!store.contains_key("b"));

        assert!(store.is_valid());
        assert_eq!(store, after_first);
    }

    #[test]
    fn is_valid_false_when_everything_pruned() {
        let mut store: ParamStore = [("authinfo", ""), ("su", "")].into_iter().collect();
        assert!(!store.is_valid());
        assert!(store.is_empty());
    }

    #[test]
    fn is_valid_false_on_empty_store() {
        assert!(!ParamStore::new().is_valid());
    }

    #[test]
    fn survives_pruning_matches_is_valid() {
        let mut store: ParamStore = [("sok", json!("")), ("a", json!("1")), ("n", json!({"x": ""}))]
            .into_iter()
            .collect();
        assert!(store.contains_key("sok"));
        assert!(!store.survives_pruning("sok"));
        assert!(!store.survives_pruning("n"));
        assert!(store.survives_pruning("a"));
        assert!(!store.survives_pruning("missing"));

        store.is_valid();
        assert!(!store.contains_key("sok"));
        assert!(!store.contains_key("n"));
    }

    #[test]
    fn debug_masks_authinfo() {
        let store: ParamStore = [("func", "user"), ("authinfo", "root:hunter2")].into_iter().collect();
        let shown = format!("{store:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
        assert!(shown.contains("user"));
    }

    #[test]
    fn to_query_form_encodes_values() {
        let store: ParamStore = [("email", "a+b@example.com"), ("name", "John Doe")]
            .into_iter()
            .collect();
        assert_eq!(store.to_query(), "email=a%2Bb%40example.com&name=John+Doe");
    }

    #[test]
    fn to_query_flattens_nested_values() {
        let store: ParamStore = [
            ("ids", json!(["1", "2"])),
            ("flags", json!({"on": true, "off": false})),
            ("n", json!(3)),
            ("skip", Value::Null),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            store.to_query(),
            "ids%5B0%5D=1&ids%5B1%5D=2&flags%5Bon%5D=1&flags%5Boff%5D=0&n=3"
        );
    }
}
