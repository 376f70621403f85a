/*
    value.rs - Document-side value tree

    The CRDT engine distinguishes a few value kinds that plain JSON does not:
    - Atomic strings, replaced as a whole (no character-level merge)
    - Mergeable text
    - Counters
    Every string the translator writes into the document is atomic.
*/

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A string the engine must treat as one indivisible value
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AtomicString(String);

impl AtomicString {
    pub fn new(value: impl Into<String>) -> Self {
        AtomicString(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AtomicString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AtomicString {
    fn from(value: &str) -> Self {
        AtomicString(value.to_string())
    }
}

impl From<String> for AtomicString {
    fn from(value: String) -> Self {
        AtomicString(value)
    }
}

/// A node of the document tree
///
/// (De)serializes through its plain JSON form; strings read back in become
/// atomic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum CrdtValue {
    Null,
    Bool(bool),
    Number(Number),
    Atomic(AtomicString),
    /// Character-mergeable text
    Text(String),
    Counter(i64),
    List(Vec<CrdtValue>),
    Map(BTreeMap<String, CrdtValue>),
}

impl CrdtValue {
    pub fn empty_map() -> Self {
        CrdtValue::Map(BTreeMap::new())
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, CrdtValue>> {
        match self {
            CrdtValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, CrdtValue>> {
        match self {
            CrdtValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<CrdtValue>> {
        match self {
            CrdtValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Compare against a plain value after decoding this side.
    pub fn plain_eq(&self, plain: &Value) -> bool {
        match (self, plain) {
            (CrdtValue::Null, Value::Null) => true,
            (CrdtValue::Bool(a), Value::Bool(b)) => a == b,
            (CrdtValue::Number(a), Value::Number(b)) => a == b,
            (CrdtValue::Counter(a), Value::Number(b)) => b.as_i64() == Some(*a),
            (CrdtValue::Atomic(a), Value::String(b)) => a.as_str() == b,
            (CrdtValue::Text(a), Value::String(b)) => a == b,
            (CrdtValue::List(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.plain_eq(y))
            }
            (CrdtValue::Map(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, x)| b.get(k).map_or(false, |y| x.plain_eq(y)))
            }
            _ => false,
        }
    }

    /// Short name of the variant, for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CrdtValue::Null => "null",
            CrdtValue::Bool(_) => "bool",
            CrdtValue::Number(_) => "number",
            CrdtValue::Atomic(_) => "atomic",
            CrdtValue::Text(_) => "text",
            CrdtValue::Counter(_) => "counter",
            CrdtValue::List(_) => "list",
            CrdtValue::Map(_) => "map",
        }
    }
}

impl From<AtomicString> for CrdtValue {
    fn from(value: AtomicString) -> Self {
        CrdtValue::Atomic(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_eq_decodes_atomic_and_text() {
        assert!(CrdtValue::Atomic("hi".into()).plain_eq(&json!("hi")));
        assert!(CrdtValue::Text("hi".to_string()).plain_eq(&json!("hi")));
        assert!(!CrdtValue::Atomic("hi".into()).plain_eq(&json!("ho")));
        assert!(CrdtValue::Counter(3).plain_eq(&json!(3)));
        assert!(!CrdtValue::Counter(3).plain_eq(&json!(3.5)));
    }

    #[test]
    fn test_plain_eq_containers() {
        let value = CrdtValue::Map(BTreeMap::from([
            ("a".to_string(), CrdtValue::List(vec![CrdtValue::Atomic("x".into())])),
            ("b".to_string(), CrdtValue::Null),
        ]));
        assert!(value.plain_eq(&json!({"a": ["x"], "b": null})));
        assert!(!value.plain_eq(&json!({"a": ["x"]})));
        assert!(!value.plain_eq(&json!({"a": ["x"], "c": null})));
    }

    #[test]
    fn test_serde_goes_through_plain_form() {
        let value: CrdtValue = serde_json::from_value(json!({"name": "box", "tags": ["a"]})).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["name"], CrdtValue::Atomic("box".into()));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"name": "box", "tags": ["a"]}));
    }
}
