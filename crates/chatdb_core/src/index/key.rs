//! Index key values.

use ciborium::Value;
use std::fmt;

/// A value an index can be keyed by.
///
/// Only text and integer fields are indexable; rows whose indexed field is
/// missing or of another type are simply absent from that index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Integer field.
    Integer(i64),
    /// Text field.
    Text(String),
}

impl IndexKey {
    /// Converts a document value to a key.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(Self::Text(text.clone())),
            Value::Integer(int) => i64::try_from(*int).ok().map(Self::Integer),
            _ => None,
        }
    }

    /// Extracts the key stored at `key_path` in a document map.
    #[must_use]
    pub fn extract(document: &Value, key_path: &str) -> Option<Self> {
        field(document, key_path).and_then(Self::from_value)
    }
}

/// Looks up a top-level field of a document map.
pub(crate) fn field<'v>(document: &'v Value, name: &str) -> Option<&'v Value> {
    match document {
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Text(t) if t == name))
            .map(|(_, v)| v),
        _ => None,
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(t) => write!(f, "{t:?}"),
        }
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for IndexKey {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for IndexKey {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Value {
        Value::Map(vec![
            (Value::Text("username".into()), Value::Text("alice".into())),
            (Value::Text("passcode".into()), Value::Integer(123_456.into())),
            (Value::Text("friends".into()), Value::Array(vec![])),
        ])
    }

    #[test]
    fn extracts_text_and_integer_fields() {
        assert_eq!(IndexKey::extract(&doc(), "username"), Some("alice".into()));
        assert_eq!(
            IndexKey::extract(&doc(), "passcode"),
            Some(IndexKey::Integer(123_456))
        );
    }

    #[test]
    fn non_scalar_or_missing_fields_are_not_keys() {
        assert_eq!(IndexKey::extract(&doc(), "friends"), None);
        assert_eq!(IndexKey::extract(&doc(), "absent"), None);
        assert_eq!(IndexKey::extract(&Value::Null, "username"), None);
    }

    #[test]
    fn text_and_integer_keys_differ() {
        assert_ne!(IndexKey::from("123456"), IndexKey::from(123_456u32));
    }
}
