//! Input records and key handling.
//!
//! A [Record] states "node X (at level L) has one child Y". Both X and Y are
//! read from the record's [Payload] through the two field names bundled in
//! [KeyFields].

use crate::error::TreeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application payload of records and nodes.
pub type Payload = serde_json::Map<String, Value>;

// =#========================================================================#=
// RECORD
// =#========================================================================#=
/// One line of the flat edge list.
///
/// A node with several children appears in several records sharing the same
/// node key, each naming a different child. The remaining payload fields are
/// duplicated across these records.
///
/// # Example
/// ```
/// use edgetree::model::Record;
/// use serde_json::json;
///
/// let record = Record::from_value(0, json!({"id": "root", "child": "a"})).unwrap();
/// assert_eq!(record.level, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Depth of the node, root = 0
    pub level: usize,
    /// Payload holding node key, child key and application fields
    pub data: Payload,
}

impl Record {
    /// Creates a record from a level and a payload map.
    pub fn new(level: usize, data: Payload) -> Self {
        Record { level, data }
    }

    /// Creates a record from a JSON value, returning `None` unless it is an object.
    pub fn from_value(level: usize, data: Value) -> Option<Self> {
        match data {
            Value::Object(data) => Some(Record { level, data }),
            _ => None,
        }
    }
}

// =#========================================================================#=
// KEY FIELDS
// =#========================================================================#=
/// Names of the node-key and child-key fields of a record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyFields {
    key: String,
    child_key: String,
}

impl KeyFields {
    /// Creates a validated pair of field names.
    ///
    /// # Errors
    /// [TreeError::InvalidKeyFields] if a name is empty or both names are equal.
    pub fn new(key: impl Into<String>, child_key: impl Into<String>) -> Result<Self, TreeError> {
        let key = key.into();
        let child_key = child_key.into();

        if key.is_empty() || child_key.is_empty() {
            return Err(TreeError::InvalidKeyFields("field names must not be empty".to_string()));
        }
        if key == child_key {
            return Err(TreeError::InvalidKeyFields(format!(
                "node key and child key both use field '{key}'"
            )));
        }

        Ok(KeyFields { key, child_key })
    }

    /// Name of the field identifying a node.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the field naming one child of a node.
    pub fn child_key(&self) -> &str {
        &self.child_key
    }

    /// Reads the (mandatory) node key of a payload.
    pub(crate) fn node_key_of(&self, data: &Payload, level: usize) -> Result<String, TreeError> {
        scalar_key(data.get(&self.key), &self.key, level)?.ok_or_else(|| TreeError::InvalidKey {
            field: self.key.clone(),
            level,
            reason: "node key is missing".to_string(),
        })
    }

    /// Reads the (optional) child key of a payload.
    pub(crate) fn child_key_of(&self, data: &Payload, level: usize) -> Result<Option<String>, TreeError> {
        scalar_key(data.get(&self.child_key), &self.child_key, level)
    }
}

/// Renders a payload value as a path segment.
///
/// Strings are taken verbatim, `null` and missing values become empty,
/// everything else uses its JSON text.
pub(crate) fn segment_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Interprets a payload value as a key.
///
/// `None` for missing, null or empty-string values; error for arrays and objects.
fn scalar_key(value: Option<&Value>, field: &str, level: usize) -> Result<Option<String>, TreeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(TreeError::InvalidKey {
            field: field.to_string(),
            level,
            reason: "expected a string, number or boolean".to_string(),
        }),
    }
}
