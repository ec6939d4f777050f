//! Shared types for Terragen RPC clients.
//!
//! This crate provides the node handle and parameter value types used by
//! terragen-scene and terragen-cli. The server exchanges nodes as opaque ids
//! and parameter values as strings in the same format Terragen uses in its
//! project files.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Errors converting between JSON results or parameter strings and typed values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected}, got {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: Value,
    },

    #[error("cannot parse {input:?} as {expected}")]
    Parse {
        input: String,
        expected: &'static str,
    },
}

/// Opaque handle to a node in the remote scene graph.
///
/// The server sends ids as strings; numeric ids are accepted and kept in
/// their decimal form. Ids are passed back to the server verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }

    /// Interpret a call result as an optional node.
    ///
    /// `""`, `"0"`, `0` and `null` mean "no node".
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnexpectedValue` for booleans, arrays, objects and
    /// non-integer numbers.
    pub fn from_value(value: &Value) -> Result<Option<Self>, ValueError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() || s == "0" => Ok(None),
            Value::String(s) => Ok(Some(Self(s.clone()))),
            Value::Number(n) if n.as_u64() == Some(0) || n.as_i64() == Some(0) => Ok(None),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Some(Self(n.to_string()))),
            other => Err(ValueError::UnexpectedValue {
                expected: "node id",
                found: other.clone(),
            }),
        }
    }

    /// Interpret a call result as a list of nodes, dropping "no node" entries.
    /// `null` is treated as an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnexpectedValue` if the value is not an array of ids.
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>, ValueError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| Self::from_value(item).transpose())
                .collect(),
            other => Err(ValueError::UnexpectedValue {
                expected: "array of node ids",
                found: other.clone(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Unsigned(n) => Self(n.to_string()),
            RawId::Signed(n) => Self(n.to_string()),
        })
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&NodeId> for Value {
    fn from(node: &NodeId) -> Self {
        node.to_value()
    }
}

impl From<NodeId> for Value {
    fn from(node: NodeId) -> Self {
        Value::String(node.0)
    }
}

/// A parameter value to be written with `set_param_from_string`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// 2D/3D vectors and colours
    Vector(Vec<f64>),
}

impl ParamValue {
    /// The string form Terragen parses: numbers in decimal, vector
    /// components separated by single spaces, booleans as `1`/`0`.
    #[must_use]
    pub fn to_param_string(&self) -> String {
        match self {
            ParamValue::Text(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Float(x) => x.to_string(),
            ParamValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            ParamValue::Vector(components) => components
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_param_string())
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Int(i64::from(n))
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(components: Vec<f64>) -> Self {
        ParamValue::Vector(components)
    }
}

impl<const N: usize> From<[f64; N]> for ParamValue {
    fn from(components: [f64; N]) -> Self {
        ParamValue::Vector(components.to_vec())
    }
}

impl From<(f64, f64, f64)> for ParamValue {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        ParamValue::Vector(vec![x, y, z])
    }
}

/// Parse the first whitespace-separated word as an integer. Empty → 0.
///
/// # Errors
///
/// Returns `ValueError::Parse` if the first word is not an integer.
pub fn parse_first_int(raw: &str) -> Result<i64, ValueError> {
    match raw.split_whitespace().next() {
        None => Ok(0),
        Some(word) => word.parse().map_err(|_| ValueError::Parse {
            input: raw.to_string(),
            expected: "integer",
        }),
    }
}

/// Parse the first whitespace-separated word as a float. Empty → 0.0.
///
/// # Errors
///
/// Returns `ValueError::Parse` if the first word is not a number.
pub fn parse_first_float(raw: &str) -> Result<f64, ValueError> {
    match raw.split_whitespace().next() {
        None => Ok(0.0),
        Some(word) => word.parse().map_err(|_| ValueError::Parse {
            input: raw.to_string(),
            expected: "number",
        }),
    }
}

/// Parse every whitespace-separated word as a float component.
///
/// # Errors
///
/// Returns `ValueError::Parse` if any word is not a number.
pub fn parse_components(raw: &str) -> Result<Vec<f64>, ValueError> {
    raw.split_whitespace()
        .map(|word| {
            word.parse().map_err(|_| ValueError::Parse {
                input: raw.to_string(),
                expected: "list of numbers",
            })
        })
        .collect()
}
