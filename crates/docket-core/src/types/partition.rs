//! Partition key paths and values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::Document;
use super::document::json_type_name;
use crate::{Error, Result};

/// Location of the partition key inside a document, e.g. `/categoryId`.
///
/// Declared once per container; the item accessor reads the routing value
/// from this path rather than from a fixed field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartitionKeyPath {
    path: String,
}

impl PartitionKeyPath {
    /// Parses a `/`-separated partition key path.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the path does not start with `/` or
    /// contains an empty segment.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();

        let Some(rest) = path.strip_prefix('/') else {
            return Err(Error::validation()
                .with_message(format!("partition key path '{path}' must start with '/'")));
        };

        if rest.is_empty() || rest.split('/').any(str::is_empty) {
            return Err(Error::validation()
                .with_message(format!("partition key path '{path}' has an empty segment")));
        }

        Ok(Self { path })
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Returns the field names the path walks through.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path[1..].split('/')
    }

    /// Reads the partition key value from a document.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the field is missing, empty, or not a
    /// scalar.
    pub fn extract(&self, document: &Document) -> Result<PartitionKey> {
        let value = document.lookup(self.segments()).ok_or_else(|| {
            Error::validation().with_message(format!(
                "document is missing partition key field '{}'",
                self.path
            ))
        })?;

        PartitionKey::try_from(value.clone()).map_err(|e| e.with_context(self.path.clone()))
    }
}

impl fmt::Display for PartitionKeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for PartitionKeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartitionKeyPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PartitionKeyPath> for String {
    fn from(value: PartitionKeyPath) -> Self {
        value.path
    }
}

/// Value a document is routed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionKey {
    /// A string partition key; never empty.
    String(String),
    /// A numeric partition key.
    Number(Number),
    /// A boolean partition key.
    Bool(bool),
}

impl PartitionKey {
    /// Returns the value as JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
        }
    }

    /// Returns `true` if the given JSON value equals this key.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String(a), Value::String(b)) => a == b,
            (Self::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (Self::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Renders the key as a one-element JSON array, the form used on the wire.
    pub fn to_header_value(&self) -> String {
        Value::Array(vec![self.to_value()]).to_string()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl TryFrom<Value> for PartitionKey {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) if s.is_empty() => {
                Err(Error::validation().with_message("partition key value cannot be empty"))
            }
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::Bool(b) => Ok(Self::Bool(b)),
            other => Err(Error::validation().with_message(format!(
                "partition key value must be a string, number or boolean, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
