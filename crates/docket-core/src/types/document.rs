//! Untyped JSON documents and conversions to and from typed records.

use derive_more::{Deref, DerefMut, From, Into};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Name of the identifier field every document carries.
pub const ID_FIELD: &str = "id";

/// Properties the store attaches to every persisted document.
///
/// They are stripped from documents handed back to callers so that a read
/// returns exactly what was written.
pub const SYSTEM_PROPERTIES: &[&str] = &["_rid", "_self", "_etag", "_attachments", "_ts"];

/// A JSON object stored in a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[derive(Deref, DerefMut, From, Into)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes a typed record into a document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the record does not serialize to a
    /// JSON object.
    pub fn from_typed<T: Serialize + ?Sized>(record: &T) -> Result<Self> {
        match serde_json::to_value(record)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::serialization().with_message(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Deserializes this document into a typed record.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.0))?)
    }

    /// Returns the document identifier if it is present and a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Sets a field, returning the document for chaining.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Resolves a sequence of field names through nested objects.
    pub fn lookup<'a, I>(&self, segments: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut segments = segments.into_iter();
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Removes store-generated system properties.
    #[must_use]
    pub fn without_system_properties(mut self) -> Self {
        for property in SYSTEM_PROPERTIES {
            self.0.remove(*property);
        }
        self
    }

    /// Consumes the document, returning the underlying JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::serialization().with_message(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

/// Returns a short name for the JSON type of a value.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
