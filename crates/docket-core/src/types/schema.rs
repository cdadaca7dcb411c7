//! Declarative document shapes checked before writes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

use super::Document;
use super::document::json_type_name;
use crate::{Error, Result};

/// Semantic type of a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// Any JSON value, including null.
    Any,
}

impl FieldType {
    /// Returns `true` if the value has this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }
}

/// Field name to type mapping for the documents of one container.
///
/// Fields not listed are allowed and unchecked. Listed fields are checked
/// when present and must be present when marked required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    fields: BTreeMap<String, FieldType>,
    required: BTreeSet<String>,
}

impl DocumentSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required field.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        self.required.insert(name.clone());
        self.fields.insert(name, field_type);
        self
    }

    /// Declares an optional field.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        self.required.remove(&name);
        self.fields.insert(name, field_type);
        self
    }

    /// Returns the declared type of a field.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// Checks a document against this schema.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first offending field.
    pub fn validate(&self, document: &Document) -> Result<()> {
        for name in &self.required {
            if !document.contains_key(name) {
                return Err(Error::validation()
                    .with_message(format!("required field '{name}' is missing")));
            }
        }

        for (name, field_type) in &self.fields {
            if let Some(value) = document.get(name)
                && !field_type.accepts(value)
            {
                return Err(Error::validation().with_message(format!(
                    "field '{name}' must be {field_type}, got {}",
                    json_type_name(value)
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    fn product_schema() -> DocumentSchema {
        DocumentSchema::new()
            .required("categoryName", FieldType::String)
            .required("quantity", FieldType::Integer)
            .optional("sale", FieldType::Boolean)
    }

    #[test]
    fn test_valid_document() {
        let document = Document::try_from(json!({
            "id": "a",
            "categoryName": "gear",
            "quantity": 12,
            "extra": [1, 2],
        }))
        .unwrap();

        assert!(product_schema().validate(&document).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let document = Document::try_from(json!({ "categoryName": "gear" })).unwrap();
        let error = product_schema().validate(&document).unwrap_err();
        assert!(error.is(ErrorKind::Validation));
        assert!(error.to_string().contains("quantity"));
    }

    #[test]
    fn test_wrong_type() {
        let document = Document::try_from(json!({
            "categoryName": "gear",
            "quantity": 1.5,
        }))
        .unwrap();
        let error = product_schema().validate(&document).unwrap_err();
        assert!(error.to_string().contains("must be integer"));

        let document = Document::try_from(json!({
            "categoryName": "gear",
            "quantity": 1,
            "sale": "no",
        }))
        .unwrap();
        assert!(product_schema().validate(&document).is_err());
    }

    #[test]
    fn test_optional_overrides_required() {
        let schema = DocumentSchema::new()
            .required("name", FieldType::String)
            .optional("name", FieldType::String);
        assert!(schema.validate(&Document::new()).is_ok());
        assert_eq!(schema.field_type("name"), Some(FieldType::String));
    }
}
