//! Query requests, pages and continuation tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validate::scan_placeholders;
use crate::{Error, Result};

/// A named query parameter, e.g. `@categoryId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParameter {
    /// Parameter name including the leading `@`.
    pub name: String,
    pub value: Value,
}

/// Query text plus its ordered named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "query")]
    text: String,
    parameters: Vec<QueryParameter>,
}

impl QueryRequest {
    /// Creates a request without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    /// Binds a parameter, replacing an earlier binding of the same name.
    ///
    /// The leading `@` is added when missing.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut name = name.into();
        if !name.starts_with('@') {
            name.insert(0, '@');
        }

        let value = value.into();
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.parameters.push(QueryParameter { name, value }),
        }
        self
    }

    /// Returns the query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the parameters in binding order.
    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Returns the value bound to a parameter.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        let name = name.strip_prefix('@').unwrap_or(name);
        self.parameters
            .iter()
            .find(|p| p.name.strip_prefix('@').unwrap_or(&p.name) == name)
            .map(|p| &p.value)
    }

    /// Checks the text is well formed and every placeholder is bound.
    ///
    /// Bound parameters the text never references are allowed.
    ///
    /// # Errors
    ///
    /// Returns a query error for empty text, unbalanced quotes or an
    /// unbound placeholder.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::query().with_message("query text cannot be empty"));
        }

        for placeholder in scan_placeholders(&self.text)? {
            if self.parameter(&placeholder).is_none() {
                return Err(Error::query()
                    .with_message(format!("parameter '@{placeholder}' is not bound")));
            }
        }

        Ok(())
    }
}

/// Opaque position in a query's result sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wraps a token issued by a gateway.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for sending back to the gateway that issued it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One round trip worth of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage<T = crate::types::Document> {
    pub documents: Vec<T>,
    /// Present when more results follow.
    pub continuation: Option<ContinuationToken>,
}

impl<T> QueryPage<T> {
    /// Creates a page.
    pub fn new(documents: Vec<T>, continuation: Option<ContinuationToken>) -> Self {
        Self {
            documents,
            continuation,
        }
    }

    /// Returns `true` if this is the final page.
    pub fn is_last(&self) -> bool {
        self.continuation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parameter_binding() {
        let request = QueryRequest::new("SELECT * FROM c WHERE c.categoryId = @categoryId")
            .with_parameter("@categoryId", "c-1")
            .with_parameter("limit", 10)
            .with_parameter("categoryId", "c-2");

        assert_eq!(request.parameters().len(), 2);
        assert_eq!(request.parameter("@categoryId"), Some(&json!("c-2")));
        assert_eq!(request.parameter("limit"), Some(&json!(10)));
        assert_eq!(request.parameters()[1].name, "@limit");
    }

    #[test]
    fn test_validate() {
        let bound = QueryRequest::new("SELECT * FROM c WHERE c.categoryId = @categoryId")
            .with_parameter("@categoryId", "c-1")
            .with_parameter("@unused", 1);
        assert!(bound.validate().is_ok());

        let unbound = QueryRequest::new("SELECT * FROM c WHERE c.categoryId = @categoryId");
        let error = unbound.validate().unwrap_err();
        assert!(error.is(ErrorKind::Query));
        assert!(error.to_string().contains("@categoryId"));

        assert!(QueryRequest::new("  ").validate().is_err());
        assert!(QueryRequest::new("SELECT * FROM c WHERE c.name = 'open").validate().is_err());
    }

    #[test]
    fn test_wire_shape() {
        let request =
            QueryRequest::new("SELECT * FROM c WHERE c.id = @id").with_parameter("id", "a");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "query": "SELECT * FROM c WHERE c.id = @id",
                "parameters": [{ "name": "@id", "value": "a" }],
            })
        );
    }
}
