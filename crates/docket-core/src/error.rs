//! Structured error handling for document store operations.

use std::borrow::Cow;
use std::time::Duration;

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur when talking to a document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Connection settings are missing or invalid.
    Configuration,
    /// A database or container could not be created or looked up.
    Provisioning,
    /// A caller-supplied value failed local checks before any network call.
    Validation,
    /// A document with the same id already exists in the partition.
    Conflict,
    /// The point-read target does not exist under the given partition key.
    NotFound,
    /// Query text is malformed or references an unbound parameter.
    Query,
    /// Network, timeout or throttling fault reported by the gateway.
    Transport,
    /// A document could not be converted to or from its typed form.
    Serialization,
    /// The operation was cancelled by its session.
    Cancelled,
}

impl ErrorKind {
    /// Check if this error kind is typically transient.
    ///
    /// Nothing in this crate retries; the flag is for callers that do.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport)
    }
}

/// Structured error type with classification and context tracking.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<Cow<'static, str>>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
    /// Additional context information.
    pub context: Option<Cow<'static, str>>,
    /// Status code reported by the remote store, if any.
    pub status_code: Option<u16>,
    /// Back-off hint reported by the remote store, if any.
    pub retry_after: Option<Duration>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: None,
            status_code: None,
            retry_after: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self::new(kind).with_source(source)
    }

    /// Creates a configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a provisioning error.
    pub fn provisioning() -> Self {
        Self::new(ErrorKind::Provisioning)
    }

    /// Creates a validation error.
    pub fn validation() -> Self {
        Self::new(ErrorKind::Validation)
    }

    /// Creates a conflict error.
    pub fn conflict() -> Self {
        Self::new(ErrorKind::Conflict)
    }

    /// Creates a not-found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a query error.
    pub fn query() -> Self {
        Self::new(ErrorKind::Query)
    }

    /// Creates a transport error.
    pub fn transport() -> Self {
        Self::new(ErrorKind::Transport)
    }

    /// Creates a serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled).with_message("operation cancelled")
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds context to the error.
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Records the status code reported by the remote store.
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Records the back-off hint reported by the remote store.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Returns `true` if the error has the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Check if this error is transient based on its kind.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(ErrorKind::Serialization, error)
            .with_message("document (de)serialization failed")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_error_new() {
        let error = Error::new(ErrorKind::Conflict);
        assert_eq!(error.kind, ErrorKind::Conflict);
        assert!(error.message.is_none());
        assert!(error.source.is_none());
        assert!(error.status_code.is_none());
    }

    #[test]
    fn test_error_builder_pattern() {
        let error = Error::transport()
            .with_message("throttled")
            .with_context("query_page")
            .with_status_code(429)
            .with_retry_after(Duration::from_millis(250));

        assert_eq!(error.kind, ErrorKind::Transport);
        assert_eq!(error.message.as_deref(), Some("throttled"));
        assert_eq!(error.context.as_deref(), Some("query_page"));
        assert_eq!(error.status_code, Some(429));
        assert_eq!(error.retry_after, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_error_display() {
        let error = Error::not_found().with_message("document 'a' not found");
        let display = error.to_string();
        assert!(display.contains("not_found"));
        assert!(display.contains("document 'a' not found"));

        assert_eq!(Error::conflict().to_string(), "[conflict]");
    }

    #[test]
    fn test_error_from_serde() {
        let json_error = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let error = Error::from(json_error);
        assert_eq!(error.kind, ErrorKind::Serialization);
        assert!(error.source.is_some());
    }

    #[test]
    fn test_transient() {
        assert!(ErrorKind::Transport.is_transient());
        assert!(!ErrorKind::Conflict.is_transient());
        assert!(!ErrorKind::NotFound.is_transient());
        assert!(!ErrorKind::Cancelled.is_transient());
        assert!(Error::transport().is_transient());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(ErrorKind::from_str("not_found").unwrap(), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_str("query").unwrap(), ErrorKind::Query);
        assert!(ErrorKind::from_str("unknown").is_err());
    }
}
