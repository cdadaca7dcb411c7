//! Error types for the Cosmos DB gateway.

use std::time::Duration;

use docket_core::{ErrorKind, GatewayOperation};
use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for gateway internals.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for Cosmos DB requests.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Account key could not be used for signing.
    #[error("Invalid account key")]
    InvalidKey,
    /// The service answered with a non-success status.
    #[error("{operation} failed with status {status}: {message}")]
    Service {
        operation: GatewayOperation,
        status: StatusCode,
        message: String,
        retry_after: Option<Duration>,
    },
}

impl Error {
    /// Returns the status code of a service error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

/// Maps a service status to an error kind for the operation that got it.
pub fn classify(operation: GatewayOperation, status: StatusCode) -> ErrorKind {
    use GatewayOperation as Op;

    match (operation, status.as_u16()) {
        (Op::CreateDatabase | Op::CreateContainer, 401 | 403 | 404 | 409) => {
            ErrorKind::Provisioning
        }
        (Op::PutItem, 409) => ErrorKind::Conflict,
        (Op::PutItem, 400 | 413) => ErrorKind::Validation,
        (Op::PutItem | Op::GetItem | Op::QueryPage, 404) => ErrorKind::NotFound,
        (Op::QueryPage, 400) => ErrorKind::Query,
        _ => ErrorKind::Transport,
    }
}

impl From<Error> for docket_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                let status = e.status().map(|s| s.as_u16());
                let error = if e.is_timeout() {
                    docket_core::Error::transport()
                        .with_message(format!("request timed out: {e}"))
                        .with_source(e)
                } else if e.is_connect() {
                    docket_core::Error::transport()
                        .with_message("connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    docket_core::Error::serialization()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    docket_core::Error::transport()
                        .with_message(e.to_string())
                        .with_source(e)
                };

                match status {
                    Some(status) => error.with_status_code(status),
                    None => error,
                }
            }
            Error::Serde(e) => docket_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::InvalidKey => {
                docket_core::Error::configuration().with_message("account key cannot sign requests")
            }
            Error::Service {
                operation,
                status,
                message,
                retry_after,
            } => {
                let error = docket_core::Error::new(classify(operation, status))
                    .with_message(message)
                    .with_context(operation.as_ref().to_owned())
                    .with_status_code(status.as_u16());

                match retry_after {
                    Some(retry_after) => error.with_retry_after(retry_after),
                    None => error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn test_classify_items() {
        assert_eq!(classify(GatewayOperation::PutItem, status(409)), ErrorKind::Conflict);
        assert_eq!(classify(GatewayOperation::PutItem, status(400)), ErrorKind::Validation);
        assert_eq!(classify(GatewayOperation::PutItem, status(413)), ErrorKind::Validation);
        assert_eq!(classify(GatewayOperation::GetItem, status(404)), ErrorKind::NotFound);
    }

    #[test]
    fn test_classify_queries() {
        assert_eq!(classify(GatewayOperation::QueryPage, status(400)), ErrorKind::Query);
        assert_eq!(classify(GatewayOperation::QueryPage, status(429)), ErrorKind::Transport);
    }

    #[test]
    fn test_classify_provisioning() {
        for code in [401, 403, 404, 409] {
            assert_eq!(
                classify(GatewayOperation::CreateContainer, status(code)),
                ErrorKind::Provisioning
            );
        }
        assert_eq!(
            classify(GatewayOperation::CreateDatabase, status(503)),
            ErrorKind::Transport
        );
    }

    #[test]
    fn test_classify_transport() {
        for code in [408, 429, 449, 500, 503] {
            assert_eq!(classify(GatewayOperation::GetItem, status(code)), ErrorKind::Transport);
        }
    }

    #[test]
    fn test_service_error_conversion() {
        let error = docket_core::Error::from(Error::Service {
            operation: GatewayOperation::QueryPage,
            status: status(429),
            message: "Request rate is large".into(),
            retry_after: Some(Duration::from_millis(120)),
        });

        assert_eq!(error.kind, ErrorKind::Transport);
        assert_eq!(error.status_code, Some(429));
        assert_eq!(error.retry_after, Some(Duration::from_millis(120)));
        assert_eq!(error.message.as_deref(), Some("Request rate is large"));
        assert_eq!(error.context.as_deref(), Some("query_page"));
    }
}
