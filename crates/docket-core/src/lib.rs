#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for database and container provisioning.
///
/// Use this target for logging create-if-absent outcomes and configuration drift.
pub const TRACING_TARGET_PROVISION: &str = "docket_core::provision";

/// Tracing target for single-document operations.
pub const TRACING_TARGET_ITEMS: &str = "docket_core::items";

/// Tracing target for query execution and paging.
pub const TRACING_TARGET_QUERY: &str = "docket_core::query";

mod error;
mod gateway;
mod items;
mod provision;
mod session;

pub mod memory;
pub mod query;
pub mod types;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use gateway::{GatewayOperation, StoreGateway};
pub use items::ItemAccessor;
pub use provision::Provisioner;
pub use query::{ContinuationToken, CursorState, QueryCursor, QueryPage, QueryRequest};
pub use session::DocumentSession;
pub use types::{
    ConfigDrift, ContainerHandle, ContainerSpec, DatabaseHandle, Document, DocumentSchema,
    FieldType, PartitionKey, PartitionKeyPath, ProvisionOutcome,
};
