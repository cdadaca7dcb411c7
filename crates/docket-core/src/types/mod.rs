//! Data model shared by the provisioner, the item accessor and queries.

mod document;
mod partition;
mod resource;
mod schema;

pub use document::{Document, ID_FIELD, SYSTEM_PROPERTIES};
pub use partition::{PartitionKey, PartitionKeyPath};
pub(crate) use resource::validate_resource_name;
pub use resource::{
    ConfigDrift, ContainerHandle, ContainerProperties, ContainerSpec, DatabaseHandle,
    DatabaseProperties, MAX_RESOURCE_NAME_LEN, MIN_THROUGHPUT, ProvisionOutcome, Provisioned,
};
pub use schema::{DocumentSchema, FieldType};
