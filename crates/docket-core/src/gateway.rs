//! Remote store primitives consumed by the access layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::query::{ContinuationToken, QueryPage, QueryRequest};
use crate::types::{
    ContainerHandle, ContainerProperties, ContainerSpec, DatabaseHandle, DatabaseProperties,
    Document, PartitionKey, Provisioned,
};
use crate::Result;

/// Names of the gateway primitives, used for logging and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GatewayOperation {
    CreateDatabase,
    CreateContainer,
    PutItem,
    GetItem,
    QueryPage,
}

/// Primitive operations of a partitioned document store.
///
/// Implementations own the transport and map store failures onto
/// [`ErrorKind`](crate::ErrorKind). Inputs reaching a gateway have already
/// passed local validation.
#[async_trait::async_trait]
pub trait StoreGateway: Send + Sync {
    /// Creates a database unless one with the same name exists.
    async fn create_database_if_absent(&self, name: &str)
    -> Result<Provisioned<DatabaseProperties>>;

    /// Creates a container unless one with the same name exists.
    ///
    /// An existing container is returned as it is, never modified.
    async fn create_container_if_absent(
        &self,
        database: &DatabaseHandle,
        spec: &ContainerSpec,
    ) -> Result<Provisioned<ContainerProperties>>;

    /// Stores a new document, failing with a conflict if the id is taken
    /// within the partition.
    async fn put_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        document: &Document,
    ) -> Result<Document>;

    /// Reads a document by id within one partition.
    async fn get_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        id: &str,
    ) -> Result<Document>;

    /// Fetches one page of query results.
    ///
    /// A page without a continuation token is the last one.
    async fn query_page(
        &self,
        container: &ContainerHandle,
        request: &QueryRequest,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryPage>;
}

#[async_trait::async_trait]
impl<G: StoreGateway + ?Sized> StoreGateway for Arc<G> {
    async fn create_database_if_absent(
        &self,
        name: &str,
    ) -> Result<Provisioned<DatabaseProperties>> {
        (**self).create_database_if_absent(name).await
    }

    async fn create_container_if_absent(
        &self,
        database: &DatabaseHandle,
        spec: &ContainerSpec,
    ) -> Result<Provisioned<ContainerProperties>> {
        (**self).create_container_if_absent(database, spec).await
    }

    async fn put_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        document: &Document,
    ) -> Result<Document> {
        (**self).put_item(container, partition_key, document).await
    }

    async fn get_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        id: &str,
    ) -> Result<Document> {
        (**self).get_item(container, partition_key, id).await
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        request: &QueryRequest,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryPage> {
        (**self).query_page(container, request, continuation).await
    }
}
