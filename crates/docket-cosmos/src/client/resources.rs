//! Wire representations of Cosmos DB resources.

use docket_core::types::{ContainerProperties, DatabaseProperties, Document, PartitionKeyPath};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DatabaseResource {
    pub id: String,
}

impl From<DatabaseResource> for DatabaseProperties {
    fn from(resource: DatabaseResource) -> Self {
        Self { id: resource.id }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerResource {
    pub id: String,
    pub partition_key: PartitionKeyDefinition,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    #[serde(default = "hash_kind")]
    pub kind: String,
}

fn hash_kind() -> String {
    "Hash".to_owned()
}

impl ContainerResource {
    pub(crate) fn new(id: &str, partition_key: &PartitionKeyPath) -> Self {
        Self {
            id: id.to_owned(),
            partition_key: PartitionKeyDefinition {
                paths: vec![partition_key.as_str().to_owned()],
                kind: hash_kind(),
            },
        }
    }

    /// Converts to core properties; throughput lives on a separate offer
    /// resource and is only known when supplied.
    pub(crate) fn into_properties(
        self,
        throughput: Option<u32>,
    ) -> docket_core::Result<ContainerProperties> {
        let path = self.partition_key.paths.into_iter().next().ok_or_else(|| {
            docket_core::Error::provisioning()
                .with_message(format!("container '{}' has no partition key path", self.id))
        })?;

        Ok(ContainerProperties {
            id: self.id,
            partition_key: PartitionKeyPath::new(path)?,
            throughput,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(rename = "Documents")]
    pub documents: Vec<Document>,
}

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_container_body() {
        let path = PartitionKeyPath::new("/categoryId").unwrap();
        let body = serde_json::to_value(ContainerResource::new("container", &path)).unwrap();
        assert_eq!(
            body,
            json!({
                "id": "container",
                "partitionKey": { "paths": ["/categoryId"], "kind": "Hash" },
            })
        );
    }

    #[test]
    fn test_container_response() {
        let resource: ContainerResource = serde_json::from_value(json!({
            "id": "container",
            "partitionKey": { "paths": ["/categoryId"], "kind": "Hash", "version": 2 },
            "_rid": "abc",
        }))
        .unwrap();

        let properties = resource.into_properties(None).unwrap();
        assert_eq!(properties.partition_key.as_str(), "/categoryId");
        assert_eq!(properties.throughput, None);
    }

    #[test]
    fn test_query_response() {
        let response: QueryResponse = serde_json::from_value(json!({
            "_rid": "abc",
            "Documents": [{ "id": "a", "_etag": "\"1\"" }],
            "_count": 1,
        }))
        .unwrap();
        assert_eq!(response.documents.len(), 1);
        assert_eq!(response.documents[0].id(), Some("a"));
    }
}
