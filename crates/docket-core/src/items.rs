//! Partition-routed create and point-read of single documents.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::gateway::StoreGateway;
use crate::session::cancellable;
use crate::types::{ContainerHandle, Document, ID_FIELD, PartitionKey, validate_resource_name};
use crate::{Error, Result, TRACING_TARGET_ITEMS};

/// Creates and reads single documents, routed by partition key.
///
/// The partition key is read from each document at the container's
/// partition key path. Creates never overwrite an existing document.
pub struct ItemAccessor<G: ?Sized> {
    gateway: Arc<G>,
    token: CancellationToken,
}

impl<G: StoreGateway + ?Sized> ItemAccessor<G> {
    /// Creates an accessor over a shared gateway.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            token: CancellationToken::new(),
        }
    }

    /// Binds the accessor to a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Stores a typed record and returns it as persisted.
    pub async fn create<T>(&self, container: &ContainerHandle, record: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Sync,
    {
        let document = Document::from_typed(record)?;
        self.create_document(container, document).await?.into_typed()
    }

    /// Stores a document and returns it as persisted.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call if the id or the
    /// partition key is missing or invalid, or the document does not match
    /// the container schema. Returns a conflict error if a document with the
    /// same id already exists in the partition.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_ITEMS,
        fields(container = %container.name())
    )]
    pub async fn create_document(
        &self,
        container: &ContainerHandle,
        document: Document,
    ) -> Result<Document> {
        let id = document
            .id()
            .ok_or_else(|| {
                Error::validation()
                    .with_message(format!("document field '{ID_FIELD}' must be a string"))
            })?
            .to_owned();
        validate_resource_name("document", &id)?;

        let partition_key = container.partition_key().extract(&document)?;

        if let Some(schema) = container.schema() {
            schema.validate(&document)?;
        }

        let stored = cancellable(
            &self.token,
            self.gateway.put_item(container, &partition_key, &document),
        )
        .await?;

        tracing::info!(
            target: TRACING_TARGET_ITEMS,
            container = %container.name(),
            id = %id,
            partition_key = %partition_key,
            "Created document"
        );

        Ok(stored.without_system_properties())
    }

    /// Reads a typed record by id within a partition.
    pub async fn read<T>(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: impl Into<PartitionKey>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.read_document(container, id, partition_key)
            .await?
            .into_typed()
    }

    /// Reads a document by id within a partition.
    ///
    /// A document stored under a different partition key is not found.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_ITEMS,
        fields(container = %container.name(), id = %id)
    )]
    pub async fn read_document(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: impl Into<PartitionKey>,
    ) -> Result<Document> {
        validate_resource_name("document", id)?;

        let partition_key = partition_key.into();
        if let PartitionKey::String(value) = &partition_key
            && value.is_empty()
        {
            return Err(Error::validation().with_message("partition key value cannot be empty"));
        }

        let document = cancellable(
            &self.token,
            self.gateway.get_item(container, &partition_key, id),
        )
        .await?;

        tracing::debug!(
            target: TRACING_TARGET_ITEMS,
            container = %container.name(),
            id = %id,
            partition_key = %partition_key,
            "Read document"
        );

        Ok(document.without_system_properties())
    }
}

impl<G: ?Sized> Clone for ItemAccessor<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            token: self.token.clone(),
        }
    }
}

impl<G: ?Sized> std::fmt::Debug for ItemAccessor<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemAccessor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;
    use crate::gateway::GatewayOperation;
    use crate::memory::MemoryGateway;
    use crate::provision::Provisioner;
    use crate::types::{ContainerSpec, DocumentSchema, FieldType, PartitionKeyPath};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Gear {
        id: String,
        category_id: String,
        quantity: i64,
    }

    fn gear(id: &str, category_id: &str) -> Gear {
        Gear {
            id: id.into(),
            category_id: category_id.into(),
            quantity: 1,
        }
    }

    async fn setup(
        schema: Option<DocumentSchema>,
    ) -> (Arc<MemoryGateway>, ItemAccessor<MemoryGateway>, ContainerHandle) {
        let gateway = Arc::new(MemoryGateway::new());
        let provisioner = Provisioner::new(gateway.clone());
        let database = provisioner.ensure_database("testdb").await.unwrap();

        let mut spec = ContainerSpec::new("gear", PartitionKeyPath::new("/categoryId").unwrap());
        spec.schema = schema;
        let container = provisioner.ensure_container(&database, spec).await.unwrap();

        (gateway.clone(), ItemAccessor::new(gateway), container)
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (_, items, container) = setup(None).await;

        let created = items.create(&container, &gear("g-1", "c-1")).await.unwrap();
        assert_eq!(created, gear("g-1", "c-1"));

        let read: Gear = items.read(&container, "g-1", "c-1").await.unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let (_, items, container) = setup(None).await;

        items.create(&container, &gear("g-1", "c-1")).await.unwrap();

        let mut second = gear("g-1", "c-1");
        second.quantity = 99;
        let error = items.create(&container, &second).await.unwrap_err();
        assert!(error.is(ErrorKind::Conflict));

        let stored: Gear = items.read(&container, "g-1", "c-1").await.unwrap();
        assert_eq!(stored.quantity, 1);

        // Same id under another partition key is a different document.
        items.create(&container, &gear("g-1", "c-2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_partition_key_is_not_found() {
        let (_, items, container) = setup(None).await;
        items.create(&container, &gear("g-1", "c-1")).await.unwrap();

        let error = items
            .read_document(&container, "g-1", "c-2")
            .await
            .unwrap_err();
        assert!(error.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_invalid_documents_never_reach_gateway() {
        let (gateway, items, container) = setup(None).await;

        let no_id = Document::new().with_field("categoryId", "c-1");
        let empty_id = Document::new()
            .with_field("id", "")
            .with_field("categoryId", "c-1");
        let numeric_id = Document::new()
            .with_field("id", 7)
            .with_field("categoryId", "c-1");
        let no_key = Document::new().with_field("id", "g-1");
        let empty_key = Document::new()
            .with_field("id", "g-1")
            .with_field("categoryId", "");

        for document in [no_id, empty_id, numeric_id, no_key, empty_key] {
            let error = items
                .create_document(&container, document)
                .await
                .unwrap_err();
            assert!(error.is(ErrorKind::Validation), "{error}");
        }

        let error = items.read_document(&container, "", "c-1").await.unwrap_err();
        assert!(error.is(ErrorKind::Validation));

        assert_eq!(gateway.call_count(GatewayOperation::PutItem), 0);
        assert_eq!(gateway.call_count(GatewayOperation::GetItem), 0);
    }

    #[tokio::test]
    async fn test_schema_checked_before_write() {
        let schema = DocumentSchema::new()
            .required("categoryId", FieldType::String)
            .required("quantity", FieldType::Integer);
        let (gateway, items, container) = setup(Some(schema)).await;

        let bad = Document::try_from(json!({
            "id": "g-1",
            "categoryId": "c-1",
            "quantity": "many",
        }))
        .unwrap();
        let error = items.create_document(&container, bad).await.unwrap_err();
        assert!(error.is(ErrorKind::Validation));
        assert_eq!(gateway.call_count(GatewayOperation::PutItem), 0);

        items.create(&container, &gear("g-1", "c-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_numeric_partition_key() {
        let gateway = Arc::new(MemoryGateway::new());
        let provisioner = Provisioner::new(gateway.clone());
        let database = provisioner.ensure_database("testdb").await.unwrap();
        let container = provisioner
            .ensure_container_with(&database, "orders", "/customer/number", None)
            .await
            .unwrap();
        let items = ItemAccessor::new(gateway);

        let order = Document::try_from(json!({
            "id": "o-1",
            "customer": { "number": 42 },
        }))
        .unwrap();
        items.create_document(&container, order.clone()).await.unwrap();

        let read = items.read_document(&container, "o-1", 42_i64).await.unwrap();
        assert_eq!(read, order);
    }
}
