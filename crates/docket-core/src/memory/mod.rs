//! In-process [`StoreGateway`] for tests and local development.

mod sql;

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

use self::sql::Filter;
use crate::gateway::{GatewayOperation, StoreGateway};
use crate::query::{ContinuationToken, QueryPage, QueryRequest};
use crate::types::{
    ContainerHandle, ContainerProperties, ContainerSpec, DatabaseHandle, DatabaseProperties,
    Document, PartitionKey, Provisioned,
};
use crate::{Error, Result};

/// Default number of documents per query page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A document store kept entirely in memory.
///
/// Create-if-absent is a single locked check-and-insert. Queries support
/// `SELECT * FROM c [WHERE c.path <op> value [AND ...]]` and page through
/// matches in insertion order.
#[derive(Debug)]
pub struct MemoryGateway {
    databases: RwLock<HashMap<String, DatabaseEntry>>,
    page_size: usize,
    probes: Mutex<Probes>,
}

#[derive(Debug, Default)]
struct DatabaseEntry {
    containers: HashMap<String, ContainerEntry>,
}

#[derive(Debug)]
struct ContainerEntry {
    properties: ContainerProperties,
    documents: Vec<StoredDocument>,
}

#[derive(Debug)]
struct StoredDocument {
    partition_key: PartitionKey,
    document: Document,
}

impl StoredDocument {
    fn is(&self, id: &str, partition_key: &PartitionKey) -> bool {
        self.document.id() == Some(id) && partition_key.matches(&self.partition_key.to_value())
    }
}

#[derive(Debug, Default)]
struct Probes {
    faults: HashMap<GatewayOperation, VecDeque<Error>>,
    calls: HashMap<GatewayOperation, usize>,
    sequence: u64,
}

impl MemoryGateway {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            probes: Mutex::new(Probes::default()),
        }
    }

    /// Sets the maximum number of documents per query page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Makes the next call of `operation` fail with `error`.
    ///
    /// Faults queue up per operation and are consumed in order.
    pub fn fail_next(&self, operation: GatewayOperation, error: Error) {
        self.probes()
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Returns how many times `operation` has been called.
    pub fn call_count(&self, operation: GatewayOperation) -> usize {
        self.probes().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Returns the number of documents stored in a container.
    pub async fn document_count(&self, database: &str, container: &str) -> usize {
        self.databases
            .read()
            .await
            .get(database)
            .and_then(|db| db.containers.get(container))
            .map_or(0, |entry| entry.documents.len())
    }

    fn probes(&self) -> std::sync::MutexGuard<'_, Probes> {
        self.probes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a call and returns the injected fault, if any.
    fn enter(&self, operation: GatewayOperation) -> Result<()> {
        let mut probes = self.probes();
        *probes.calls.entry(operation).or_default() += 1;

        match probes.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error.with_context(operation.as_ref().to_owned())),
            None => Ok(()),
        }
    }

    fn next_sequence(&self) -> u64 {
        let mut probes = self.probes();
        probes.sequence += 1;
        probes.sequence
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn container_not_found(container: &ContainerHandle) -> Error {
    Error::not_found()
        .with_message(format!(
            "container '{}/{}' does not exist",
            container.database(),
            container.name()
        ))
        .with_status_code(404)
}

#[async_trait::async_trait]
impl StoreGateway for MemoryGateway {
    async fn create_database_if_absent(
        &self,
        name: &str,
    ) -> Result<Provisioned<DatabaseProperties>> {
        self.enter(GatewayOperation::CreateDatabase)?;

        let mut databases = self.databases.write().await;
        let properties = DatabaseProperties { id: name.to_owned() };

        if databases.contains_key(name) {
            return Ok(Provisioned::existing(properties));
        }

        databases.insert(name.to_owned(), DatabaseEntry::default());
        Ok(Provisioned::created(properties))
    }

    async fn create_container_if_absent(
        &self,
        database: &DatabaseHandle,
        spec: &ContainerSpec,
    ) -> Result<Provisioned<ContainerProperties>> {
        self.enter(GatewayOperation::CreateContainer)?;

        let mut databases = self.databases.write().await;
        let entry = databases.get_mut(database.name()).ok_or_else(|| {
            Error::provisioning()
                .with_message(format!("database '{}' does not exist", database.name()))
                .with_status_code(404)
        })?;

        if let Some(existing) = entry.containers.get(&spec.name) {
            return Ok(Provisioned::existing(existing.properties.clone()));
        }

        let properties = ContainerProperties {
            id: spec.name.clone(),
            partition_key: spec.partition_key.clone(),
            throughput: spec.throughput,
        };
        entry.containers.insert(
            spec.name.clone(),
            ContainerEntry {
                properties: properties.clone(),
                documents: Vec::new(),
            },
        );

        Ok(Provisioned::created(properties))
    }

    async fn put_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        document: &Document,
    ) -> Result<Document> {
        self.enter(GatewayOperation::PutItem)?;

        let id = document.id().unwrap_or_default();
        let sequence = self.next_sequence();

        let mut databases = self.databases.write().await;
        let entry = databases
            .get_mut(container.database())
            .and_then(|db| db.containers.get_mut(container.name()))
            .ok_or_else(|| container_not_found(container))?;

        if entry.documents.iter().any(|stored| stored.is(id, partition_key)) {
            return Err(Error::conflict()
                .with_message(format!(
                    "document '{id}' already exists in partition {partition_key}"
                ))
                .with_status_code(409));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let stored = document
            .clone()
            .with_field("_rid", format!("mem{sequence}"))
            .with_field("_etag", format!("\"{sequence:08x}\""))
            .with_field("_ts", timestamp);

        entry.documents.push(StoredDocument {
            partition_key: partition_key.clone(),
            document: stored.clone(),
        });

        Ok(stored)
    }

    async fn get_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        id: &str,
    ) -> Result<Document> {
        self.enter(GatewayOperation::GetItem)?;

        let databases = self.databases.read().await;
        let entry = databases
            .get(container.database())
            .and_then(|db| db.containers.get(container.name()))
            .ok_or_else(|| container_not_found(container))?;

        entry
            .documents
            .iter()
            .find(|stored| stored.is(id, partition_key))
            .map(|stored| stored.document.clone())
            .ok_or_else(|| {
                Error::not_found()
                    .with_message(format!("document '{id}' not found in partition {partition_key}"))
                    .with_status_code(404)
            })
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        request: &QueryRequest,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryPage> {
        self.enter(GatewayOperation::QueryPage)?;

        let filter = Filter::parse(request)?;
        let offset = match continuation {
            Some(token) => token.as_str().parse::<usize>().map_err(|_| {
                Error::query().with_message(format!("invalid continuation token '{token}'"))
            })?,
            None => 0,
        };

        let databases = self.databases.read().await;
        let entry = databases
            .get(container.database())
            .and_then(|db| db.containers.get(container.name()))
            .ok_or_else(|| container_not_found(container))?;

        let mut matches = entry
            .documents
            .iter()
            .filter(|stored| filter.matches(&stored.document))
            .skip(offset);

        let documents: Vec<Document> = matches
            .by_ref()
            .take(self.page_size)
            .map(|stored| stored.document.clone())
            .collect();

        let next = offset + documents.len();
        let continuation = matches
            .next()
            .is_some()
            .then(|| ContinuationToken::new(next.to_string()));

        Ok(QueryPage::new(documents, continuation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::types::{PartitionKeyPath, ProvisionOutcome};

    async fn container(gateway: &MemoryGateway) -> ContainerHandle {
        let provisioned = gateway.create_database_if_absent("testdb").await.unwrap();
        let database = DatabaseHandle::new(provisioned);
        let spec = ContainerSpec::new("items", PartitionKeyPath::new("/pk").unwrap());
        let provisioned = gateway
            .create_container_if_absent(&database, &spec)
            .await
            .unwrap();
        ContainerHandle::new(&database, spec, provisioned)
    }

    fn item(id: &str, pk: &str) -> Document {
        Document::new().with_field("id", id).with_field("pk", pk)
    }

    #[tokio::test]
    async fn test_create_if_absent() {
        let gateway = MemoryGateway::new();
        let first = gateway.create_database_if_absent("db").await.unwrap();
        let second = gateway.create_database_if_absent("db").await.unwrap();
        assert_eq!(first.outcome, ProvisionOutcome::Created);
        assert_eq!(second.outcome, ProvisionOutcome::Existing);
    }

    #[tokio::test]
    async fn test_container_requires_database() {
        let gateway = MemoryGateway::new();
        let database = DatabaseHandle::new(Provisioned::existing(DatabaseProperties {
            id: "missing".into(),
        }));
        let spec = ContainerSpec::new("items", PartitionKeyPath::new("/pk").unwrap());

        let error = gateway
            .create_container_if_absent(&database, &spec)
            .await
            .unwrap_err();
        assert!(error.is(ErrorKind::Provisioning));
    }

    #[tokio::test]
    async fn test_put_adds_system_properties() {
        let gateway = MemoryGateway::new();
        let container = container(&gateway).await;

        let stored = gateway
            .put_item(&container, &"a".into(), &item("1", "a"))
            .await
            .unwrap();
        assert!(stored.contains_key("_etag"));
        assert_eq!(stored.without_system_properties(), item("1", "a"));
    }

    #[tokio::test]
    async fn test_paging() {
        let gateway = MemoryGateway::new().with_page_size(2);
        let container = container(&gateway).await;

        for i in 0..5 {
            let id = i.to_string();
            gateway
                .put_item(&container, &"a".into(), &item(&id, "a"))
                .await
                .unwrap();
        }

        let request = QueryRequest::new("SELECT * FROM c");
        let first = gateway.query_page(&container, &request, None).await.unwrap();
        assert_eq!(first.documents.len(), 2);

        let token = first.continuation.unwrap();
        let second = gateway
            .query_page(&container, &request, Some(&token))
            .await
            .unwrap();
        assert_eq!(second.documents[0].id(), Some("2"));

        let third = gateway
            .query_page(&container, &request, second.continuation.as_ref())
            .await
            .unwrap();
        assert_eq!(third.documents.len(), 1);
        assert!(third.is_last());
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_trailing_page() {
        let gateway = MemoryGateway::new().with_page_size(2);
        let container = container(&gateway).await;

        for id in ["1", "2"] {
            gateway
                .put_item(&container, &"a".into(), &item(id, "a"))
                .await
                .unwrap();
        }

        let page = gateway
            .query_page(&container, &QueryRequest::new("SELECT * FROM c"), None)
            .await
            .unwrap();
        assert_eq!(page.documents.len(), 2);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(GatewayOperation::CreateDatabase, Error::transport());

        let error = gateway.create_database_if_absent("db").await.unwrap_err();
        assert!(error.is(ErrorKind::Transport));
        assert!(gateway.create_database_if_absent("db").await.is_ok());
        assert_eq!(gateway.call_count(GatewayOperation::CreateDatabase), 2);
    }

    #[tokio::test]
    async fn test_bad_continuation_token() {
        let gateway = MemoryGateway::new();
        let container = container(&gateway).await;

        let error = gateway
            .query_page(
                &container,
                &QueryRequest::new("SELECT * FROM c"),
                Some(&ContinuationToken::new("nope")),
            )
            .await
            .unwrap_err();
        assert!(error.is(ErrorKind::Query));
    }
}
