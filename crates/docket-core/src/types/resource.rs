//! Database and container descriptors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::{DocumentSchema, PartitionKeyPath};
use crate::{Error, Result};

/// Lowest throughput, in request units per second, a container accepts.
pub const MIN_THROUGHPUT: u32 = 400;

/// Longest resource name a store accepts.
pub const MAX_RESOURCE_NAME_LEN: usize = 255;

/// Characters not allowed in database, container or document identifiers.
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', '?', '#'];

/// Checks a database, container or document identifier.
pub(crate) fn validate_resource_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation().with_message(format!("{kind} name cannot be empty")));
    }

    if name.chars().count() > MAX_RESOURCE_NAME_LEN {
        return Err(Error::validation().with_message(format!(
            "{kind} name exceeds {MAX_RESOURCE_NAME_LEN} characters"
        )));
    }

    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(Error::validation()
            .with_message(format!("{kind} name '{name}' contains forbidden character '{c}'")));
    }

    Ok(())
}

/// Whether a create-if-absent call created the resource or found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    Existing,
}

/// A resource returned by a create-if-absent primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Provisioned<T> {
    /// The resource as it exists in the store.
    pub resource: T,
    /// Whether this call created it.
    pub outcome: ProvisionOutcome,
}

impl<T> Provisioned<T> {
    /// Wraps a freshly created resource.
    pub fn created(resource: T) -> Self {
        Self {
            resource,
            outcome: ProvisionOutcome::Created,
        }
    }

    /// Wraps a resource that already existed.
    pub fn existing(resource: T) -> Self {
        Self {
            resource,
            outcome: ProvisionOutcome::Existing,
        }
    }
}

/// Database properties as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseProperties {
    pub id: String,
}

/// Container properties as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub id: String,
    pub partition_key: PartitionKeyPath,
    /// Provisioned throughput, when the store reports it.
    pub throughput: Option<u32>,
}

/// Requested configuration for a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub partition_key: PartitionKeyPath,
    pub throughput: Option<u32>,
    /// Client-side shape checked before writes; never sent to the store.
    pub schema: Option<DocumentSchema>,
}

impl ContainerSpec {
    /// Creates a container specification without throughput or schema.
    pub fn new(name: impl Into<String>, partition_key: PartitionKeyPath) -> Self {
        Self {
            name: name.into(),
            partition_key,
            throughput: None,
            schema: None,
        }
    }

    /// Sets the provisioned throughput.
    #[must_use]
    pub fn with_throughput(mut self, throughput: u32) -> Self {
        self.throughput = Some(throughput);
        self
    }

    /// Attaches a document schema.
    #[must_use]
    pub fn with_schema(mut self, schema: DocumentSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validates the specification.
    pub fn validate(&self) -> Result<()> {
        validate_resource_name("container", &self.name)?;

        if let Some(throughput) = self.throughput
            && throughput < MIN_THROUGHPUT
        {
            return Err(Error::validation().with_message(format!(
                "throughput {throughput} is below the minimum of {MIN_THROUGHPUT}"
            )));
        }

        Ok(())
    }
}

/// A requested setting that an existing container does not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "setting", rename_all = "snake_case")]
pub enum ConfigDrift {
    PartitionKey {
        requested: PartitionKeyPath,
        actual: PartitionKeyPath,
    },
    Throughput {
        requested: u32,
        actual: u32,
    },
}

impl ConfigDrift {
    /// Compares a request with what the store reported.
    ///
    /// Throughput the store does not report is not compared.
    pub fn detect(requested: &ContainerSpec, actual: &ContainerProperties) -> Vec<Self> {
        let mut drift = Vec::new();

        if requested.partition_key != actual.partition_key {
            drift.push(Self::PartitionKey {
                requested: requested.partition_key.clone(),
                actual: actual.partition_key.clone(),
            });
        }

        if let (Some(requested), Some(actual)) = (requested.throughput, actual.throughput)
            && requested != actual
        {
            drift.push(Self::Throughput { requested, actual });
        }

        drift
    }
}

impl fmt::Display for ConfigDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartitionKey { requested, actual } => {
                write!(f, "partition key path {actual} (requested {requested})")
            }
            Self::Throughput { requested, actual } => {
                write!(f, "throughput {actual} (requested {requested})")
            }
        }
    }
}

/// Handle to a provisioned database.
#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    inner: Arc<DatabaseHandleInner>,
}

#[derive(Debug)]
struct DatabaseHandleInner {
    name: String,
    outcome: ProvisionOutcome,
}

impl DatabaseHandle {
    /// Creates a handle from provisioned database properties.
    pub fn new(provisioned: Provisioned<DatabaseProperties>) -> Self {
        Self {
            inner: Arc::new(DatabaseHandleInner {
                name: provisioned.resource.id,
                outcome: provisioned.outcome,
            }),
        }
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns whether the provisioning call created the database.
    pub fn outcome(&self) -> ProvisionOutcome {
        self.inner.outcome
    }
}

impl PartialEq for DatabaseHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
    }
}

impl Eq for DatabaseHandle {}

/// Immutable, shareable handle to a provisioned container.
///
/// Equality compares the identity of the underlying container (database,
/// name and partition key path), not how the handle was obtained.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    inner: Arc<ContainerHandleInner>,
}

#[derive(Debug)]
struct ContainerHandleInner {
    database: String,
    name: String,
    partition_key: PartitionKeyPath,
    throughput: Option<u32>,
    schema: Option<DocumentSchema>,
    outcome: ProvisionOutcome,
    drift: Vec<ConfigDrift>,
}

impl ContainerHandle {
    /// Creates a handle from the request and what the store reported.
    pub fn new(
        database: &DatabaseHandle,
        spec: ContainerSpec,
        provisioned: Provisioned<ContainerProperties>,
    ) -> Self {
        let drift = ConfigDrift::detect(&spec, &provisioned.resource);
        let Provisioned { resource, outcome } = provisioned;

        Self {
            inner: Arc::new(ContainerHandleInner {
                database: database.name().to_owned(),
                name: resource.id,
                partition_key: resource.partition_key,
                throughput: resource.throughput,
                schema: spec.schema,
                outcome,
                drift,
            }),
        }
    }

    /// Returns the name of the parent database.
    pub fn database(&self) -> &str {
        &self.inner.database
    }

    /// Returns the container name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the partition key path the container actually uses.
    pub fn partition_key(&self) -> &PartitionKeyPath {
        &self.inner.partition_key
    }

    /// Returns the throughput the store reported, if any.
    pub fn throughput(&self) -> Option<u32> {
        self.inner.throughput
    }

    /// Returns the schema writes are checked against, if any.
    pub fn schema(&self) -> Option<&DocumentSchema> {
        self.inner.schema.as_ref()
    }

    /// Returns whether the provisioning call created the container.
    pub fn outcome(&self) -> ProvisionOutcome {
        self.inner.outcome
    }

    /// Returns the requested settings the existing container did not match.
    pub fn drift(&self) -> &[ConfigDrift] {
        &self.inner.drift
    }
}

impl PartialEq for ContainerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.database == other.inner.database
            && self.inner.name == other.inner.name
            && self.inner.partition_key == other.inner.partition_key
    }
}

impl Eq for ContainerHandle {}
