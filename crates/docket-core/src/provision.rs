//! Idempotent database and container provisioning.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::gateway::StoreGateway;
use crate::session::cancellable;
use crate::types::{
    ContainerHandle, ContainerSpec, DatabaseHandle, PartitionKeyPath, validate_resource_name,
};
use crate::{Error, ErrorKind, Result, TRACING_TARGET_PROVISION};

/// Ensures databases and containers exist.
///
/// Missing resources are created with the requested configuration. Existing
/// ones are returned as they are and never modified; settings that differ
/// from the request are reported through [`ContainerHandle::drift`].
pub struct Provisioner<G: ?Sized> {
    gateway: Arc<G>,
    token: CancellationToken,
}

impl<G: StoreGateway + ?Sized> Provisioner<G> {
    /// Creates a provisioner over a shared gateway.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            token: CancellationToken::new(),
        }
    }

    /// Binds the provisioner to a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns a handle to the named database, creating it if needed.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_PROVISION)]
    pub async fn ensure_database(&self, name: &str) -> Result<DatabaseHandle> {
        validate_resource_name("database", name)?;

        let provisioned = cancellable(&self.token, self.gateway.create_database_if_absent(name))
            .await
            .map_err(into_provisioning)?;

        tracing::info!(
            target: TRACING_TARGET_PROVISION,
            database = %provisioned.resource.id,
            outcome = %provisioned.outcome,
            "Database ready"
        );

        Ok(DatabaseHandle::new(provisioned))
    }

    /// Returns a handle to a container, creating it if needed.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_PROVISION,
        fields(database = %database.name(), container = %spec.name)
    )]
    pub async fn ensure_container(
        &self,
        database: &DatabaseHandle,
        spec: ContainerSpec,
    ) -> Result<ContainerHandle> {
        spec.validate()?;

        let provisioned = cancellable(
            &self.token,
            self.gateway.create_container_if_absent(database, &spec),
        )
        .await
        .map_err(into_provisioning)?;

        let handle = ContainerHandle::new(database, spec, provisioned);

        for drift in handle.drift() {
            tracing::warn!(
                target: TRACING_TARGET_PROVISION,
                database = %handle.database(),
                container = %handle.name(),
                drift = %drift,
                "Existing container differs from the requested configuration"
            );
        }

        tracing::info!(
            target: TRACING_TARGET_PROVISION,
            database = %handle.database(),
            container = %handle.name(),
            partition_key = %handle.partition_key(),
            throughput = ?handle.throughput(),
            outcome = %handle.outcome(),
            "Container ready"
        );

        Ok(handle)
    }

    /// Positional form of [`ensure_container`](Self::ensure_container).
    pub async fn ensure_container_with(
        &self,
        database: &DatabaseHandle,
        name: &str,
        partition_key_path: &str,
        throughput: Option<u32>,
    ) -> Result<ContainerHandle> {
        let mut spec = ContainerSpec::new(name, PartitionKeyPath::new(partition_key_path)?);
        spec.throughput = throughput;
        self.ensure_container(database, spec).await
    }
}

impl<G: ?Sized> Clone for Provisioner<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            token: self.token.clone(),
        }
    }
}

impl<G: ?Sized> std::fmt::Debug for Provisioner<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner").finish_non_exhaustive()
    }
}

/// Reclassifies gateway faults that idempotent creation cannot absorb.
fn into_provisioning(mut error: Error) -> Error {
    match error.kind {
        ErrorKind::Transport
        | ErrorKind::Cancelled
        | ErrorKind::Validation
        | ErrorKind::Provisioning => error,
        _ => {
            error.kind = ErrorKind::Provisioning;
            error
        }
    }
}
