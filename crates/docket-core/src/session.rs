//! Session scoping a gateway and a cancellation token.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::gateway::StoreGateway;
use crate::items::ItemAccessor;
use crate::provision::Provisioner;
use crate::query::{QueryCursor, QueryRequest};
use crate::types::{ContainerHandle, Document};
use crate::{Error, Result};

/// Runs a gateway call unless the token fires first.
pub(crate) async fn cancellable<F, T>(token: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::cancelled()),
        result = operation => result,
    }
}

/// Entry point that owns a gateway and hands out components bound to it.
///
/// Every component built from a session shares its gateway and observes its
/// cancellation scope. Dropping the session cancels operations still
/// running under that scope.
///
/// ```no_run
/// # async fn demo(gateway: docket_core::memory::MemoryGateway) -> docket_core::Result<()> {
/// use docket_core::{ContainerSpec, DocumentSession, PartitionKeyPath};
///
/// let session = DocumentSession::new(gateway);
/// let database = session.provisioner().ensure_database("testdb").await?;
/// let spec = ContainerSpec::new("container", PartitionKeyPath::new("/categoryId")?)
///     .with_throughput(400);
/// let container = session.provisioner().ensure_container(&database, spec).await?;
/// # let _ = container;
/// # Ok(())
/// # }
/// ```
pub struct DocumentSession<G: ?Sized> {
    gateway: Arc<G>,
    token: CancellationToken,
    // Cancels the scope when the last clone of the session drops.
    _scope: Arc<DropGuard>,
}

impl<G: StoreGateway + 'static> DocumentSession<G> {
    /// Creates a session over a gateway.
    pub fn new(gateway: G) -> Self {
        Self::from_arc(Arc::new(gateway))
    }
}

impl<G: StoreGateway + ?Sized + 'static> DocumentSession<G> {
    /// Creates a session over a shared gateway.
    pub fn from_arc(gateway: Arc<G>) -> Self {
        Self::scoped(gateway, CancellationToken::new())
    }

    /// Creates a session whose scope is cancelled along with `parent`.
    pub fn with_cancellation(gateway: Arc<G>, parent: &CancellationToken) -> Self {
        Self::scoped(gateway, parent.child_token())
    }

    fn scoped(gateway: Arc<G>, token: CancellationToken) -> Self {
        Self {
            gateway,
            _scope: Arc::new(token.clone().drop_guard()),
            token,
        }
    }

    /// Returns the shared gateway.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Returns a provisioner bound to this session.
    pub fn provisioner(&self) -> Provisioner<G> {
        Provisioner::new(self.gateway.clone()).with_cancellation(self.token.child_token())
    }

    /// Returns an item accessor bound to this session.
    pub fn items(&self) -> ItemAccessor<G> {
        ItemAccessor::new(self.gateway.clone()).with_cancellation(self.token.child_token())
    }

    /// Returns a cursor over the results of a query.
    pub fn query<T>(&self, container: &ContainerHandle, request: QueryRequest) -> QueryCursor<G, T>
    where
        T: DeserializeOwned,
    {
        QueryCursor::new(self.gateway.clone(), container.clone(), request)
            .with_cancellation(self.token.child_token())
    }

    /// Returns an untyped cursor over the results of a query.
    pub fn query_documents(
        &self,
        container: &ContainerHandle,
        request: QueryRequest,
    ) -> QueryCursor<G, Document> {
        self.query(container, request)
    }

    /// Cancels every operation running under this session.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the session has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<G: ?Sized> Clone for DocumentSession<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            token: self.token.clone(),
            _scope: self._scope.clone(),
        }
    }
}

impl<G: ?Sized> std::fmt::Debug for DocumentSession<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}
