//! Lazy, forward-only cursor over paginated query results.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::{ContinuationToken, QueryRequest};
use crate::gateway::StoreGateway;
use crate::session::cancellable;
use crate::types::{ContainerHandle, Document};
use crate::{Result, TRACING_TARGET_QUERY};

/// Where a cursor is in its result sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// No page has been fetched yet.
    NotStarted,
    /// More pages follow the given token.
    InProgress(ContinuationToken),
    /// The last page has been fetched.
    Exhausted,
}

/// Executes a query page by page.
///
/// Each [`next_page`](Self::next_page) makes one gateway round trip. The
/// query is validated on the first fetch rather than at construction. A
/// failed fetch leaves the cursor where it was, so the caller may try the
/// same page again. A cursor cannot be rewound; build a new one to restart.
pub struct QueryCursor<G: ?Sized, T = Document> {
    gateway: Arc<G>,
    container: ContainerHandle,
    request: QueryRequest,
    state: CursorState,
    buffered: VecDeque<T>,
    token: CancellationToken,
    _marker: PhantomData<fn() -> T>,
}

impl<G, T> QueryCursor<G, T>
where
    G: StoreGateway + ?Sized,
    T: DeserializeOwned,
{
    /// Creates a cursor that has not fetched anything yet.
    pub fn new(gateway: Arc<G>, container: ContainerHandle, request: QueryRequest) -> Self {
        Self {
            gateway,
            container,
            request,
            state: CursorState::NotStarted,
            buffered: VecDeque::new(),
            token: CancellationToken::new(),
            _marker: PhantomData,
        }
    }

    /// Binds the cursor to a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Returns the request this cursor executes.
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Returns `true` while results may remain.
    pub fn has_more(&self) -> bool {
        !self.buffered.is_empty() || self.state != CursorState::Exhausted
    }

    /// Fetches the next page of results.
    ///
    /// Items already buffered by [`next_item`](Self::next_item) are returned
    /// first, without a round trip. An exhausted cursor returns an empty page.
    ///
    /// # Errors
    ///
    /// Returns a query error if the request is malformed, a serialization
    /// error if a document does not match `T`, or whatever the gateway
    /// reports.
    pub async fn next_page(&mut self) -> Result<Vec<T>> {
        if !self.buffered.is_empty() {
            return Ok(self.buffered.drain(..).collect());
        }

        self.fetch().await
    }

    /// Returns the next result, fetching pages as needed.
    pub async fn next_item(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }

            if self.state == CursorState::Exhausted {
                return Ok(None);
            }

            let page = self.fetch().await?;
            self.buffered.extend(page);
        }
    }

    /// Drains every remaining result into a vector.
    pub async fn collect_remaining(&mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while self.has_more() {
            items.extend(self.next_page().await?);
        }
        Ok(items)
    }

    /// Converts the cursor into a stream of results.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<T>> {
        async_stream::try_stream! {
            while let Some(item) = self.next_item().await? {
                yield item;
            }
        }
    }

    async fn fetch(&mut self) -> Result<Vec<T>> {
        let continuation = match &self.state {
            CursorState::Exhausted => return Ok(Vec::new()),
            CursorState::NotStarted => {
                self.request.validate()?;
                None
            }
            CursorState::InProgress(token) => Some(token.clone()),
        };

        let page = cancellable(
            &self.token,
            self.gateway
                .query_page(&self.container, &self.request, continuation.as_ref()),
        )
        .await?;

        let items = page
            .documents
            .into_iter()
            .map(|document| document.without_system_properties().into_typed::<T>())
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            container = %self.container.name(),
            count = items.len(),
            last = page.continuation.is_none(),
            "Fetched query page"
        );

        self.state = match page.continuation {
            Some(token) => CursorState::InProgress(token),
            None => CursorState::Exhausted,
        };

        Ok(items)
    }
}

impl<G: ?Sized, T> fmt::Debug for QueryCursor<G, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCursor")
            .field("container", &self.container.name())
            .field("query", &self.request.text())
            .field("state", &self.state)
            .field("buffered", &self.buffered.len())
            .finish()
    }
}
