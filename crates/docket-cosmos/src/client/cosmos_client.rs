//! Reqwest-based gateway for the Cosmos DB SQL REST API.

use std::sync::Arc;
use std::time::Duration;

use docket_core::query::{ContinuationToken, QueryPage, QueryRequest};
use docket_core::types::{
    ContainerHandle, ContainerProperties, ContainerSpec, DatabaseHandle, DatabaseProperties,
    Document, PartitionKey, Provisioned,
};
use docket_core::{GatewayOperation, StoreGateway};
use jiff::Timestamp;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use url::Url;
use uuid::Uuid;

use super::resources::{ContainerResource, DatabaseResource, QueryResponse, ServiceError};
use crate::auth::{MasterKey, ResourceType, rfc1123};
use crate::error::{Error, Result};
use crate::{CosmosConfig, TRACING_TARGET_CLIENT};

/// REST API version sent with every request.
pub const API_VERSION: &str = "2018-12-31";

pub(crate) mod headers {
    pub const DATE: &str = "x-ms-date";
    pub const VERSION: &str = "x-ms-version";
    pub const ACTIVITY_ID: &str = "x-ms-activity-id";
    pub const PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
    pub const OFFER_THROUGHPUT: &str = "x-ms-offer-throughput";
    pub const IS_QUERY: &str = "x-ms-documentdb-isquery";
    pub const ENABLE_CROSS_PARTITION: &str = "x-ms-documentdb-query-enablecrosspartition";
    pub const CONTINUATION: &str = "x-ms-continuation";
    pub const MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
    pub const REQUEST_CHARGE: &str = "x-ms-request-charge";
    pub const RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";
}

const QUERY_CONTENT_TYPE: &str = "application/query+json";

/// Inner state shared by every clone of the gateway.
struct CosmosGatewayInner {
    http: Client,
    config: CosmosConfig,
    endpoint: Url,
    key: MasterKey,
}

/// [`StoreGateway`] backed by a Cosmos DB account.
///
/// Requests are signed with the account master key. The HTTP client is
/// shared by all clones and released with the last one.
///
/// # Examples
///
/// ```rust,ignore
/// use docket_cosmos::{CosmosConfig, CosmosGateway};
/// use docket_core::DocumentSession;
///
/// let config = CosmosConfig::new("https://localhost:8081/", key);
/// let session = DocumentSession::new(CosmosGateway::new(config)?);
/// ```
#[derive(Clone)]
pub struct CosmosGateway {
    inner: Arc<CosmosGatewayInner>,
}

impl std::fmt::Debug for CosmosGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosGateway")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl CosmosGateway {
    /// Creates a gateway from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the settings are invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: CosmosConfig) -> docket_core::Result<Self> {
        config.validate()?;

        let endpoint = config.endpoint()?;
        let key = MasterKey::new(&config.key_bytes()?)?;
        let timeout = config.timeout();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %endpoint,
            timeout_ms = timeout.as_millis(),
            "Creating Cosmos DB client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| {
                docket_core::Error::configuration()
                    .with_message("failed to create HTTP client")
                    .with_source(e)
            })?;

        let inner = CosmosGatewayInner {
            http,
            config,
            endpoint,
            key,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the gateway configuration.
    pub fn config(&self) -> &CosmosConfig {
        &self.inner.config
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Builds a signed request.
    ///
    /// `resource_link` names the signed resource: the parent for creates and
    /// queries, the resource itself for reads.
    fn request(
        &self,
        method: Method,
        resource_type: ResourceType,
        resource_link: &str,
        segments: &[&str],
    ) -> RequestBuilder {
        let date = rfc1123(Timestamp::now());
        let authorization =
            self.inner
                .key
                .authorization(&method, resource_type, resource_link, &date);

        self.inner
            .http
            .request(method, self.url(segments))
            .header(headers::DATE, date)
            .header(headers::VERSION, API_VERSION)
            .header(headers::ACTIVITY_ID, Uuid::new_v4().to_string())
            .header(AUTHORIZATION, authorization)
    }

    /// Sends a request and turns non-success statuses into service errors.
    async fn send(&self, operation: GatewayOperation, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            operation = %operation,
            status = status.as_u16(),
            request_charge = header(response.headers(), headers::REQUEST_CHARGE).unwrap_or("0"),
            activity_id = header(response.headers(), headers::ACTIVITY_ID).unwrap_or_default(),
            "Cosmos DB request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = header(response.headers(), headers::RETRY_AFTER_MS)
            .and_then(|ms| ms.parse::<f64>().ok())
            .map(|ms| Duration::from_secs_f64(ms.max(0.0) / 1000.0));
        let body = response.text().await.unwrap_or_default();

        Err(service_error(operation, status, retry_after, &body))
    }

    async fn read_database(&self, name: &str) -> Result<DatabaseResource> {
        let link = format!("dbs/{name}");
        let request = self.request(Method::GET, ResourceType::Database, &link, &["dbs", name]);
        let response = self.send(GatewayOperation::CreateDatabase, request).await?;
        Ok(response.json().await?)
    }

    async fn read_container(&self, database: &str, name: &str) -> Result<ContainerResource> {
        let link = format!("dbs/{database}/colls/{name}");
        let request = self.request(
            Method::GET,
            ResourceType::Container,
            &link,
            &["dbs", database, "colls", name],
        );
        let response = self.send(GatewayOperation::CreateContainer, request).await?;
        Ok(response.json().await?)
    }
}

/// Returns a header value if it is present and valid text.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Builds a service error from a failed response.
fn service_error(
    operation: GatewayOperation,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> Error {
    let message = serde_json::from_str::<ServiceError>(body)
        .ok()
        .and_then(|error| match (error.code, error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_owned()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());

    Error::Service {
        operation,
        status,
        message,
        retry_after,
    }
}

#[async_trait::async_trait]
impl StoreGateway for CosmosGateway {
    async fn create_database_if_absent(
        &self,
        name: &str,
    ) -> docket_core::Result<Provisioned<DatabaseProperties>> {
        let request = self
            .request(Method::POST, ResourceType::Database, "", &["dbs"])
            .json(&DatabaseResource { id: name.to_owned() });

        match self.send(GatewayOperation::CreateDatabase, request).await {
            Ok(response) => {
                let resource: DatabaseResource = response.json().await.map_err(Error::from)?;
                Ok(Provisioned::created(resource.into()))
            }
            Err(error) if error.status() == Some(StatusCode::CONFLICT) => {
                tracing::debug!(
                    target: TRACING_TARGET_CLIENT,
                    database = %name,
                    "Database already exists"
                );
                let resource = self.read_database(name).await?;
                Ok(Provisioned::existing(resource.into()))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn create_container_if_absent(
        &self,
        database: &DatabaseHandle,
        spec: &ContainerSpec,
    ) -> docket_core::Result<Provisioned<ContainerProperties>> {
        let link = format!("dbs/{}", database.name());
        let mut request = self
            .request(
                Method::POST,
                ResourceType::Container,
                &link,
                &["dbs", database.name(), "colls"],
            )
            .json(&ContainerResource::new(&spec.name, &spec.partition_key));

        if let Some(throughput) = spec.throughput {
            request = request.header(headers::OFFER_THROUGHPUT, throughput.to_string());
        }

        match self.send(GatewayOperation::CreateContainer, request).await {
            Ok(response) => {
                let resource: ContainerResource = response.json().await.map_err(Error::from)?;
                Ok(Provisioned::created(
                    resource.into_properties(spec.throughput)?,
                ))
            }
            Err(error) if error.status() == Some(StatusCode::CONFLICT) => {
                tracing::debug!(
                    target: TRACING_TARGET_CLIENT,
                    database = %database.name(),
                    container = %spec.name,
                    "Container already exists"
                );
                let resource = self.read_container(database.name(), &spec.name).await?;
                Ok(Provisioned::existing(resource.into_properties(None)?))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn put_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        document: &Document,
    ) -> docket_core::Result<Document> {
        let link = format!("dbs/{}/colls/{}", container.database(), container.name());
        let request = self
            .request(
                Method::POST,
                ResourceType::Document,
                &link,
                &["dbs", container.database(), "colls", container.name(), "docs"],
            )
            .header(headers::PARTITION_KEY, partition_key.to_header_value())
            .json(document);

        let response = self.send(GatewayOperation::PutItem, request).await?;
        Ok(response.json().await.map_err(Error::from)?)
    }

    async fn get_item(
        &self,
        container: &ContainerHandle,
        partition_key: &PartitionKey,
        id: &str,
    ) -> docket_core::Result<Document> {
        let link = format!(
            "dbs/{}/colls/{}/docs/{id}",
            container.database(),
            container.name()
        );
        let request = self
            .request(
                Method::GET,
                ResourceType::Document,
                &link,
                &["dbs", container.database(), "colls", container.name(), "docs", id],
            )
            .header(headers::PARTITION_KEY, partition_key.to_header_value());

        let response = self.send(GatewayOperation::GetItem, request).await?;
        Ok(response.json().await.map_err(Error::from)?)
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        request: &QueryRequest,
        continuation: Option<&ContinuationToken>,
    ) -> docket_core::Result<QueryPage> {
        let link = format!("dbs/{}/colls/{}", container.database(), container.name());
        let body = serde_json::to_vec(request).map_err(Error::from)?;

        let mut http_request = self
            .request(
                Method::POST,
                ResourceType::Document,
                &link,
                &["dbs", container.database(), "colls", container.name(), "docs"],
            )
            .header(CONTENT_TYPE, QUERY_CONTENT_TYPE)
            .header(headers::IS_QUERY, "True")
            .header(headers::ENABLE_CROSS_PARTITION, "True")
            .body(body);

        if let Some(token) = continuation {
            http_request = http_request.header(headers::CONTINUATION, token.as_str());
        }
        if let Some(max_item_count) = self.inner.config.cosmos_max_item_count {
            http_request = http_request.header(headers::MAX_ITEM_COUNT, max_item_count.to_string());
        }

        let response = self.send(GatewayOperation::QueryPage, http_request).await?;
        let next = header(response.headers(), headers::CONTINUATION)
            .filter(|token| !token.is_empty())
            .map(ContinuationToken::new);
        let page: QueryResponse = response.json().await.map_err(Error::from)?;

        Ok(QueryPage::new(page.documents, next))
    }
}
