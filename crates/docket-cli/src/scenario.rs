//! The sample product-catalog scenario.

use std::io::Write;

use anyhow::Context;
use docket_core::{DocumentSession, ErrorKind, QueryRequest, StoreGateway};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_SCENARIO;
use crate::config::ScenarioConfig;

/// Catalog record written and queried by the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub category_id: String,
    pub category_name: String,
    pub name: String,
    pub quantity: i64,
    pub sale: bool,
}

impl Product {
    /// The surfboard every run creates.
    pub fn surfboard() -> Self {
        Self {
            id: "70b63682-b93a-4c77-aad2-65501347265f".into(),
            category_id: "61dba35b-4f02-45c5-b648-c6badc0cbd76".into(),
            category_name: "gear-surf-surfboards".into(),
            name: "Yamba Surfboard".into(),
            quantity: 12,
            sale: false,
        }
    }
}

/// Provisions the resources, creates the sample product, reads it back and
/// lists its category, writing one line per step to `out`.
///
/// A product left over from an earlier run is reused instead of failing.
pub async fn run<G, W>(
    session: &DocumentSession<G>,
    config: &ScenarioConfig,
    out: &mut W,
) -> anyhow::Result<()>
where
    G: StoreGateway + ?Sized + 'static,
    W: Write,
{
    let provisioner = session.provisioner();

    let database = provisioner
        .ensure_database(&config.database)
        .await
        .context("failed to provision database")?;
    writeln!(out, "Database: {} ({})", database.name(), database.outcome())?;

    let container = provisioner
        .ensure_container(&database, config.container_spec()?)
        .await
        .context("failed to provision container")?;
    writeln!(out, "Container: {} ({})", container.name(), container.outcome())?;

    let items = session.items();
    let product = Product::surfboard();

    let created = match items.create(&container, &product).await {
        Ok(created) => created,
        Err(error) if error.is(ErrorKind::Conflict) => {
            tracing::warn!(
                target: TRACING_TARGET_SCENARIO,
                id = %product.id,
                "Product already exists, reusing it"
            );
            items
                .read(&container, &product.id, product.category_id.as_str())
                .await
                .context("failed to read existing product")?
        }
        Err(error) => return Err(error).context("failed to create product"),
    };
    writeln!(out, "Created item: {} [{}]", created.id, created.category_name)?;

    let read: Product = items
        .read(&container, &created.id, created.category_id.as_str())
        .await
        .context("failed to read product")?;
    writeln!(out, "Read item: {} [{}]", read.id, read.category_name)?;

    let request = QueryRequest::new("SELECT * FROM products p WHERE p.categoryId = @categoryId")
        .with_parameter("@categoryId", read.category_id.as_str());

    let mut cursor = session.query::<Product>(&container, request);
    let mut found = 0_usize;
    while cursor.has_more() {
        let page = cursor.next_page().await.context("failed to query products")?;
        for product in page {
            writeln!(out, "Found item: {} ({})", product.name, product.id)?;
            found += 1;
        }
    }

    tracing::info!(
        target: TRACING_TARGET_SCENARIO,
        database = %database.name(),
        container = %container.name(),
        found,
        "Scenario finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use docket_core::memory::MemoryGateway;
    use docket_core::{Error, GatewayOperation};

    use super::*;

    fn config() -> ScenarioConfig {
        ScenarioConfig {
            database: "testdb".into(),
            container: "container".into(),
            partition_key_path: "/categoryId".into(),
            throughput: 400,
        }
    }

    async fn run_to_string(session: &DocumentSession<MemoryGateway>) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run(session, &config(), &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_first_run() {
        let session = DocumentSession::new(MemoryGateway::new());
        let output = run_to_string(&session).await.unwrap();

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Database: testdb (created)",
                "Container: container (created)",
                "Created item: 70b63682-b93a-4c77-aad2-65501347265f [gear-surf-surfboards]",
                "Read item: 70b63682-b93a-4c77-aad2-65501347265f [gear-surf-surfboards]",
                "Found item: Yamba Surfboard (70b63682-b93a-4c77-aad2-65501347265f)",
            ]
        );
    }

    #[tokio::test]
    async fn test_second_run_reuses_resources() {
        let session = DocumentSession::new(MemoryGateway::new());
        run_to_string(&session).await.unwrap();
        let output = run_to_string(&session).await.unwrap();

        assert!(output.contains("Database: testdb (existing)"));
        assert!(output.contains("Container: container (existing)"));
        assert_eq!(output.matches("Found item:").count(), 1);
        assert_eq!(session.gateway().document_count("testdb", "container").await, 1);
    }

    #[tokio::test]
    async fn test_provisioning_failure() {
        let session = DocumentSession::new(MemoryGateway::new());
        session.gateway().fail_next(
            GatewayOperation::CreateDatabase,
            Error::transport().with_message("unreachable"),
        );

        let error = run_to_string(&session).await.unwrap_err();
        let core = error.downcast_ref::<Error>().unwrap();
        assert_eq!(core.kind, ErrorKind::Transport);
    }
}
