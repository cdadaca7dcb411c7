//! Cosmos DB REST client.

mod cosmos_client;
mod resources;

pub use cosmos_client::{API_VERSION, CosmosGateway};
