//! Synchronizes a Shopify-style product catalog into PostgreSQL.
//!
//! One run fetches the whole catalog once ([`shopify::ShopifyClient`]), then writes
//! each product and its variants with an insert-or-skip policy keyed by the remote
//! ids ([`database_ops::PgCatalogWriter`]). [`orchestrator::SyncOrchestrator`] ties
//! the two together and reports per-product failures without stopping the run.

pub mod catalog;
pub mod config;
pub mod database_ops;
pub mod orchestrator;
pub mod shopify;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use catalog::{Product, ProductStatus, RemoteId, Variant};
pub use config::{DbConfig, ShopConfig, SyncConfig};
pub use database_ops::{CatalogWriter, MemoryStore, PgCatalogWriter, WriteError};
pub use orchestrator::{SyncOrchestrator, SyncPhase, SyncReport};
pub use shopify::{CatalogSource, FetchError, RetryPolicy, ShopifyClient};
