pub mod client;
pub mod retry;

pub use client::ShopifyClient;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::ProductPayload;

/// Anything that went wrong while retrieving the catalog. Fatal to a run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Transport failures and 5xx responses may succeed on a later attempt;
    /// client errors and undecodable bodies will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::Transport(e) => !e.is_builder() && !e.is_decode(),
            FetchError::Decode(_) => false,
        }
    }
}

/// Source of a full catalog snapshot. Payloads are shape-checked but not yet
/// validated; the sync loop converts them one product at a time.
#[async_trait]
pub trait CatalogSource {
    async fn fetch_catalog(&self) -> Result<Vec<ProductPayload>, FetchError>;
}
