use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::{debug, info, warn};

use super::{CatalogSource, FetchError, RetryPolicy};
use crate::catalog::{decode_catalog, ProductPayload};
use crate::config::ShopConfig;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const MAX_ERROR_BODY: usize = 2000;

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Admin REST client for one store's product catalog.
///
/// Issues a single `GET /admin/api/<version>/products.json` per attempt with the
/// access token in `X-Shopify-Access-Token`.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    http: Client,
    url: String,
    access_token: String,
    limit: Option<u32>,
    retry: RetryPolicy,
}

impl ShopifyClient {
    pub fn new(cfg: &ShopConfig, retry: RetryPolicy) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            url: cfg.products_url(),
            access_token: cfg.access_token.clone(),
            limit: cfg.limit,
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> Result<Vec<ProductPayload>, FetchError> {
        let mut req = self
            .http
            .get(&self.url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(ACCESS_TOKEN_HEADER, &self.access_token);
        if let Some(limit) = self.limit {
            req = req.query(&[("limit", limit)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), MAX_ERROR_BODY);
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        debug!(body_len = body.len(), "catalog response received");
        Ok(decode_catalog(&body)?)
    }

    /// Fetch the whole catalog, applying the configured retry policy.
    pub async fn fetch_catalog(&self) -> Result<Vec<ProductPayload>, FetchError> {
        let max_attempts = self.retry.attempts();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            info!(url = %self.url, attempt, max_attempts, "fetching catalog");
            match self.fetch_once().await {
                Ok(products) => {
                    info!(products = products.len(), attempt, "catalog fetched");
                    return Ok(products);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "catalog fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl CatalogSource for ShopifyClient {
    async fn fetch_catalog(&self) -> Result<Vec<ProductPayload>, FetchError> {
        ShopifyClient::fetch_catalog(self).await
    }
}
