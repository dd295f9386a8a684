//! Explicit run configuration. The pipeline never reads the process environment;
//! the binary builds a [`SyncConfig`] once (usually via [`SyncConfig::from_env`])
//! and hands the pieces to the client and the store.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::shopify::RetryPolicy;
use crate::util::env::{env_opt, env_parse, env_parse_opt, env_req, redact_value};

pub const DEFAULT_API_VERSION: &str = "2024-07";

#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    /// libpq sslmode, always passed through to the connection string.
    pub ssl_mode: String,
    /// Full DSN that replaces the composed one when present.
    pub url_override: Option<String>,
    pub statement_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: None,
            database: "postgres".into(),
            ssl_mode: "disable".into(),
            url_override: None,
            statement_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env_opt("POSTGRES_HOST").unwrap_or(defaults.host),
            port: env_parse("POSTGRES_PORT", defaults.port)?,
            user: env_opt("POSTGRES_USER").unwrap_or(defaults.user),
            password: env_opt("POSTGRES_PASSWORD"),
            database: env_opt("POSTGRES_DB").unwrap_or(defaults.database),
            ssl_mode: env_opt("POSTGRES_SSLMODE").unwrap_or(defaults.ssl_mode),
            url_override: env_opt("DATABASE_URL"),
            statement_timeout: Duration::from_secs(env_parse("DB_STATEMENT_TIMEOUT_SECS", 30u64)?),
            connect_timeout: Duration::from_secs(env_parse("DB_CONNECT_TIMEOUT_SECS", 10u64)?),
        })
    }

    /// Connection string for the store. Built through `url::Url` so that user and
    /// password are percent-encoded (passwords often contain '@', '?' or '/').
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url_override {
            return Ok(url.clone());
        }

        let mut out = url::Url::parse("postgresql://localhost").context("base dsn")?;
        out.set_username(&self.user)
            .map_err(|_| anyhow::anyhow!("invalid database user"))?;
        if let Some(pass) = &self.password {
            out.set_password(Some(pass))
                .map_err(|_| anyhow::anyhow!("invalid database password"))?;
        }

        let host_trimmed = self.host.trim().trim_matches(|c| c == '[' || c == ']');
        let host = if host_trimmed.contains(':') {
            format!("[{host_trimmed}]")
        } else {
            host_trimmed.to_string()
        };
        out.set_host(Some(&host))
            .with_context(|| format!("invalid database host {}", self.host))?;
        out.set_port(Some(self.port))
            .map_err(|_| anyhow::anyhow!("invalid database port"))?;
        out.set_path(&format!("/{}", self.database));
        out.query_pairs_mut()
            .append_pair("sslmode", self.ssl_mode.trim());
        Ok(out.to_string())
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field(
                "url_override",
                &self
                    .url_override
                    .as_deref()
                    .map(|u| redact_value("DATABASE_URL", u)),
            )
            .field("statement_timeout", &self.statement_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[derive(Clone)]
pub struct ShopConfig {
    /// Store identifier, the `<shop>` in `<shop>.myshopify.com`.
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
    /// Overrides `https://<shop>.myshopify.com`.
    pub base_url: Option<String>,
    pub request_timeout: Duration,
    /// Optional `limit` query parameter for the single catalog request.
    pub limit: Option<u32>,
}

impl ShopConfig {
    pub fn new(shop: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.into(),
            base_url: None,
            request_timeout: Duration::from_secs(30),
            limit: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::new(env_req("SHOP_NAME")?, env_req("SHOPIFY_ACCESS_TOKEN")?);
        if let Some(version) = env_opt("SHOPIFY_API_VERSION") {
            cfg.api_version = version;
        }
        cfg.base_url = env_opt("SHOPIFY_BASE_URL");
        cfg.request_timeout = Duration::from_secs(env_parse("SHOPIFY_TIMEOUT_SECS", 30u64)?);
        cfg.limit = env_parse_opt("SHOPIFY_PAGE_LIMIT")?;
        Ok(cfg)
    }

    pub fn products_url(&self) -> String {
        let base = match &self.base_url {
            Some(b) => b.trim_end_matches('/').to_string(),
            None => format!("https://{}.myshopify.com", self.shop.trim()),
        };
        format!("{base}/admin/api/{}/products.json", self.api_version)
    }
}

impl fmt::Debug for ShopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopConfig")
            .field("shop", &self.shop)
            .field("access_token", &"***")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("limit", &self.limit)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub db: DbConfig,
    pub shop: ShopConfig,
    pub retry: RetryPolicy,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db: DbConfig::from_env().context("database configuration")?,
            shop: ShopConfig::from_env().context("shop configuration")?,
            retry: RetryPolicy::from_env().context("retry configuration")?,
        })
    }

    /// Log the effective configuration once, secrets masked.
    pub fn log_snapshot(&self) {
        info!(
            target = "config",
            db = ?self.db,
            shop = ?self.shop,
            retry = ?self.retry,
            "configuration snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_dsn_with_encoded_password() {
        let cfg = DbConfig {
            password: Some("p@ss?word/1".into()),
            database: "catalog".into(),
            ..DbConfig::default()
        };
        let url = cfg.connection_url().unwrap();
        assert!(url.starts_with("postgresql://postgres:"));
        assert!(url.contains("p%40ss%3Fword%2F1"));
        assert!(url.ends_with("@localhost:5432/catalog?sslmode=disable"));
    }

    #[test]
    fn always_appends_configured_sslmode() {
        let cfg = DbConfig {
            ssl_mode: "require".into(),
            ..DbConfig::default()
        };
        assert!(cfg.connection_url().unwrap().ends_with("?sslmode=require"));

        let disabled = DbConfig::default().connection_url().unwrap();
        assert!(disabled.ends_with("/postgres?sslmode=disable"));
    }

    #[test]
    fn brackets_ipv6_hosts() {
        let cfg = DbConfig {
            host: "::1".into(),
            ..DbConfig::default()
        };
        assert!(cfg.connection_url().unwrap().contains("@[::1]:5432/"));
    }

    #[test]
    fn url_override_wins() {
        let cfg = DbConfig {
            url_override: Some("postgres://u:p@elsewhere/db".into()),
            ..DbConfig::default()
        };
        assert_eq!(cfg.connection_url().unwrap(), "postgres://u:p@elsewhere/db");
    }

    #[test]
    fn debug_output_masks_secrets() {
        let cfg = DbConfig {
            password: Some("hunter2".into()),
            url_override: Some("postgres://u:hunter2@h/db".into()),
            ..DbConfig::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("hunter2"));

        let shop = ShopConfig::new("acme", "shpat_secret");
        assert!(!format!("{shop:?}").contains("shpat_secret"));
    }

    #[test]
    fn builds_versioned_products_url() {
        let shop = ShopConfig::new("acme", "t");
        assert_eq!(
            shop.products_url(),
            "https://acme.myshopify.com/admin/api/2024-07/products.json"
        );

        let mut local = ShopConfig::new("acme", "t");
        local.base_url = Some("http://127.0.0.1:9000/".into());
        local.api_version = "2025-01".into();
        assert_eq!(
            local.products_url(),
            "http://127.0.0.1:9000/admin/api/2025-01/products.json"
        );
    }
}
