use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::{info, instrument};

use crate::config::DbConfig;

/// The single database handle of a run.
///
/// Backed by a pool capped at one connection: acquired at startup, held for the
/// run and released by [`Db::close`].
#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(cfg))]
    pub async fn connect(cfg: &DbConfig) -> Result<Self> {
        let url = cfg.connection_url()?;
        let statement_timeout_ms = cfg.statement_timeout.as_millis();
        let connect_options = PgConnectOptions::from_str(&url)
            .context("parse database url")?
            .options([("statement_timeout", statement_timeout_ms.to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(cfg.connect_timeout)
            .connect_with(connect_options)
            .await
            .context("connect to database")?;
        info!(statement_timeout_ms = statement_timeout_ms as u64, "connected to db");
        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("db connection closed");
    }
}
