use anyhow::{Context, Result};
use tracing::info;

use crate::util::db::Db;

/// Tables the writer expects. Remote ids are the primary keys; `handle` is unique
/// per catalog and every variant references its product.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    remote_id     BIGINT PRIMARY KEY,
    title         TEXT NOT NULL,
    body_html     TEXT,
    vendor        TEXT,
    product_type  TEXT,
    handle        TEXT NOT NULL,
    status        TEXT NOT NULL,
    created_at    TIMESTAMPTZ,
    updated_at    TIMESTAMPTZ,
    synced_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT products_handle_key UNIQUE (handle)
);

CREATE TABLE IF NOT EXISTS variants (
    remote_id           BIGINT PRIMARY KEY,
    product_remote_id   BIGINT NOT NULL,
    title               TEXT,
    sku                 TEXT,
    position            INTEGER,
    price               NUMERIC NOT NULL,
    inventory_quantity  INTEGER NOT NULL,
    synced_at           TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT variants_product_remote_id_fkey FOREIGN KEY (product_remote_id)
        REFERENCES products (remote_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS variants_product_remote_id_idx ON variants (product_remote_id);
"#;

/// Create the catalog tables when missing. Existing tables are left as they are.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&db.pool)
        .await
        .context("create catalog tables")?;
    info!("catalog schema ensured");
    Ok(())
}
