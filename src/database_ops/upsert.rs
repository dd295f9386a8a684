use async_trait::async_trait;
use tracing::debug;

use super::{CatalogWriter, StoreCounts, VariantInsert, WriteError};
use crate::catalog::{Product, RemoteId, Variant};
use crate::util::db::Db;

// Conflict target is the remote id only: any other unique violation (e.g. a
// handle reused by a different product) must surface as an error.
const INSERT_PRODUCT: &str = "INSERT INTO products \
     (remote_id, title, body_html, vendor, product_type, handle, status, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
     ON CONFLICT (remote_id) DO NOTHING \
     RETURNING remote_id";

const INSERT_VARIANT: &str = "INSERT INTO variants \
     (remote_id, product_remote_id, title, sku, position, price, inventory_quantity) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) \
     ON CONFLICT (remote_id) DO NOTHING \
     RETURNING remote_id";

/// Postgres-backed insert-or-skip writer. Every statement autocommits, so rows
/// written before a failure stay visible.
pub struct PgCatalogWriter {
    db: Db,
}

impl PgCatalogWriter {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn into_db(self) -> Db {
        self.db
    }
}

#[async_trait]
impl CatalogWriter for PgCatalogWriter {
    async fn insert_product(&mut self, product: &Product) -> Result<bool, WriteError> {
        let inserted = sqlx::query_scalar::<_, i64>(INSERT_PRODUCT)
            .bind(product.remote_id)
            .bind(&product.title)
            .bind(product.body_html.as_deref())
            .bind(product.vendor.as_deref())
            .bind(product.product_type.as_deref())
            .bind(&product.handle)
            .bind(product.status.as_str())
            .bind(product.created_at)
            .bind(product.updated_at)
            .fetch_optional(&self.db.pool)
            .await?;
        debug!(
            product_id = product.remote_id,
            inserted = inserted.is_some(),
            "product row"
        );
        Ok(inserted.is_some())
    }

    async fn insert_variant(
        &mut self,
        product_id: RemoteId,
        variant: &Variant,
    ) -> Result<VariantInsert, WriteError> {
        let inserted = sqlx::query_scalar::<_, i64>(INSERT_VARIANT)
            .bind(variant.remote_id)
            .bind(product_id)
            .bind(variant.title.as_deref())
            .bind(variant.sku.as_deref())
            .bind(variant.position)
            .bind(&variant.price)
            .bind(variant.inventory_quantity)
            .fetch_optional(&self.db.pool)
            .await?;
        if inserted.is_some() {
            return Ok(VariantInsert::Inserted);
        }

        let owner = sqlx::query_scalar::<_, i64>(
            "SELECT product_remote_id FROM variants WHERE remote_id = $1",
        )
        .bind(variant.remote_id)
        .fetch_optional(&self.db.pool)
        .await?;
        // Only one writer runs, so a conflicting row that vanished again is not expected;
        // treat it as belonging to this product.
        Ok(VariantInsert::Existing {
            owner: owner.unwrap_or(product_id),
        })
    }

    async fn counts(&mut self) -> Result<StoreCounts, WriteError> {
        let (products, variants): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT count(*) FROM products), (SELECT count(*) FROM variants)",
        )
        .fetch_one(&self.db.pool)
        .await?;
        Ok(StoreCounts { products, variants })
    }
}

#[cfg(all(test, feature = "pg-tests"))]
mod pg_tests {
    use super::*;
    use crate::catalog::{decode_catalog, ProductPayload, ProductStatus};
    use crate::config::DbConfig;
    use crate::database_ops::schema::ensure_schema;
    use crate::orchestrator::SyncOrchestrator;
    use crate::shopify::{CatalogSource, FetchError};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
    use testcontainers_modules::postgres::Postgres;

    const CATALOG: &str = r#"{"products":[
        {"id":1,"title":"Shirt","handle":"shirt","status":"active","variants":[{"id":10,"price":"19.99","inventory_quantity":5},{"id":11,"price":"24.50","inventory_quantity":0}]},
        {"id":2,"title":"Hat","handle":"hat","status":"draft","variants":[{"id":20,"price":"9.50","inventory_quantity":-1}]},
        {"id":3,"title":"Poster","handle":"poster","status":"archived","variants":[]}
    ]}"#;

    struct StaticCatalog(&'static str);

    #[async_trait]
    impl CatalogSource for StaticCatalog {
        async fn fetch_catalog(&self) -> Result<Vec<ProductPayload>, FetchError> {
            Ok(decode_catalog(self.0.as_bytes())?)
        }
    }

    async fn start_store() -> (ContainerAsync<Postgres>, PgCatalogWriter) {
        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .expect("start postgres container");
        let cfg = DbConfig {
            host: container.get_host().await.unwrap().to_string(),
            port: container.get_host_port_ipv4(5432).await.unwrap(),
            password: Some("postgres".into()),
            ..DbConfig::default()
        };
        let db = Db::connect(&cfg).await.unwrap();
        ensure_schema(&db).await.unwrap();
        (container, PgCatalogWriter::new(db))
    }

    fn product(remote_id: RemoteId, title: &str, handle: &str) -> Product {
        Product {
            remote_id,
            title: title.into(),
            body_html: None,
            vendor: None,
            product_type: None,
            handle: handle.into(),
            status: ProductStatus::Active,
            created_at: None,
            updated_at: None,
            variants: vec![],
        }
    }

    fn variant(remote_id: RemoteId, price: &str) -> Variant {
        Variant {
            remote_id,
            title: None,
            sku: None,
            position: None,
            price: BigDecimal::from_str(price).unwrap(),
            inventory_quantity: 1,
        }
    }

    #[tokio::test]
    async fn repeated_sync_leaves_row_counts_unchanged() {
        let (_pg, writer) = start_store().await;
        ensure_schema(&writer.db).await.unwrap();

        let mut sync = SyncOrchestrator::new(StaticCatalog(CATALOG), writer);
        let first = sync.run().await.unwrap();
        assert!(first.is_clean());
        assert_eq!(first.products_inserted, 3);
        assert_eq!(first.variants_inserted, 3);
        let before = sync.writer_mut().counts().await.unwrap();
        assert_eq!(before, StoreCounts { products: 3, variants: 3 });

        let second = sync.run().await.unwrap();
        assert!(second.is_clean());
        assert_eq!(second.products_skipped, 3);
        assert_eq!(second.variants_skipped, 3);
        assert_eq!(sync.writer_mut().counts().await.unwrap(), before);

        let writer = sync.into_writer();
        let (price, qty, status): (String, i32, String) = sqlx::query_as(
            "SELECT v.price::text, v.inventory_quantity, p.status \
             FROM variants v JOIN products p ON p.remote_id = v.product_remote_id \
             WHERE v.remote_id = 20",
        )
        .fetch_one(&writer.db.pool)
        .await
        .unwrap();
        assert_eq!(price, "9.50");
        assert_eq!(qty, -1);
        assert_eq!(status, "draft");
    }

    #[tokio::test]
    async fn pre_seeded_row_is_never_overwritten() {
        let (_pg, mut writer) = start_store().await;
        assert!(writer
            .insert_product(&product(1, "Original", "shirt"))
            .await
            .unwrap());

        let mut sync = SyncOrchestrator::new(StaticCatalog(CATALOG), writer);
        let report = sync.run().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.products_skipped, 1);
        assert_eq!(report.products_inserted, 2);

        let writer = sync.into_writer();
        let title: String =
            sqlx::query_scalar("SELECT title FROM products WHERE remote_id = 1")
                .fetch_one(&writer.db.pool)
                .await
                .unwrap();
        assert_eq!(title, "Original");
    }

    #[tokio::test]
    async fn existing_variant_reports_its_owner() {
        let (_pg, mut writer) = start_store().await;
        writer.insert_product(&product(1, "Shirt", "shirt")).await.unwrap();
        writer.insert_product(&product(5, "Clash", "clash")).await.unwrap();

        assert_eq!(
            writer.insert_variant(1, &variant(10, "19.99")).await.unwrap(),
            VariantInsert::Inserted
        );
        assert_eq!(
            writer.insert_variant(5, &variant(10, "1.00")).await.unwrap(),
            VariantInsert::Existing { owner: 1 }
        );

        let mut clash = product(5, "Clash", "clash");
        clash.variants.push(variant(10, "1.00"));
        match writer.write_product(&clash).await {
            Err(WriteError::VariantOwnedElsewhere {
                variant_id,
                owner_id,
            }) => {
                assert_eq!(variant_id, 10);
                assert_eq!(owner_id, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn handle_reuse_surfaces_as_constraint_error() {
        let (_pg, mut writer) = start_store().await;
        writer.insert_product(&product(1, "Shirt", "shirt")).await.unwrap();

        match writer.insert_product(&product(9, "Other", "shirt")).await {
            Err(WriteError::Constraint { constraint, .. }) => {
                assert_eq!(constraint, "products_handle_key")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(writer.counts().await.unwrap().products, 1);
    }

    #[tokio::test]
    async fn orphan_variant_hits_foreign_key() {
        let (_pg, mut writer) = start_store().await;

        match writer.insert_variant(404, &variant(40, "3.00")).await {
            Err(WriteError::Constraint { constraint, .. }) => {
                assert_eq!(constraint, "variants_product_remote_id_fkey")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
