pub mod memory;
pub mod schema;
pub mod upsert;

pub use memory::MemoryStore;
pub use upsert::PgCatalogWriter;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::{Product, RemoteId, Variant};

/// A failure persisting one product or one of its variants. Recoverable: the run
/// records it and moves on to the next product.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("constraint {constraint} violated: {detail}")]
    Constraint { constraint: String, detail: String },
    #[error("variant {variant_id} already belongs to product {owner_id}")]
    VariantOwnedElsewhere {
        variant_id: RemoteId,
        owner_id: RemoteId,
    },
    #[error("database: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for WriteError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = err
            .as_database_error()
            .and_then(|db| db.constraint().map(|c| (c.to_string(), db.message().to_string())));
        match constraint {
            Some((constraint, detail)) => WriteError::Constraint { constraint, detail },
            None => WriteError::Database(err),
        }
    }
}

/// Result of attempting a variant insert under insert-or-skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantInsert {
    Inserted,
    /// A row with this remote id exists; `owner` is the product it belongs to.
    Existing { owner: RemoteId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub product_inserted: bool,
    pub variants_inserted: usize,
    pub variants_skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub products: i64,
    pub variants: i64,
}

/// Persistence seam for the sync loop.
///
/// Implementors provide the two insert-if-absent primitives; [`CatalogWriter::write_product`]
/// composes them with the ordering and ownership rules shared by every store.
#[async_trait]
pub trait CatalogWriter: Send {
    /// Insert the product row unless its remote id exists. Returns true when a row was inserted.
    async fn insert_product(&mut self, product: &Product) -> Result<bool, WriteError>;

    async fn insert_variant(
        &mut self,
        product_id: RemoteId,
        variant: &Variant,
    ) -> Result<VariantInsert, WriteError>;

    async fn counts(&mut self) -> Result<StoreCounts, WriteError>;

    /// Write a product then its variants, first write wins.
    ///
    /// Stops at the first failing row. Rows written before it stay; the next full
    /// run picks up the rest.
    async fn write_product(&mut self, product: &Product) -> Result<WriteOutcome, WriteError> {
        let mut outcome = WriteOutcome {
            product_inserted: self.insert_product(product).await?,
            ..WriteOutcome::default()
        };

        for variant in &product.variants {
            match self.insert_variant(product.remote_id, variant).await? {
                VariantInsert::Inserted => outcome.variants_inserted += 1,
                VariantInsert::Existing { owner } if owner == product.remote_id => {
                    outcome.variants_skipped += 1
                }
                VariantInsert::Existing { owner } => {
                    return Err(WriteError::VariantOwnedElsewhere {
                        variant_id: variant.remote_id,
                        owner_id: owner,
                    })
                }
            }
        }
        Ok(outcome)
    }
}
