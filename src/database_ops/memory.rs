use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use super::{CatalogWriter, StoreCounts, VariantInsert, WriteError};
use crate::catalog::{Product, RemoteId, Variant};

/// In-process store with the same keys and constraints as the Postgres schema:
/// remote-id primary keys, unique product handles and the variant → product
/// foreign key. Backs `--dry-run` and the pipeline tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: BTreeMap<RemoteId, Product>,
    handles: HashMap<String, RemoteId>,
    variants: BTreeMap<RemoteId, (RemoteId, Variant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored product row; `variants` is always empty, see [`MemoryStore::variants_of`].
    pub fn product(&self, id: RemoteId) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn variant(&self, id: RemoteId) -> Option<&Variant> {
        self.variants.get(&id).map(|(_, v)| v)
    }

    pub fn variant_owner(&self, id: RemoteId) -> Option<RemoteId> {
        self.variants.get(&id).map(|(owner, _)| *owner)
    }

    pub fn variants_of(&self, product_id: RemoteId) -> Vec<&Variant> {
        self.variants
            .values()
            .filter(|(owner, _)| *owner == product_id)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn product_ids(&self) -> Vec<RemoteId> {
        self.products.keys().copied().collect()
    }

    pub fn variant_ids(&self) -> Vec<RemoteId> {
        self.variants.keys().copied().collect()
    }
}

#[async_trait]
impl CatalogWriter for MemoryStore {
    async fn insert_product(&mut self, product: &Product) -> Result<bool, WriteError> {
        if self.products.contains_key(&product.remote_id) {
            return Ok(false);
        }
        if let Some(owner) = self.handles.get(&product.handle) {
            return Err(WriteError::Constraint {
                constraint: "products_handle_key".into(),
                detail: format!(
                    "handle {:?} already used by product {owner}",
                    product.handle
                ),
            });
        }

        let row = Product {
            variants: Vec::new(),
            ..product.clone()
        };
        self.handles.insert(row.handle.clone(), row.remote_id);
        self.products.insert(row.remote_id, row);
        Ok(true)
    }

    async fn insert_variant(
        &mut self,
        product_id: RemoteId,
        variant: &Variant,
    ) -> Result<VariantInsert, WriteError> {
        if let Some((owner, _)) = self.variants.get(&variant.remote_id) {
            return Ok(VariantInsert::Existing { owner: *owner });
        }
        if !self.products.contains_key(&product_id) {
            return Err(WriteError::Constraint {
                constraint: "variants_product_remote_id_fkey".into(),
                detail: format!("product {product_id} does not exist"),
            });
        }
        self.variants
            .insert(variant.remote_id, (product_id, variant.clone()));
        Ok(VariantInsert::Inserted)
    }

    async fn counts(&mut self) -> Result<StoreCounts, WriteError> {
        Ok(StoreCounts {
            products: self.products.len() as i64,
            variants: self.variants.len() as i64,
        })
    }
}
