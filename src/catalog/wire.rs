//! JSON payloads returned by `GET /admin/api/<version>/products.json` and their
//! mapping into the record model.
//!
//! Decoding happens in two steps. [`decode_catalog`] checks the JSON shape: the
//! envelope must be an object holding exactly the `products` array, and every
//! field it keeps must have the right JSON type. Product and variant objects carry
//! many more fields (tags, images, options, ...) which are ignored. Turning a
//! [`ProductPayload`] into a [`Product`] is a separate, per-product step, so one
//! bad record does not poison the rest of the catalog.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::model::{Product, ProductStatus, RemoteId, Variant};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductsEnvelope {
    pub products: Vec<ProductPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
    pub id: RemoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    pub handle: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub variants: Vec<VariantPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantPayload {
    pub id: RemoteId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    pub price: String,
    #[serde(default)]
    pub inventory_quantity: i32,
}

/// A payload that is valid JSON but cannot become a record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("product {product_id}: handle is empty")]
    EmptyHandle { product_id: RemoteId },
    #[error("variant {variant_id} of product {product_id}: price {price:?} is not a decimal")]
    InvalidPrice {
        product_id: RemoteId,
        variant_id: RemoteId,
        price: String,
    },
}

impl RecordError {
    pub fn product_id(&self) -> RemoteId {
        match self {
            RecordError::EmptyHandle { product_id } => *product_id,
            RecordError::InvalidPrice { product_id, .. } => *product_id,
        }
    }
}

impl ProductPayload {
    /// Short label for logs, usable before the payload is validated.
    pub fn label(&self) -> String {
        if self.title.trim().is_empty() {
            self.handle.trim().to_string()
        } else {
            self.title.clone()
        }
    }
}

/// Empty strings from the remote mean "not set".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TryFrom<ProductPayload> for Product {
    type Error = RecordError;

    fn try_from(payload: ProductPayload) -> Result<Self, Self::Error> {
        let handle = payload.handle.trim().to_string();
        if handle.is_empty() {
            return Err(RecordError::EmptyHandle {
                product_id: payload.id,
            });
        }

        let product_id = payload.id;
        let variants = payload
            .variants
            .into_iter()
            .map(|v| variant_from_payload(product_id, v))
            .collect::<Result<Vec<_>, _>>()?;

        let status = match payload.status.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<ProductStatus>().unwrap_or_default(),
            _ => ProductStatus::default(),
        };

        Ok(Product {
            remote_id: product_id,
            title: payload.title,
            body_html: non_empty(payload.body_html),
            vendor: non_empty(payload.vendor),
            product_type: non_empty(payload.product_type),
            handle,
            status,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            variants,
        })
    }
}

fn variant_from_payload(product_id: RemoteId, v: VariantPayload) -> Result<Variant, RecordError> {
    let price = BigDecimal::from_str(v.price.trim()).map_err(|_| RecordError::InvalidPrice {
        product_id,
        variant_id: v.id,
        price: v.price.clone(),
    })?;
    Ok(Variant {
        remote_id: v.id,
        title: non_empty(v.title),
        sku: non_empty(v.sku),
        position: v.position,
        price,
        inventory_quantity: v.inventory_quantity,
    })
}

/// Decode a full response body into unvalidated payloads, preserving remote order.
pub fn decode_catalog(body: &[u8]) -> Result<Vec<ProductPayload>, serde_json::Error> {
    let envelope: ProductsEnvelope = serde_json::from_slice(body)?;
    Ok(envelope.products)
}
