use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Identifier assigned by the remote catalog. Used as the local primary key.
pub type RemoteId = i64;

/// Publication status of a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
    /// Any status string the remote introduces that we do not model yet.
    Other(String),
}

impl ProductStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Draft => "draft",
            ProductStatus::Archived => "archived",
            ProductStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl Default for ProductStatus {
    fn default() -> Self {
        ProductStatus::Active
    }
}

impl FromStr for ProductStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "active" => ProductStatus::Active,
            "draft" => ProductStatus::Draft,
            "archived" => ProductStatus::Archived,
            _ => ProductStatus::Other(trimmed.to_string()),
        })
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProductStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A catalog item together with every variant it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub remote_id: RemoteId,
    pub title: String,
    /// HTML description as delivered by the remote.
    pub body_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub handle: String,
    pub status: ProductStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub variants: Vec<Variant>,
}

/// A purchasable configuration of a [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub remote_id: RemoteId,
    pub title: Option<String>,
    pub sku: Option<String>,
    pub position: Option<i32>,
    /// Exact decimal; the remote sends prices as strings and they never pass through f64.
    pub price: BigDecimal,
    /// Can be negative when the remote tracks oversold stock.
    pub inventory_quantity: i32,
}

impl Product {
    /// Short label for logs and failure reports.
    pub fn label(&self) -> String {
        if self.title.trim().is_empty() {
            self.handle.clone()
        } else {
            self.title.clone()
        }
    }
}
