pub mod model;
pub mod wire;

pub use model::{Product, ProductStatus, RemoteId, Variant};
pub use wire::{decode_catalog, ProductPayload, RecordError, VariantPayload};
