//! Products: cost, sale price, reorder thresholds and default vendor.

pub mod catalog;
pub mod product;

pub use catalog::{InMemoryProductCatalog, ProductCatalog};
pub use product::{Product, ReorderPolicy};
