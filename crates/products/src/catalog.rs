//! Product lookup contract consumed by the workflows.

use tradeflow_core::{DomainResult, InMemoryRecords, ProductId, StoreError};

use crate::product::Product;

/// Read side of the product repository.
pub trait ProductCatalog: Send + Sync {
    fn get_product_details(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

/// In-memory product catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    products: InMemoryRecords<Product>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates before storing; an invalid product leaves the catalog untouched.
    pub fn upsert_product(&self, product: Product) -> DomainResult<()> {
        product.validate()?;
        self.products.upsert(product)?;
        Ok(())
    }

    pub fn products(&self) -> Result<Vec<Product>, StoreError> {
        self.products.list()
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn get_product_details(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.products.get(&id)
    }
}
