//! Purchase order persistence contract.

use tradeflow_core::{InMemoryRecords, PurchaseOrderId, StoreError};

use crate::order::{PurchaseOrder, PurchaseOrderStatus};

pub trait PurchaseOrderStore: Send + Sync {
    /// Stores the order together with its lines.
    fn insert_order(&self, order: PurchaseOrder) -> Result<(), StoreError>;
    fn update_order(&self, order: PurchaseOrder) -> Result<(), StoreError>;
    fn get_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError>;
    /// Orders, optionally restricted to one status, oldest first.
    fn list_orders(&self, status: Option<PurchaseOrderStatus>) -> Result<Vec<PurchaseOrder>, StoreError>;
}

/// In-memory purchase order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseOrderStore {
    orders: InMemoryRecords<PurchaseOrder>,
}

impl InMemoryPurchaseOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PurchaseOrderStore for InMemoryPurchaseOrderStore {
    fn insert_order(&self, order: PurchaseOrder) -> Result<(), StoreError> {
        self.orders.insert(order)
    }

    fn update_order(&self, order: PurchaseOrder) -> Result<(), StoreError> {
        self.orders.update(order)
    }

    fn get_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, StoreError> {
        self.orders.get(&id)
    }

    fn list_orders(&self, status: Option<PurchaseOrderStatus>) -> Result<Vec<PurchaseOrder>, StoreError> {
        let mut orders = self
            .orders
            .filter(|order| status.is_none_or(|s| order.status == s))?;
        // Ids are UUIDv7, so id order is creation order.
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }
}
