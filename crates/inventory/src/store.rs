//! Inventory persistence contract.

use std::collections::HashMap;
use std::sync::RwLock;

use tradeflow_core::{InMemoryRecords, ProductId, ReplenishmentId, StoreError};

use crate::replenishment::ReplenishmentQueueItem;
use crate::transaction::InventoryTransaction;

/// Append-only transaction log plus the replenishment queue.
pub trait InventoryStore: Send + Sync {
    fn append_transaction(&self, transaction: InventoryTransaction) -> Result<(), StoreError>;

    /// Every entry for a product, in append order.
    fn transactions_for(&self, product_id: ProductId) -> Result<Vec<InventoryTransaction>, StoreError>;

    fn enqueue_replenishment(&self, item: ReplenishmentQueueItem) -> Result<(), StoreError>;

    /// Pending needs, oldest first.
    fn pending_replenishments(&self) -> Result<Vec<ReplenishmentQueueItem>, StoreError>;

    /// Remove the given needs; unknown ids are ignored. Returns how many went.
    fn remove_replenishments(&self, ids: &[ReplenishmentId]) -> Result<usize, StoreError>;
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    log: RwLock<HashMap<ProductId, Vec<InventoryTransaction>>>,
    queue: InMemoryRecords<ReplenishmentQueueItem>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn append_transaction(&self, transaction: InventoryTransaction) -> Result<(), StoreError> {
        let mut log = self
            .log
            .write()
            .map_err(|_| StoreError::Unavailable("inventory log lock poisoned".to_string()))?;
        log.entry(transaction.product_id).or_default().push(transaction);
        Ok(())
    }

    fn transactions_for(&self, product_id: ProductId) -> Result<Vec<InventoryTransaction>, StoreError> {
        let log = self
            .log
            .read()
            .map_err(|_| StoreError::Unavailable("inventory log lock poisoned".to_string()))?;
        Ok(log.get(&product_id).cloned().unwrap_or_default())
    }

    fn enqueue_replenishment(&self, item: ReplenishmentQueueItem) -> Result<(), StoreError> {
        self.queue.insert(item)
    }

    fn pending_replenishments(&self) -> Result<Vec<ReplenishmentQueueItem>, StoreError> {
        let mut items = self.queue.list()?;
        items.sort_by_key(|item| (item.queued_at, item.id));
        Ok(items)
    }

    fn remove_replenishments(&self, ids: &[ReplenishmentId]) -> Result<usize, StoreError> {
        self.queue.remove_where(|item| ids.contains(&item.id))
    }
}
