//! Inventory ledger.
//!
//! Stock is never stored as a number: it is derived from an append-only log
//! of signed transactions. Purchase-order entries form a separate on-order
//! aggregate. Crossing a reorder threshold queues a replenishment need.

pub mod events;
pub mod ledger;
pub mod replenishment;
pub mod store;
pub mod transaction;

pub use events::{
    INVENTORY_AGGREGATE, InventoryEvent, OnOrderChanged, ReplenishmentQueued, ReplenishmentRemoved,
    StockAdjusted,
};
pub use ledger::InventoryLedger;
pub use replenishment::ReplenishmentQueueItem;
pub use store::{InMemoryInventoryStore, InventoryStore};
pub use transaction::{InventoryTransaction, TransactionType, on_order_level, stock_level};
