//! Purchasing: vendor purchase orders and automatic replenishment.
//!
//! Creating an order records the quantities as on order; receiving it moves
//! them into stock. The replenishment coordinator turns queued stock needs
//! into one order per default vendor.

pub mod events;
pub mod order;
pub mod replenishment;
pub mod store;
pub mod workflow;

pub use events::{
    PURCHASE_ORDER_AGGREGATE, PurchasingEvent, REPLENISHMENT_AGGREGATE, SkipReason,
};
pub use order::{NewPurchaseOrderLine, PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus};
pub use replenishment::ReplenishmentCoordinator;
pub use store::{InMemoryPurchaseOrderStore, PurchaseOrderStore};
pub use workflow::PurchaseOrderWorkflow;
