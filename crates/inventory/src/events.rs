use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeflow_core::{ProductId, ReplenishmentId};
use tradeflow_events::Event;

use crate::transaction::TransactionType;

/// Aggregate type used on inventory envelopes (aggregate id = product id).
pub const INVENTORY_AGGREGATE: &str = "inventory.product";

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub quantity: i64,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
    pub new_level: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OnOrderChanged (purchase order placed or released on receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnOrderChanged {
    pub product_id: ProductId,
    pub quantity: i64,
    pub reference: Option<String>,
    pub new_on_order: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReplenishmentQueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentQueued {
    pub replenishment_id: ReplenishmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub stock_level: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReplenishmentRemoved (consumed by a purchase order or withdrawn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentRemoved {
    pub replenishment_id: ReplenishmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    StockAdjusted(StockAdjusted),
    OnOrderChanged(OnOrderChanged),
    ReplenishmentQueued(ReplenishmentQueued),
    ReplenishmentRemoved(ReplenishmentRemoved),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockAdjusted(_) => "inventory.stock.adjusted",
            InventoryEvent::OnOrderChanged(_) => "inventory.on_order.changed",
            InventoryEvent::ReplenishmentQueued(_) => "inventory.replenishment.queued",
            InventoryEvent::ReplenishmentRemoved(_) => "inventory.replenishment.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::OnOrderChanged(e) => e.occurred_at,
            InventoryEvent::ReplenishmentQueued(e) => e.occurred_at,
            InventoryEvent::ReplenishmentRemoved(e) => e.occurred_at,
        }
    }
}
