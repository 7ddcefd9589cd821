use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

use tradeflow_core::{AccountId, ProductId, PurchaseOrderId, ReplenishmentId};
use tradeflow_events::Event;

use crate::order::PurchaseOrderLine;

/// Aggregate type for purchase order envelopes (aggregate id = order id).
pub const PURCHASE_ORDER_AGGREGATE: &str = "purchasing.purchase_order";

/// Aggregate type for replenishment decisions (aggregate id = replenishment id).
pub const REPLENISHMENT_AGGREGATE: &str = "purchasing.replenishment";

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub vendor_id: AccountId,
    pub expected_date: Option<NaiveDate>,
    pub lines: Vec<PurchaseOrderLine>,
    pub total_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderReceived {
    pub order_id: PurchaseOrderId,
    pub vendor_id: AccountId,
    pub lines: Vec<PurchaseOrderLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Why a queued need was left in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SkipReason {
    ProductMissing,
    NoDefaultVendor,
    /// The vendor's purchase order could not be created (unknown, retired or not a vendor).
    VendorUnavailable,
}

/// Event: ReplenishmentSkipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentSkipped {
    pub replenishment_id: ReplenishmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub reason: SkipReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchasingEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderReceived(PurchaseOrderReceived),
    ReplenishmentSkipped(ReplenishmentSkipped),
}

impl Event for PurchasingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchasingEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchasingEvent::PurchaseOrderReceived(_) => "purchasing.order.received",
            PurchasingEvent::ReplenishmentSkipped(_) => "purchasing.replenishment.skipped",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchasingEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchasingEvent::PurchaseOrderReceived(e) => e.occurred_at,
            PurchasingEvent::ReplenishmentSkipped(e) => e.occurred_at,
        }
    }
}
