use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradeflow_core::{Entity, ProductId, ReplenishmentId};

/// A pending purchasing need awaiting conversion into a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentQueueItem {
    pub id: ReplenishmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Stock level that triggered the need.
    pub triggered_at_level: i64,
    pub queued_at: DateTime<Utc>,
}

impl Entity for ReplenishmentQueueItem {
    type Id = ReplenishmentId;
    const KIND: &'static str = "replenishment item";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
