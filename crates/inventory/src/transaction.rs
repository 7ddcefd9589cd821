use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use tradeflow_core::{DomainError, DomainResult, ProductId, UserId};

/// Kind of ledger entry. Serialises to the persisted literals
/// `"Sale" | "Purchase" | "Adjustment" | "PurchaseOrder"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum TransactionType {
    Sale,
    Purchase,
    Adjustment,
    /// Quantity committed on a purchase order; counts toward on-order only.
    #[serde(rename = "PurchaseOrder")]
    #[strum(serialize = "PurchaseOrder")]
    PurchaseOrderPlaced,
}

impl TransactionType {
    /// Whether entries of this type move on-hand stock.
    pub fn affects_stock(self) -> bool {
        !matches!(self, TransactionType::PurchaseOrderPlaced)
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub product_id: ProductId,
    /// Signed quantity delta.
    pub quantity: i64,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
    pub recorded_by: UserId,
    pub recorded_at: DateTime<Utc>,
}

/// On-hand stock: sum of every stock-moving delta.
pub fn stock_level(transactions: &[InventoryTransaction]) -> DomainResult<i64> {
    checked_total(transactions.iter().filter(|tx| tx.transaction_type.affects_stock()))
}

/// On-order quantity: sum of the purchase-order entries.
pub fn on_order_level(transactions: &[InventoryTransaction]) -> DomainResult<i64> {
    checked_total(transactions.iter().filter(|tx| !tx.transaction_type.affects_stock()))
}

fn checked_total<'a>(mut entries: impl Iterator<Item = &'a InventoryTransaction>) -> DomainResult<i64> {
    entries.try_fold(0i64, |total, tx| {
        total
            .checked_add(tx.quantity)
            .ok_or_else(|| DomainError::validation("inventory quantity out of range"))
    })
}
