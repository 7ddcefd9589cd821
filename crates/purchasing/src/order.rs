use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use tradeflow_core::{
    AccountId, DomainError, DomainResult, Entity, ProductId, PurchaseOrderId, UserId,
};

/// Purchase order status lifecycle. Receiving is one-way.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum PurchaseOrderStatus {
    Open,
    Received,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

impl PurchaseOrderLine {
    pub fn line_cost(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_cost
    }
}

/// Requested line for a new purchase order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseOrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

impl NewPurchaseOrderLine {
    pub fn new(product_id: ProductId, quantity: i64, unit_cost: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_cost,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "purchase quantity for product {} must be positive",
                self.product_id
            )));
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "unit cost for product {} cannot be negative",
                self.product_id
            )));
        }
        Ok(())
    }
}

/// Vendor purchase order with its lines.
///
/// Lines live inside the order so the order and its lines are stored in one
/// write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub vendor_id: AccountId,
    pub status: PurchaseOrderStatus,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub lines: Vec<PurchaseOrderLine>,
    pub created_by: UserId,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<UserId>,
}

impl PurchaseOrder {
    /// Reference written on inventory transactions for this order.
    pub fn reference(&self) -> String {
        format!("PO#{}", self.id)
    }

    pub fn total_cost(&self) -> Decimal {
        self.lines.iter().map(PurchaseOrderLine::line_cost).sum()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_received(&self) -> bool {
        self.status == PurchaseOrderStatus::Received
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;
    const KIND: &'static str = "purchase order";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(lines: Vec<PurchaseOrderLine>) -> PurchaseOrder {
        PurchaseOrder {
            id: PurchaseOrderId::new(),
            vendor_id: AccountId::new(),
            status: PurchaseOrderStatus::Open,
            order_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            expected_date: None,
            lines,
            created_by: UserId::new(),
            received_at: None,
            received_by: None,
        }
    }

    #[test]
    fn reference_uses_po_hash_and_id() {
        let po = order(vec![]);
        assert_eq!(po.reference(), format!("PO#{}", po.id));
    }

    #[test]
    fn totals_sum_over_lines() {
        let po = order(vec![
            PurchaseOrderLine {
                line_no: 1,
                product_id: ProductId::new(),
                quantity: 5,
                unit_cost: dec!(2.50),
            },
            PurchaseOrderLine {
                line_no: 2,
                product_id: ProductId::new(),
                quantity: 3,
                unit_cost: dec!(10),
            },
        ]);
        assert_eq!(po.total_cost(), dec!(42.50));
        assert_eq!(po.total_quantity(), 8);
    }

    #[test]
    fn new_line_validation() {
        let product = ProductId::new();
        assert!(NewPurchaseOrderLine::new(product, 0, dec!(1)).validate().is_err());
        assert!(NewPurchaseOrderLine::new(product, 1, dec!(-1)).validate().is_err());
        assert!(NewPurchaseOrderLine::new(product, 1, dec!(0)).validate().is_ok());
    }

    #[test]
    fn status_labels() {
        assert_eq!(PurchaseOrderStatus::Received.to_string(), "Received");
        assert_eq!(
            serde_json::to_string(&PurchaseOrderStatus::Open).unwrap(),
            "\"Open\""
        );
    }
}
