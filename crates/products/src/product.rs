use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{AccountId, DomainError, DomainResult, Entity, ProductId, RecordStatus};

/// Stock thresholds that drive automatic replenishment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderPolicy {
    /// Stock at or below this level triggers replenishment.
    pub reorder_point: Option<i64>,
    /// Fixed quantity to order; when unset the shortfall to the reorder point is used.
    pub reorder_quantity: Option<i64>,
    /// Minimum buffer, checked independently of the reorder point.
    pub safety_stock: Option<i64>,
}

impl ReorderPolicy {
    /// Whether `stock` has reached either threshold.
    pub fn is_triggered(&self, stock: i64) -> bool {
        let at_reorder_point = self.reorder_point.is_some_and(|point| stock <= point);
        let at_safety_stock = self.safety_stock.is_some_and(|floor| stock <= floor);
        at_reorder_point || at_safety_stock
    }

    /// Quantity to request when triggered at `stock`.
    ///
    /// The configured reorder quantity wins; otherwise the shortfall to the
    /// highest configured threshold (reorder point or safety stock), never
    /// negative.
    pub fn replenishment_quantity(&self, stock: i64) -> i64 {
        if let Some(quantity) = self.reorder_quantity {
            return quantity;
        }
        let threshold = match (self.reorder_point, self.safety_stock) {
            (Some(point), Some(floor)) => point.max(floor),
            (Some(level), None) | (None, Some(level)) => level,
            (None, None) => return 0,
        };
        threshold.saturating_sub(stock).max(0)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.reorder_quantity.is_some_and(|q| q <= 0) {
            return Err(DomainError::validation("reorder quantity must be positive"));
        }
        if self.safety_stock.is_some_and(|s| s < 0) {
            return Err(DomainError::validation("safety stock cannot be negative"));
        }
        Ok(())
    }
}

/// Product details consumed by pricing, sales and inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    /// Unit purchase cost, when known.
    pub cost: Option<Decimal>,
    /// Default unit sale price, when configured.
    pub sale_price: Option<Decimal>,
    pub reorder: ReorderPolicy,
    pub default_vendor_id: Option<AccountId>,
    pub status: RecordStatus,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(),
            sku: sku.into(),
            name: name.into(),
            description: None,
            cost: None,
            sale_price: None,
            reorder: ReorderPolicy::default(),
            default_vendor_id: None,
            status: RecordStatus::Active,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_sale_price(mut self, price: Decimal) -> Self {
        self.sale_price = Some(price);
        self
    }

    pub fn with_reorder_point(mut self, point: i64) -> Self {
        self.reorder.reorder_point = Some(point);
        self
    }

    pub fn with_reorder_quantity(mut self, quantity: i64) -> Self {
        self.reorder.reorder_quantity = Some(quantity);
        self
    }

    pub fn with_safety_stock(mut self, level: i64) -> Self {
        self.reorder.safety_stock = Some(level);
        self
    }

    pub fn with_default_vendor(mut self, vendor_id: AccountId) -> Self {
        self.default_vendor_id = Some(vendor_id);
        self
    }

    /// Text copied onto a sales line when no description override is given.
    pub fn line_description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Check if product can be sold (must be Active, not Retired).
    pub fn can_be_sold(&self) -> bool {
        self.status.is_active()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(DomainError::validation("cost cannot be negative"));
        }
        if self.sale_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(DomainError::validation("sale price cannot be negative"));
        }
        self.reorder.validate()
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reorder_point_and_safety_stock_trigger_independently() {
        let point_only = ReorderPolicy {
            reorder_point: Some(5),
            ..ReorderPolicy::default()
        };
        assert!(point_only.is_triggered(5));
        assert!(!point_only.is_triggered(6));

        let safety_only = ReorderPolicy {
            safety_stock: Some(2),
            ..ReorderPolicy::default()
        };
        assert!(safety_only.is_triggered(2));
        assert!(!safety_only.is_triggered(3));

        assert!(!ReorderPolicy::default().is_triggered(-100));
    }

    #[test]
    fn replenishment_quantity_prefers_configured_quantity() {
        let policy = ReorderPolicy {
            reorder_point: Some(5),
            reorder_quantity: Some(20),
            safety_stock: None,
        };
        assert_eq!(policy.replenishment_quantity(-2), 20);

        let shortfall = ReorderPolicy {
            reorder_quantity: None,
            ..policy.clone()
        };
        assert_eq!(shortfall.replenishment_quantity(-2), 7);
        assert_eq!(shortfall.replenishment_quantity(9), 0);
    }

    #[test]
    fn safety_stock_alone_orders_back_up_to_the_floor() {
        let safety_only = ReorderPolicy {
            safety_stock: Some(5),
            ..ReorderPolicy::default()
        };
        assert!(safety_only.is_triggered(-10));
        assert_eq!(safety_only.replenishment_quantity(-10), 15);

        let both = ReorderPolicy {
            reorder_point: Some(3),
            safety_stock: Some(5),
            reorder_quantity: None,
        };
        assert_eq!(both.replenishment_quantity(4), 1);
        assert_eq!(ReorderPolicy::default().replenishment_quantity(-10), 0);
    }

    #[test]
    fn validate_rejects_negative_money_and_bad_policy() {
        let product = Product::new("SKU-1", "Widget").with_cost(dec!(-1));
        assert!(product.validate().is_err());

        let product = Product::new("SKU-1", "Widget").with_reorder_quantity(0);
        assert!(product.validate().is_err());

        let product = Product::new(" ", "Widget");
        assert!(product.validate().is_err());

        let product = Product::new("SKU-1", "Widget")
            .with_cost(dec!(4))
            .with_sale_price(dec!(10));
        assert!(product.validate().is_ok());
    }

    #[test]
    fn line_description_falls_back_to_name() {
        let plain = Product::new("SKU-1", "Widget");
        assert_eq!(plain.line_description(), "Widget");
        let described = plain.with_description("Blue widget, 3mm");
        assert_eq!(described.line_description(), "Blue widget, 3mm");
    }
}
