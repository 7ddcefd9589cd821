use std::sync::Arc;

use rust_decimal::Decimal;

use tradeflow_core::money::{MONEY_PRECISION, apply_markup, round_money};
use tradeflow_core::{AccountId, DomainError, DomainResult, ProductId};
use tradeflow_parties::{Account, AccountDirectory, PricingRule};
use tradeflow_products::{Product, ProductCatalog};

/// Where a resolved unit price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Cost plus the customer's markup rule.
    MarkupRule,
    /// The product's configured sale price.
    SalePrice,
}

/// A unit price together with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub unit_price: Decimal,
    pub source: PriceSource,
}

/// Derive the unit price for a product under an optional markup rule.
///
/// Pure: no lookups, no side effects. The result is rounded to `precision`.
pub fn resolve_price(
    rule: Option<&PricingRule>,
    product: &Product,
    precision: u32,
) -> DomainResult<ResolvedPrice> {
    if let Some(rule) = rule {
        let cost = product.cost.ok_or_else(|| {
            DomainError::price_resolution(format!(
                "product {} has no cost but pricing rule '{}' is assigned",
                product.id, rule.name
            ))
        })?;

        let mut price = cost.checked_add(rule.fixed_markup.unwrap_or(Decimal::ZERO));
        if let Some(percentage) = rule.markup_percentage {
            price = price.and_then(|price| apply_markup(price, percentage));
        }
        let unit_price = price.map(|price| round_money(price, precision)).ok_or_else(|| {
            DomainError::price_resolution(format!(
                "pricing rule '{}' takes product {} out of the representable range",
                rule.name, product.id
            ))
        })?;
        if unit_price < Decimal::ZERO {
            return Err(DomainError::price_resolution(format!(
                "pricing rule '{}' prices product {} at {unit_price}, below zero",
                rule.name, product.id
            )));
        }

        return Ok(ResolvedPrice {
            unit_price,
            source: PriceSource::MarkupRule,
        });
    }

    match product.sale_price {
        Some(price) => Ok(ResolvedPrice {
            unit_price: round_money(price, precision),
            source: PriceSource::SalePrice,
        }),
        None => Err(DomainError::price_resolution(format!(
            "product {} has no sale price and no pricing rule applies; supply an explicit price",
            product.id
        ))),
    }
}

/// Computes customer-specific unit prices.
#[derive(Clone)]
pub struct PricingEngine {
    accounts: Arc<dyn AccountDirectory>,
    products: Arc<dyn ProductCatalog>,
    precision: u32,
}

impl core::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("precision", &self.precision)
            .finish_non_exhaustive()
    }
}

impl PricingEngine {
    pub fn new(accounts: Arc<dyn AccountDirectory>, products: Arc<dyn ProductCatalog>) -> Self {
        Self {
            accounts,
            products,
            precision: MONEY_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Unit price for `product_id` when sold to `customer_id`.
    pub fn price_for(&self, customer_id: AccountId, product_id: ProductId) -> DomainResult<Decimal> {
        let customer = self
            .accounts
            .get_account_details(customer_id)?
            .ok_or_else(|| DomainError::not_found("account", customer_id))?;
        let product = self
            .products
            .get_product_details(product_id)?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;

        Ok(self.price_for_details(&customer, &product)?.unit_price)
    }

    /// Same as [`price_for`](Self::price_for) for callers that already hold
    /// the account and product.
    pub fn price_for_details(&self, customer: &Account, product: &Product) -> DomainResult<ResolvedPrice> {
        let rule = match customer.pricing_rule_id {
            Some(rule_id) => Some(
                self.accounts
                    .get_pricing_rule(rule_id)?
                    .ok_or_else(|| DomainError::not_found("pricing rule", rule_id))?,
            ),
            None => None,
        };

        let resolved = resolve_price(rule.as_ref(), product, self.precision)?;
        tracing::debug!(
            customer_id = %customer.id,
            product_id = %product.id,
            unit_price = %resolved.unit_price,
            source = ?resolved.source,
            "resolved unit price"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use tradeflow_parties::InMemoryAccountDirectory;
    use tradeflow_products::InMemoryProductCatalog;

    struct Fixture {
        accounts: Arc<InMemoryAccountDirectory>,
        products: Arc<InMemoryProductCatalog>,
        engine: PricingEngine,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let products = Arc::new(InMemoryProductCatalog::new());
        let engine = PricingEngine::new(accounts.clone(), products.clone());
        Fixture {
            accounts,
            products,
            engine,
        }
    }

    #[test]
    fn falls_back_to_sale_price_without_rule() {
        let f = fixture();
        let customer = Account::customer("Walk-in");
        let product = Product::new("SKU-1", "Widget").with_sale_price(dec!(10));
        f.accounts.upsert_account(customer.clone()).unwrap();
        f.products.upsert_product(product.clone()).unwrap();

        assert_eq!(f.engine.price_for(customer.id, product.id).unwrap(), dec!(10));
    }

    #[test]
    fn applies_fixed_then_percentage_markup_to_cost() {
        let f = fixture();
        let rule = PricingRule::new("wholesale")
            .with_fixed_markup(dec!(2))
            .with_markup_percentage(dec!(10));
        let customer = Account::customer("Reseller").with_pricing_rule(rule.id);
        let product = Product::new("SKU-1", "Widget")
            .with_cost(dec!(8))
            .with_sale_price(dec!(99));
        f.accounts.upsert_pricing_rule(rule).unwrap();
        f.accounts.upsert_account(customer.clone()).unwrap();
        f.products.upsert_product(product.clone()).unwrap();

        // (8 + 2) * 1.10
        assert_eq!(f.engine.price_for(customer.id, product.id).unwrap(), dec!(11.00));
    }

    #[test]
    fn rule_without_cost_is_a_price_resolution_error() {
        let rule = PricingRule::new("cost-plus").with_markup_percentage(dec!(20));
        let product = Product::new("SKU-1", "Widget").with_sale_price(dec!(10));

        let err = resolve_price(Some(&rule), &product, 2).unwrap_err();
        assert!(matches!(err, DomainError::PriceResolution(_)));
    }

    #[test]
    fn no_rule_and_no_sale_price_is_a_price_resolution_error() {
        let product = Product::new("SKU-1", "Widget").with_cost(dec!(3));
        let err = resolve_price(None, &product, 2).unwrap_err();
        assert!(matches!(err, DomainError::PriceResolution(msg) if msg.contains("explicit price")));
    }

    #[test]
    fn dangling_rule_reference_is_not_found() {
        let f = fixture();
        let customer = Account::customer("Ghost rule").with_pricing_rule(tradeflow_core::PricingRuleId::new());
        let product = Product::new("SKU-1", "Widget").with_cost(dec!(1));
        f.accounts.upsert_account(customer.clone()).unwrap();
        f.products.upsert_product(product.clone()).unwrap();

        let err = f.engine.price_for(customer.id, product.id).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "pricing rule", .. }));
    }

    #[test]
    fn unknown_customer_or_product_is_not_found() {
        let f = fixture();
        let err = f.engine.price_for(AccountId::new(), ProductId::new()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "account", .. }));
    }

    #[test]
    fn discounting_rule_below_zero_is_a_price_resolution_error() {
        let rule = PricingRule::new("clearance").with_fixed_markup(dec!(-20));
        let product = Product::new("SKU-1", "Widget").with_cost(dec!(5));

        let err = resolve_price(Some(&rule), &product, 2).unwrap_err();
        assert!(matches!(err, DomainError::PriceResolution(msg) if msg.contains("below zero")));

        let to_zero = PricingRule::new("giveaway").with_fixed_markup(dec!(-5));
        assert_eq!(resolve_price(Some(&to_zero), &product, 2).unwrap().unit_price, dec!(0));
    }

    #[test]
    fn markup_past_decimal_range_is_a_price_resolution_error() {
        let rule = PricingRule::new("moonshot").with_markup_percentage(dec!(500));
        let product = Product::new("SKU-1", "Widget").with_cost(Decimal::MAX);

        let err = resolve_price(Some(&rule), &product, 2).unwrap_err();
        assert!(matches!(err, DomainError::PriceResolution(_)));
    }

    #[test]
    fn price_is_rounded_to_engine_precision() {
        let rule = PricingRule::new("thirds").with_markup_percentage(dec!(33.3333));
        let product = Product::new("SKU-1", "Widget").with_cost(dec!(1));
        let resolved = resolve_price(Some(&rule), &product, 2).unwrap();
        assert_eq!(resolved.unit_price, dec!(1.33));
        assert_eq!(resolved.source, PriceSource::MarkupRule);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a non-negative markup never prices below cost.
        #[test]
        fn non_negative_markup_never_undercuts_cost(
            cost_cents in 0i64..10_000_000,
            fixed_cents in 0i64..100_000,
            pct in 0u32..500,
        ) {
            let cost = Decimal::new(cost_cents, 2);
            let rule = PricingRule::new("p")
                .with_fixed_markup(Decimal::new(fixed_cents, 2))
                .with_markup_percentage(Decimal::from(pct));
            let product = Product::new("SKU", "P").with_cost(cost);

            let resolved = resolve_price(Some(&rule), &product, 2).unwrap();
            prop_assert!(resolved.unit_price >= cost);
        }
    }
}
