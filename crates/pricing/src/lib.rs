//! Customer-specific unit pricing.
//!
//! A customer with a pricing rule pays `(cost + fixed_markup) * (1 + pct/100)`;
//! everyone else pays the product's sale price. Anything else must be an
//! explicit override supplied by the caller.

pub mod engine;

pub use engine::{PriceSource, PricingEngine, ResolvedPrice, resolve_price};
