use rust_decimal::Decimal;

use tradeflow_core::money::{MAX_MONEY_PRECISION, MONEY_PRECISION};
use tradeflow_core::{DomainError, DomainResult};

/// Business settings for the sales workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSettings {
    /// Applied to the subtotal (`8.25` means 8.25%).
    pub tax_rate_percent: Decimal,
    pub money_precision: u32,
    pub quote_validity_days: u32,
    pub invoice_due_days: u32,
    pub quote_prefix: String,
    pub invoice_prefix: String,
    /// Minimum digits in a document number.
    pub number_width: usize,
    /// Converting a quote to an order requires a reference number.
    pub require_reference_for_order: bool,
}

impl Default for SalesSettings {
    fn default() -> Self {
        Self {
            tax_rate_percent: Decimal::ZERO,
            money_precision: MONEY_PRECISION,
            quote_validity_days: 30,
            invoice_due_days: 30,
            quote_prefix: "Q".to_string(),
            invoice_prefix: "I".to_string(),
            number_width: 5,
            require_reference_for_order: false,
        }
    }
}

impl SalesSettings {
    pub fn validate(&self) -> DomainResult<()> {
        if self.tax_rate_percent < Decimal::ZERO {
            return Err(DomainError::validation("tax rate cannot be negative"));
        }
        if self.money_precision > MAX_MONEY_PRECISION {
            return Err(DomainError::validation(format!(
                "money precision cannot exceed {MAX_MONEY_PRECISION}"
            )));
        }
        for prefix in [&self.quote_prefix, &self.invoice_prefix] {
            if prefix.is_empty() || prefix.bytes().any(|b| b.is_ascii_digit()) {
                return Err(DomainError::validation(format!(
                    "document prefix '{prefix}' must be non-empty and contain no digits"
                )));
            }
        }
        if self.quote_prefix == self.invoice_prefix {
            return Err(DomainError::validation(
                "quote and invoice prefixes must differ",
            ));
        }
        if self.number_width == 0 {
            return Err(DomainError::validation("number width must be positive"));
        }
        Ok(())
    }
}
