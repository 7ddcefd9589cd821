use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use tradeflow_core::{AccountId, DomainError, DomainResult, Entity, PricingRuleId, RecordStatus};

/// Account type: who we sell to, or who we buy from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum AccountType {
    Customer,
    Vendor,
}

/// Payment term attached to an account (display only; never enforced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerm {
    pub name: String,
    pub net_days: u32,
}

impl PaymentTerm {
    pub fn net(days: u32) -> Self {
        Self {
            name: format!("Net {days}"),
            net_days: days,
        }
    }
}

/// Customer-specific markup rule applied to product cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: PricingRuleId,
    pub name: String,
    /// Amount added to cost before any percentage markup.
    pub fixed_markup: Option<Decimal>,
    /// Percentage applied after the fixed markup (`25` means +25%).
    pub markup_percentage: Option<Decimal>,
}

impl PricingRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PricingRuleId::new(),
            name: name.into(),
            fixed_markup: None,
            markup_percentage: None,
        }
    }

    pub fn with_fixed_markup(mut self, amount: Decimal) -> Self {
        self.fixed_markup = Some(amount);
        self
    }

    pub fn with_markup_percentage(mut self, percentage: Decimal) -> Self {
        self.markup_percentage = Some(percentage);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("pricing rule name cannot be empty"));
        }
        if self.fixed_markup.is_none() && self.markup_percentage.is_none() {
            return Err(DomainError::validation(
                "pricing rule needs a fixed markup or a markup percentage",
            ));
        }
        if let Some(pct) = self.markup_percentage {
            if pct <= -Decimal::ONE_HUNDRED {
                return Err(DomainError::validation(
                    "markup percentage must be greater than -100",
                ));
            }
        }
        Ok(())
    }
}

impl Entity for PricingRule {
    type Id = PricingRuleId;
    const KIND: &'static str = "pricing rule";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Account details consumed by the workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub account_type: AccountType,
    pub pricing_rule_id: Option<PricingRuleId>,
    pub payment_term: Option<PaymentTerm>,
    pub status: RecordStatus,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type,
            pricing_rule_id: None,
            payment_term: None,
            status: RecordStatus::Active,
        }
    }

    pub fn customer(name: impl Into<String>) -> Self {
        Self::new(name, AccountType::Customer)
    }

    pub fn vendor(name: impl Into<String>) -> Self {
        Self::new(name, AccountType::Vendor)
    }

    pub fn with_pricing_rule(mut self, rule_id: PricingRuleId) -> Self {
        self.pricing_rule_id = Some(rule_id);
        self
    }

    pub fn with_payment_term(mut self, term: PaymentTerm) -> Self {
        self.payment_term = Some(term);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Ensure this account is an active account of the given type.
    pub fn ensure_active(&self, expected: AccountType) -> DomainResult<()> {
        if self.account_type != expected {
            return Err(DomainError::validation(format!(
                "account {} is a {}, expected a {}",
                self.id, self.account_type, expected
            )));
        }
        if !self.is_active() {
            return Err(DomainError::validation(format!(
                "account {} is retired",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for Account {
    type Id = AccountId;
    const KIND: &'static str = "account";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
