//! Account lookup contract consumed by the workflows.

use tradeflow_core::{AccountId, DomainResult, InMemoryRecords, PricingRuleId, StoreError};

use crate::account::{Account, PricingRule};

/// Read side of the account repository.
pub trait AccountDirectory: Send + Sync {
    fn get_account_details(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn get_pricing_rule(&self, id: PricingRuleId) -> Result<Option<PricingRule>, StoreError>;
}

/// In-memory account directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: InMemoryRecords<Account>,
    rules: InMemoryRecords<PricingRule>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_account(&self, account: Account) -> Result<(), StoreError> {
        self.accounts.upsert(account)
    }

    /// Validates before storing; an invalid rule leaves the directory untouched.
    pub fn upsert_pricing_rule(&self, rule: PricingRule) -> DomainResult<()> {
        rule.validate()?;
        self.rules.upsert(rule)?;
        Ok(())
    }

    pub fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.accounts.list()
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn get_account_details(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.accounts.get(&id)
    }

    fn get_pricing_rule(&self, id: PricingRuleId) -> Result<Option<PricingRule>, StoreError> {
        self.rules.get(&id)
    }
}
