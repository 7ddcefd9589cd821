//! In-memory wiring of every store and service.

use std::sync::Arc;

use tradeflow_core::DomainResult;
use tradeflow_events::{EventPublisher, InMemoryEventBus, JsonEnvelope};
use tradeflow_inventory::{InMemoryInventoryStore, InventoryLedger};
use tradeflow_parties::InMemoryAccountDirectory;
use tradeflow_products::InMemoryProductCatalog;
use tradeflow_purchasing::{
    InMemoryPurchaseOrderStore, PurchaseOrderWorkflow, ReplenishmentCoordinator,
};
use tradeflow_sales::{InMemorySalesDocumentStore, SalesDocumentWorkflow, SalesSettings};

use crate::config::AppConfig;

/// The order-to-cash services sharing one event bus and one set of stores.
pub struct Backoffice {
    pub accounts: Arc<InMemoryAccountDirectory>,
    pub products: Arc<InMemoryProductCatalog>,
    pub bus: Arc<InMemoryEventBus<JsonEnvelope>>,
    pub inventory: Arc<InventoryLedger>,
    pub sales: Arc<SalesDocumentWorkflow>,
    pub purchasing: Arc<PurchaseOrderWorkflow>,
    pub replenishment: Arc<ReplenishmentCoordinator>,
}

impl core::fmt::Debug for Backoffice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Backoffice")
            .field("settings", self.sales.settings())
            .finish_non_exhaustive()
    }
}

impl Backoffice {
    pub fn in_memory(settings: SalesSettings) -> DomainResult<Self> {
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let products = Arc::new(InMemoryProductCatalog::new());
        let (events, bus) = EventPublisher::in_memory();

        let inventory = Arc::new(InventoryLedger::new(
            Arc::new(InMemoryInventoryStore::new()),
            products.clone(),
            events.clone(),
        ));
        let sales = Arc::new(SalesDocumentWorkflow::new(
            Arc::new(InMemorySalesDocumentStore::new()),
            accounts.clone(),
            products.clone(),
            inventory.clone(),
            events.clone(),
            settings,
        )?);
        let purchasing = Arc::new(PurchaseOrderWorkflow::new(
            Arc::new(InMemoryPurchaseOrderStore::new()),
            accounts.clone(),
            products.clone(),
            inventory.clone(),
            events.clone(),
        ));
        let replenishment = Arc::new(ReplenishmentCoordinator::new(
            inventory.clone(),
            products.clone(),
            purchasing.clone(),
            events,
        ));

        tracing::debug!("in-memory backoffice wired");
        Ok(Self {
            accounts,
            products,
            bus,
            inventory,
            sales,
            purchasing,
            replenishment,
        })
    }

    /// Initialise logging from `[logging]`, then wire the services with the
    /// `[sales]` settings.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        tradeflow_observability::init_with(&config.logging);
        Ok(Self::in_memory(config.sales_settings())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn from_config_applies_sales_settings_and_tolerates_repeat_logging_init() {
        let config = AppConfig::from_toml(
            r#"
            [sales]
            tax_rate_percent = "7.5"

            [logging]
            level = "debug"
            json = false
            "#,
        )
        .unwrap();

        let first = Backoffice::from_config(&config).unwrap();
        assert_eq!(first.sales.settings().tax_rate_percent, dec!(7.5));

        let second = Backoffice::from_config(&config).unwrap();
        assert_eq!(second.sales.settings(), first.sales.settings());
    }
}
