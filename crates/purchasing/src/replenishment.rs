use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;

use tradeflow_core::{
    AccountId, DomainError, DomainResult, OperationContext, ProductId, PurchaseOrderId,
    ReplenishmentId,
};
use tradeflow_events::EventPublisher;
use tradeflow_inventory::{InventoryLedger, ReplenishmentQueueItem};
use tradeflow_products::ProductCatalog;

use crate::events::{PurchasingEvent, REPLENISHMENT_AGGREGATE, ReplenishmentSkipped, SkipReason};
use crate::order::NewPurchaseOrderLine;
use crate::workflow::PurchaseOrderWorkflow;

/// Needs for one vendor, merged per product.
#[derive(Debug, Default)]
struct VendorBatch {
    lines: BTreeMap<ProductId, (i64, Decimal)>,
    items: Vec<ReplenishmentQueueItem>,
}

/// Turns the replenishment queue into purchase orders, one per default vendor.
///
/// A run is atomic per vendor: the vendor's order is created first, then
/// exactly that vendor's queue items are removed. A vendor whose order is
/// rejected is skipped and its items stay queued; the other vendors still get
/// their orders. A store failure ends the run, leaving unconsumed items queued
/// for the next one. Runs never overlap.
pub struct ReplenishmentCoordinator {
    inventory: Arc<InventoryLedger>,
    products: Arc<dyn ProductCatalog>,
    purchasing: Arc<PurchaseOrderWorkflow>,
    events: EventPublisher,
    run_lock: Mutex<()>,
}

impl core::fmt::Debug for ReplenishmentCoordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReplenishmentCoordinator").finish_non_exhaustive()
    }
}

impl ReplenishmentCoordinator {
    pub fn new(
        inventory: Arc<InventoryLedger>,
        products: Arc<dyn ProductCatalog>,
        purchasing: Arc<PurchaseOrderWorkflow>,
        events: EventPublisher,
    ) -> Self {
        Self {
            inventory,
            products,
            purchasing,
            events,
            run_lock: Mutex::new(()),
        }
    }

    /// Drain the queue into purchase orders and return the ids created.
    ///
    /// Needs whose product is unknown, has no default vendor, or whose vendor
    /// rejects the order are skipped (logged and published) and stay queued.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn process_queue(&self, ctx: &OperationContext) -> DomainResult<Vec<PurchaseOrderId>> {
        let _run = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let pending = self.inventory.pending_replenishments()?;
        if pending.is_empty() {
            tracing::debug!("replenishment queue is empty");
            return Ok(Vec::new());
        }

        let mut batches: BTreeMap<AccountId, VendorBatch> = BTreeMap::new();
        for item in pending {
            let Some(product) = self.products.get_product_details(item.product_id)? else {
                self.skip(ctx, &item, SkipReason::ProductMissing);
                continue;
            };
            let Some(vendor_id) = product.default_vendor_id else {
                self.skip(ctx, &item, SkipReason::NoDefaultVendor);
                continue;
            };

            let batch = batches.entry(vendor_id).or_default();
            let line = batch
                .lines
                .entry(item.product_id)
                .or_insert((0, product.cost.unwrap_or(Decimal::ZERO)));
            line.0 += item.quantity;
            batch.items.push(item);
        }

        let mut created = Vec::with_capacity(batches.len());
        for (vendor_id, batch) in batches {
            let lines = batch
                .lines
                .into_iter()
                .map(|(product_id, (quantity, unit_cost))| {
                    NewPurchaseOrderLine::new(product_id, quantity, unit_cost)
                })
                .collect();

            let order = match self.purchasing.create_purchase_order(ctx, vendor_id, lines, None) {
                Ok(order) => order,
                Err(err @ DomainError::Store(_)) => {
                    tracing::warn!(
                        %vendor_id,
                        created = created.len(),
                        "replenishment run stopped: {err}"
                    );
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(%vendor_id, "vendor rejected replenishment order: {err}");
                    for item in &batch.items {
                        self.skip(ctx, item, SkipReason::VendorUnavailable);
                    }
                    continue;
                }
            };
            let consumed: Vec<ReplenishmentId> = batch.items.iter().map(|item| item.id).collect();
            self.inventory.remove_replenishments(ctx, &consumed)?;

            tracing::info!(
                %vendor_id,
                order_id = %order.id,
                items = consumed.len(),
                "replenishment purchase order created"
            );
            created.push(order.id);
        }

        Ok(created)
    }

    fn skip(&self, ctx: &OperationContext, item: &ReplenishmentQueueItem, reason: SkipReason) {
        tracing::warn!(
            replenishment_id = %item.id,
            product_id = %item.product_id,
            quantity = item.quantity,
            %reason,
            "replenishment skipped"
        );
        self.events.publish(
            ctx,
            REPLENISHMENT_AGGREGATE,
            item.id.into(),
            &PurchasingEvent::ReplenishmentSkipped(ReplenishmentSkipped {
                replenishment_id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                reason,
                occurred_at: ctx.occurred_at(),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::PurchaseOrderStatus;
    use crate::store::InMemoryPurchaseOrderStore;
    use rust_decimal_macros::dec;
    use tradeflow_core::{RecordStatus, UserId};
    use tradeflow_events::{EventBus, InMemoryEventBus, JsonEnvelope};
    use tradeflow_inventory::{InMemoryInventoryStore, TransactionType};
    use tradeflow_parties::{Account, InMemoryAccountDirectory};
    use tradeflow_products::{InMemoryProductCatalog, Product};

    struct Fixture {
        coordinator: ReplenishmentCoordinator,
        purchasing: Arc<PurchaseOrderWorkflow>,
        accounts: Arc<InMemoryAccountDirectory>,
        catalog: Arc<InMemoryProductCatalog>,
        inventory: Arc<InventoryLedger>,
        bus: Arc<InMemoryEventBus<JsonEnvelope>>,
        ctx: OperationContext,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let (events, bus) = EventPublisher::in_memory();
        let inventory = Arc::new(InventoryLedger::new(
            Arc::new(InMemoryInventoryStore::new()),
            catalog.clone(),
            events.clone(),
        ));
        let purchasing = Arc::new(PurchaseOrderWorkflow::new(
            Arc::new(InMemoryPurchaseOrderStore::new()),
            accounts.clone(),
            catalog.clone(),
            inventory.clone(),
            events.clone(),
        ));
        let coordinator = ReplenishmentCoordinator::new(
            inventory.clone(),
            catalog.clone(),
            purchasing.clone(),
            events,
        );
        Fixture {
            coordinator,
            purchasing,
            accounts,
            catalog,
            inventory,
            bus,
            ctx: OperationContext::new(UserId::new()),
        }
    }

    impl Fixture {
        fn vendor(&self) -> AccountId {
            let vendor = Account::vendor("Supplier");
            let id = vendor.id;
            self.accounts.upsert_account(vendor).unwrap();
            id
        }

        /// Product at its reorder point with a queued need of `quantity`.
        fn queued_product(&self, vendor: Option<AccountId>, quantity: i64) -> ProductId {
            let mut product = Product::new("SKU", "Part")
                .with_cost(dec!(4))
                .with_reorder_point(0)
                .with_reorder_quantity(quantity);
            product.default_vendor_id = vendor;
            let id = product.id;
            self.catalog.upsert_product(product).unwrap();
            self.inventory
                .adjust_stock(&self.ctx, id, -1, TransactionType::Sale, None)
                .unwrap();
            id
        }
    }

    #[test]
    fn one_order_per_vendor_with_one_line_per_product() {
        let fx = fixture();
        let acme = fx.vendor();
        let globex = fx.vendor();
        let a1 = fx.queued_product(Some(acme), 10);
        let a2 = fx.queued_product(Some(acme), 20);
        let g1 = fx.queued_product(Some(globex), 5);

        let created = fx.coordinator.process_queue(&fx.ctx).unwrap();
        assert_eq!(created.len(), 2);
        assert!(fx.inventory.pending_replenishments().unwrap().is_empty());

        let orders = fx
            .purchasing
            .list_purchase_orders(Some(PurchaseOrderStatus::Open))
            .unwrap();
        let acme_order = orders.iter().find(|o| o.vendor_id == acme).unwrap();
        let mut acme_products: Vec<_> = acme_order.lines.iter().map(|l| l.product_id).collect();
        acme_products.sort();
        let mut expected = vec![a1, a2];
        expected.sort();
        assert_eq!(acme_products, expected);
        assert!(acme_order.lines.iter().all(|l| l.unit_cost == dec!(4)));

        let globex_order = orders.iter().find(|o| o.vendor_id == globex).unwrap();
        assert_eq!(globex_order.lines.len(), 1);
        assert_eq!(globex_order.lines[0].product_id, g1);
        assert_eq!(globex_order.lines[0].quantity, 5);

        assert_eq!(fx.inventory.get_on_order_level(a2).unwrap(), 20);
    }

    #[test]
    fn products_without_vendor_are_skipped_observably_and_stay_queued() {
        let fx = fixture();
        let vendor = fx.vendor();
        fx.queued_product(Some(vendor), 10);
        let orphan = fx.queued_product(None, 7);
        let sub = fx.bus.subscribe();

        let created = fx.coordinator.process_queue(&fx.ctx).unwrap();
        assert_eq!(created.len(), 1);

        let pending = fx.inventory.pending_replenishments().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].product_id, orphan);

        let skipped: Vec<_> = sub
            .drain()
            .into_iter()
            .filter_map(|env| match env.decode::<PurchasingEvent>().ok()? {
                PurchasingEvent::ReplenishmentSkipped(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].product_id, orphan);
        assert_eq!(skipped[0].reason, SkipReason::NoDefaultVendor);
    }

    fn skip_reasons(sub: &tradeflow_events::Subscription<JsonEnvelope>) -> Vec<(ProductId, SkipReason)> {
        sub.drain()
            .into_iter()
            .filter_map(|env| match env.decode::<PurchasingEvent>().ok()? {
                PurchasingEvent::ReplenishmentSkipped(e) => Some((e.product_id, e.reason)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rejected_vendor_does_not_block_the_others() {
        let fx = fixture();
        let mut retired = Account::vendor("Closed");
        retired.id = AccountId::from_uuid(uuid::Uuid::nil());
        retired.status = RecordStatus::Retired;
        let bad = retired.id;
        fx.accounts.upsert_account(retired).unwrap();
        let good = fx.vendor();
        assert!(bad < good, "the rejected vendor is processed first");

        let stuck = fx.queued_product(Some(bad), 3);
        fx.queued_product(Some(good), 10);
        let sub = fx.bus.subscribe();

        let first = fx.coordinator.process_queue(&fx.ctx).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(skip_reasons(&sub), vec![(stuck, SkipReason::VendorUnavailable)]);

        let second = fx.coordinator.process_queue(&fx.ctx).unwrap();
        assert!(second.is_empty());

        let orders = fx.purchasing.list_purchase_orders(None).unwrap();
        assert_eq!(orders.iter().filter(|o| o.vendor_id == good).count(), 1);
        assert!(orders.iter().all(|o| o.vendor_id != bad));

        let pending = fx.inventory.pending_replenishments().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].product_id, stuck);
    }

    #[test]
    fn unknown_vendor_is_skipped_like_a_retired_one() {
        let fx = fixture();
        let ghost = fx.queued_product(Some(AccountId::new()), 4);
        let sub = fx.bus.subscribe();

        assert!(fx.coordinator.process_queue(&fx.ctx).unwrap().is_empty());
        assert_eq!(skip_reasons(&sub), vec![(ghost, SkipReason::VendorUnavailable)]);
        assert_eq!(fx.inventory.pending_replenishments().unwrap().len(), 1);
    }

    #[test]
    fn empty_queue_creates_nothing() {
        let fx = fixture();
        assert!(fx.coordinator.process_queue(&fx.ctx).unwrap().is_empty());
    }
}
