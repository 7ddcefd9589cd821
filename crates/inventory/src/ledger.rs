use std::sync::Arc;

use tradeflow_core::{
    DomainError, DomainResult, KeyedLocks, OperationContext, ProductId, ReplenishmentId,
};
use tradeflow_events::EventPublisher;
use tradeflow_products::{Product, ProductCatalog};

use crate::events::{
    INVENTORY_AGGREGATE, InventoryEvent, OnOrderChanged, ReplenishmentQueued, ReplenishmentRemoved,
    StockAdjusted,
};
use crate::replenishment::ReplenishmentQueueItem;
use crate::store::InventoryStore;
use crate::transaction::{InventoryTransaction, TransactionType, on_order_level, stock_level};

/// Stock ledger service.
///
/// Every write for a product (append, recompute, threshold check, enqueue)
/// runs under that product's lock; different products never block each other.
pub struct InventoryLedger {
    store: Arc<dyn InventoryStore>,
    products: Arc<dyn ProductCatalog>,
    events: EventPublisher,
    locks: KeyedLocks<ProductId>,
}

impl core::fmt::Debug for InventoryLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InventoryLedger")
            .field("locked_products", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl InventoryLedger {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        products: Arc<dyn ProductCatalog>,
        events: EventPublisher,
    ) -> Self {
        Self {
            store,
            products,
            events,
            locks: KeyedLocks::new(),
        }
    }

    /// Move on-hand stock and return the new level.
    ///
    /// If the new level is at or below the product's reorder point or safety
    /// stock, a replenishment need is queued unless one is already pending.
    #[tracing::instrument(skip(self, ctx, reference), fields(actor = %ctx.actor()))]
    pub fn adjust_stock(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        quantity: i64,
        transaction_type: TransactionType,
        reference: Option<String>,
    ) -> DomainResult<i64> {
        if quantity == 0 {
            return Err(DomainError::validation("stock adjustment quantity cannot be zero"));
        }
        if !transaction_type.affects_stock() {
            return Err(DomainError::validation(
                "purchase order quantities are recorded with record_purchase_order",
            ));
        }
        let product = self.product(product_id)?;

        self.locks.with_lock(&product_id, || -> DomainResult<_> {
            let current = stock_level(&self.store.transactions_for(product_id)?)?;
            let new_level = current.checked_add(quantity).ok_or_else(|| {
                DomainError::validation(format!(
                    "adjusting stock of {product_id} by {quantity} leaves the representable range"
                ))
            })?;
            self.append(ctx, product_id, quantity, transaction_type, reference.clone())?;

            tracing::info!(quantity, %transaction_type, new_level, "stock adjusted");
            self.events.publish(
                ctx,
                INVENTORY_AGGREGATE,
                product_id.into(),
                &InventoryEvent::StockAdjusted(StockAdjusted {
                    product_id,
                    quantity,
                    transaction_type,
                    reference,
                    new_level,
                    occurred_at: ctx.occurred_at(),
                }),
            );

            self.check_reorder_threshold(ctx, &product, new_level)?;
            Ok(new_level)
        })
    }

    /// Record quantity committed on a purchase order. Returns the new on-order level.
    #[tracing::instrument(skip(self, ctx, reference), fields(actor = %ctx.actor()))]
    pub fn record_purchase_order(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        quantity: i64,
        reference: Option<String>,
    ) -> DomainResult<i64> {
        if quantity <= 0 {
            return Err(DomainError::validation("on-order quantity must be positive"));
        }
        self.product(product_id)?;

        self.locks.with_lock(&product_id, || -> DomainResult<_> {
            self.change_on_order(ctx, product_id, quantity, reference)
        })
    }

    /// Release on-order quantity (goods received). Never drives on-order below zero.
    #[tracing::instrument(skip(self, ctx, reference), fields(actor = %ctx.actor()))]
    pub fn release_on_order(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        quantity: i64,
        reference: Option<String>,
    ) -> DomainResult<i64> {
        if quantity <= 0 {
            return Err(DomainError::validation("released quantity must be positive"));
        }
        self.product(product_id)?;

        self.locks.with_lock(&product_id, || -> DomainResult<_> {
            let on_order = on_order_level(&self.store.transactions_for(product_id)?)?;
            let release = quantity.min(on_order);
            if release <= 0 {
                tracing::debug!(on_order, "nothing on order to release");
                return Ok(on_order);
            }
            self.change_on_order(ctx, product_id, -release, reference)
        })
    }

    pub fn get_stock_level(&self, product_id: ProductId) -> DomainResult<i64> {
        stock_level(&self.store.transactions_for(product_id)?)
    }

    pub fn get_on_order_level(&self, product_id: ProductId) -> DomainResult<i64> {
        on_order_level(&self.store.transactions_for(product_id)?)
    }

    /// Full transaction history for a product, oldest first.
    pub fn transactions(&self, product_id: ProductId) -> DomainResult<Vec<InventoryTransaction>> {
        Ok(self.store.transactions_for(product_id)?)
    }

    pub fn pending_replenishments(&self) -> DomainResult<Vec<ReplenishmentQueueItem>> {
        Ok(self.store.pending_replenishments()?)
    }

    /// Drop the given needs from the queue. Unknown ids are ignored.
    pub fn remove_replenishments(
        &self,
        ctx: &OperationContext,
        ids: &[ReplenishmentId],
    ) -> DomainResult<usize> {
        let removing: Vec<_> = self
            .store
            .pending_replenishments()?
            .into_iter()
            .filter(|item| ids.contains(&item.id))
            .collect();
        let removed = self.store.remove_replenishments(ids)?;

        for item in &removing {
            self.events.publish(
                ctx,
                INVENTORY_AGGREGATE,
                item.product_id.into(),
                &InventoryEvent::ReplenishmentRemoved(ReplenishmentRemoved {
                    replenishment_id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    occurred_at: ctx.occurred_at(),
                }),
            );
        }
        tracing::info!(removed, "replenishment items removed");
        Ok(removed)
    }

    fn product(&self, product_id: ProductId) -> DomainResult<Product> {
        self.products
            .get_product_details(product_id)?
            .ok_or_else(|| DomainError::not_found("product", product_id))
    }

    fn append(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        quantity: i64,
        transaction_type: TransactionType,
        reference: Option<String>,
    ) -> DomainResult<()> {
        self.store.append_transaction(InventoryTransaction {
            product_id,
            quantity,
            transaction_type,
            reference,
            recorded_by: ctx.actor(),
            recorded_at: ctx.occurred_at(),
        })?;
        Ok(())
    }

    // Caller holds the product lock.
    fn change_on_order(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        quantity: i64,
        reference: Option<String>,
    ) -> DomainResult<i64> {
        let current = on_order_level(&self.store.transactions_for(product_id)?)?;
        let new_on_order = current.checked_add(quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "on-order quantity of {product_id} would leave the representable range"
            ))
        })?;
        self.append(
            ctx,
            product_id,
            quantity,
            TransactionType::PurchaseOrderPlaced,
            reference.clone(),
        )?;

        tracing::info!(quantity, new_on_order, "on-order quantity changed");
        self.events.publish(
            ctx,
            INVENTORY_AGGREGATE,
            product_id.into(),
            &InventoryEvent::OnOrderChanged(OnOrderChanged {
                product_id,
                quantity,
                reference,
                new_on_order,
                occurred_at: ctx.occurred_at(),
            }),
        );
        Ok(new_on_order)
    }

    // Caller holds the product lock.
    fn check_reorder_threshold(
        &self,
        ctx: &OperationContext,
        product: &Product,
        stock: i64,
    ) -> DomainResult<()> {
        if !product.reorder.is_triggered(stock) {
            return Ok(());
        }

        let quantity = product.reorder.replenishment_quantity(stock);
        if quantity <= 0 {
            tracing::debug!(product_id = %product.id, stock, "threshold reached but no quantity to order");
            return Ok(());
        }

        let already_queued = self
            .store
            .pending_replenishments()?
            .iter()
            .any(|item| item.product_id == product.id);
        if already_queued {
            tracing::debug!(product_id = %product.id, stock, "replenishment already pending");
            return Ok(());
        }

        let item = ReplenishmentQueueItem {
            id: ReplenishmentId::new(),
            product_id: product.id,
            quantity,
            triggered_at_level: stock,
            queued_at: ctx.occurred_at(),
        };
        self.store.enqueue_replenishment(item.clone())?;

        tracing::info!(product_id = %product.id, stock, quantity, "replenishment queued");
        self.events.publish(
            ctx,
            INVENTORY_AGGREGATE,
            product.id.into(),
            &InventoryEvent::ReplenishmentQueued(ReplenishmentQueued {
                replenishment_id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                stock_level: stock,
                occurred_at: item.queued_at,
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInventoryStore;
    use std::sync::Arc;
    use tradeflow_core::UserId;
    use tradeflow_events::{EventBus, InMemoryEventBus, JsonEnvelope};
    use tradeflow_products::InMemoryProductCatalog;

    struct Fixture {
        ledger: InventoryLedger,
        catalog: Arc<InMemoryProductCatalog>,
        bus: Arc<InMemoryEventBus<JsonEnvelope>>,
        ctx: OperationContext,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let (events, bus) = EventPublisher::in_memory();
        let ledger = InventoryLedger::new(
            Arc::new(InMemoryInventoryStore::new()),
            catalog.clone(),
            events,
        );
        Fixture {
            ledger,
            catalog,
            bus,
            ctx: OperationContext::new(UserId::new()),
        }
    }

    fn add_product(fx: &Fixture, product: Product) -> ProductId {
        let id = product.id;
        fx.catalog.upsert_product(product).unwrap();
        id
    }

    #[test]
    fn sale_below_reorder_point_goes_negative_and_queues_once() {
        let fx = fixture();
        let id = add_product(
            &fx,
            Product::new("W-1", "Widget")
                .with_reorder_point(5)
                .with_reorder_quantity(20),
        );

        fx.ledger
            .adjust_stock(&fx.ctx, id, 8, TransactionType::Adjustment, None)
            .unwrap();
        assert!(fx.ledger.pending_replenishments().unwrap().is_empty());

        let level = fx
            .ledger
            .adjust_stock(&fx.ctx, id, -10, TransactionType::Sale, Some("Q00001".into()))
            .unwrap();
        assert_eq!(level, -2);

        let queue = fx.ledger.pending_replenishments().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].product_id, id);
        assert_eq!(queue[0].quantity, 20);
        assert_eq!(queue[0].triggered_at_level, -2);
    }

    #[test]
    fn pending_need_is_not_duplicated() {
        let fx = fixture();
        let id = add_product(
            &fx,
            Product::new("W-1", "Widget")
                .with_reorder_point(5)
                .with_reorder_quantity(20),
        );

        fx.ledger.adjust_stock(&fx.ctx, id, -1, TransactionType::Sale, None).unwrap();
        fx.ledger.adjust_stock(&fx.ctx, id, -1, TransactionType::Sale, None).unwrap();

        assert_eq!(fx.ledger.pending_replenishments().unwrap().len(), 1);
        assert_eq!(fx.ledger.get_stock_level(id).unwrap(), -2);
    }

    #[test]
    fn shortfall_is_used_without_reorder_quantity() {
        let fx = fixture();
        let id = add_product(&fx, Product::new("W-1", "Widget").with_reorder_point(5));

        fx.ledger.adjust_stock(&fx.ctx, id, 2, TransactionType::Purchase, None).unwrap();

        let queue = fx.ledger.pending_replenishments().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].quantity, 3);
    }

    #[test]
    fn safety_stock_triggers_independently() {
        let fx = fixture();
        let id = add_product(
            &fx,
            Product::new("W-1", "Widget")
                .with_safety_stock(3)
                .with_reorder_quantity(10),
        );

        fx.ledger.adjust_stock(&fx.ctx, id, 3, TransactionType::Adjustment, None).unwrap();

        let queue = fx.ledger.pending_replenishments().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].quantity, 10);
    }

    #[test]
    fn safety_stock_alone_queues_the_shortfall_to_the_floor() {
        let fx = fixture();
        let id = add_product(&fx, Product::new("W-1", "Widget").with_safety_stock(5));

        fx.ledger.adjust_stock(&fx.ctx, id, -10, TransactionType::Sale, None).unwrap();

        let queue = fx.ledger.pending_replenishments().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].quantity, 15);
        assert_eq!(queue[0].triggered_at_level, -10);
    }

    #[test]
    fn adjustment_past_the_quantity_range_is_rejected_without_recording() {
        let fx = fixture();
        let id = add_product(&fx, Product::new("W-1", "Widget"));

        fx.ledger
            .adjust_stock(&fx.ctx, id, i64::MAX, TransactionType::Adjustment, None)
            .unwrap();
        let err = fx
            .ledger
            .adjust_stock(&fx.ctx, id, 1, TransactionType::Purchase, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert_eq!(fx.ledger.transactions(id).unwrap().len(), 1);
        assert_eq!(fx.ledger.get_stock_level(id).unwrap(), i64::MAX);
    }

    #[test]
    fn product_without_thresholds_is_never_queued() {
        let fx = fixture();
        let id = add_product(&fx, Product::new("W-1", "Widget"));

        fx.ledger.adjust_stock(&fx.ctx, id, -50, TransactionType::Sale, None).unwrap();
        assert!(fx.ledger.pending_replenishments().unwrap().is_empty());
    }

    #[test]
    fn rejects_zero_quantity_unknown_product_and_on_order_type() {
        let fx = fixture();
        let id = add_product(&fx, Product::new("W-1", "Widget"));

        let err = fx
            .ledger
            .adjust_stock(&fx.ctx, id, 0, TransactionType::Adjustment, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = fx
            .ledger
            .adjust_stock(&fx.ctx, id, 4, TransactionType::PurchaseOrderPlaced, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = fx
            .ledger
            .adjust_stock(&fx.ctx, ProductId::new(), 4, TransactionType::Adjustment, None)
            .unwrap_err();
        assert!(err.is_not_found());

        assert!(fx.ledger.transactions(id).unwrap().is_empty());
    }

    #[test]
    fn on_order_is_tracked_apart_from_stock_and_release_is_clamped() {
        let fx = fixture();
        let id = add_product(&fx, Product::new("W-1", "Widget"));

        assert_eq!(
            fx.ledger.record_purchase_order(&fx.ctx, id, 25, Some("PO#1".into())).unwrap(),
            25
        );
        assert_eq!(fx.ledger.get_stock_level(id).unwrap(), 0);

        assert_eq!(fx.ledger.release_on_order(&fx.ctx, id, 40, None).unwrap(), 0);
        assert_eq!(fx.ledger.get_on_order_level(id).unwrap(), 0);

        // Nothing left to release: no entry appended.
        assert_eq!(fx.ledger.release_on_order(&fx.ctx, id, 5, None).unwrap(), 0);
        let history = fx.ledger.transactions(id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].quantity, -25);
    }

    #[test]
    fn publishes_adjustment_then_queued_need() {
        let fx = fixture();
        let sub = fx.bus.subscribe();
        let id = add_product(
            &fx,
            Product::new("W-1", "Widget")
                .with_reorder_point(0)
                .with_reorder_quantity(5),
        );

        fx.ledger.adjust_stock(&fx.ctx, id, -1, TransactionType::Sale, None).unwrap();

        let types: Vec<_> = sub.drain().iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(
            types,
            vec!["inventory.stock.adjusted", "inventory.replenishment.queued"]
        );
    }

    #[test]
    fn remove_replenishments_reports_and_publishes_removals() {
        let fx = fixture();
        let id = add_product(
            &fx,
            Product::new("W-1", "Widget")
                .with_reorder_point(0)
                .with_reorder_quantity(5),
        );
        fx.ledger.adjust_stock(&fx.ctx, id, -1, TransactionType::Sale, None).unwrap();
        let queued = fx.ledger.pending_replenishments().unwrap();

        let sub = fx.bus.subscribe();
        let removed = fx
            .ledger
            .remove_replenishments(&fx.ctx, &[queued[0].id, ReplenishmentId::new()])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(fx.ledger.pending_replenishments().unwrap().is_empty());

        let envelopes = sub.drain();
        assert_eq!(envelopes.len(), 1);
        match envelopes[0].decode::<InventoryEvent>().unwrap() {
            InventoryEvent::ReplenishmentRemoved(e) => assert_eq!(e.quantity, 5),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
