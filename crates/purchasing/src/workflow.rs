use std::sync::Arc;

use chrono::NaiveDate;

use tradeflow_core::{
    AccountId, DomainError, DomainResult, KeyedLocks, OperationContext, PurchaseOrderId,
};
use tradeflow_events::EventPublisher;
use tradeflow_inventory::{InventoryLedger, TransactionType};
use tradeflow_parties::{AccountDirectory, AccountType};
use tradeflow_products::ProductCatalog;

use crate::events::{
    PURCHASE_ORDER_AGGREGATE, PurchaseOrderCreated, PurchaseOrderReceived, PurchasingEvent,
};
use crate::order::{
    NewPurchaseOrderLine, PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus,
};
use crate::store::PurchaseOrderStore;

/// Vendor purchase orders: creation and receipt into stock.
pub struct PurchaseOrderWorkflow {
    store: Arc<dyn PurchaseOrderStore>,
    accounts: Arc<dyn AccountDirectory>,
    products: Arc<dyn ProductCatalog>,
    inventory: Arc<InventoryLedger>,
    events: EventPublisher,
    locks: KeyedLocks<PurchaseOrderId>,
}

impl core::fmt::Debug for PurchaseOrderWorkflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PurchaseOrderWorkflow").finish_non_exhaustive()
    }
}

impl PurchaseOrderWorkflow {
    pub fn new(
        store: Arc<dyn PurchaseOrderStore>,
        accounts: Arc<dyn AccountDirectory>,
        products: Arc<dyn ProductCatalog>,
        inventory: Arc<InventoryLedger>,
        events: EventPublisher,
    ) -> Self {
        Self {
            store,
            accounts,
            products,
            inventory,
            events,
            locks: KeyedLocks::new(),
        }
    }

    /// Create an Open order with its lines and put the quantities on order.
    #[tracing::instrument(skip(self, ctx, lines), fields(actor = %ctx.actor(), line_count = lines.len()))]
    pub fn create_purchase_order(
        &self,
        ctx: &OperationContext,
        vendor_id: AccountId,
        lines: Vec<NewPurchaseOrderLine>,
        expected_date: Option<NaiveDate>,
    ) -> DomainResult<PurchaseOrder> {
        let vendor = self
            .accounts
            .get_account_details(vendor_id)?
            .ok_or_else(|| DomainError::not_found("account", vendor_id))?;
        vendor.ensure_active(AccountType::Vendor)?;

        if lines.is_empty() {
            return Err(DomainError::validation("a purchase order needs at least one line"));
        }
        for line in &lines {
            line.validate()?;
            if self.products.get_product_details(line.product_id)?.is_none() {
                return Err(DomainError::not_found("product", line.product_id));
            }
        }
        let order_date = ctx.today();
        if expected_date.is_some_and(|date| date < order_date) {
            return Err(DomainError::validation(
                "expected date cannot be before the order date",
            ));
        }

        let order = PurchaseOrder {
            id: PurchaseOrderId::new(),
            vendor_id,
            status: PurchaseOrderStatus::Open,
            order_date,
            expected_date,
            lines: lines
                .into_iter()
                .zip(1u32..)
                .map(|(line, line_no)| PurchaseOrderLine {
                    line_no,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_cost: line.unit_cost,
                })
                .collect(),
            created_by: ctx.actor(),
            received_at: None,
            received_by: None,
        };
        self.store.insert_order(order.clone())?;

        let reference = order.reference();
        for line in &order.lines {
            self.inventory.record_purchase_order(
                ctx,
                line.product_id,
                line.quantity,
                Some(reference.clone()),
            )?;
        }

        tracing::info!(order_id = %order.id, total_cost = %order.total_cost(), "purchase order created");
        self.events.publish(
            ctx,
            PURCHASE_ORDER_AGGREGATE,
            order.id.into(),
            &PurchasingEvent::PurchaseOrderCreated(PurchaseOrderCreated {
                order_id: order.id,
                vendor_id,
                expected_date,
                lines: order.lines.clone(),
                total_cost: order.total_cost(),
                occurred_at: ctx.occurred_at(),
            }),
        );
        Ok(order)
    }

    /// Book every line into stock and mark the order Received.
    ///
    /// Receiving twice fails; nothing is re-applied.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn receive_purchase_order(
        &self,
        ctx: &OperationContext,
        order_id: PurchaseOrderId,
    ) -> DomainResult<PurchaseOrder> {
        self.locks.with_lock(&order_id, || -> DomainResult<_> {
            let mut order = self.get_purchase_order(order_id)?;
            if order.is_received() {
                return Err(DomainError::invalid_state(format!(
                    "purchase order {order_id} has already been received"
                )));
            }
            for line in &order.lines {
                if self.products.get_product_details(line.product_id)?.is_none() {
                    return Err(DomainError::not_found("product", line.product_id));
                }
            }

            let reference = order.reference();
            for line in &order.lines {
                self.inventory.release_on_order(
                    ctx,
                    line.product_id,
                    line.quantity,
                    Some(reference.clone()),
                )?;
                self.inventory.adjust_stock(
                    ctx,
                    line.product_id,
                    line.quantity,
                    TransactionType::Purchase,
                    Some(reference.clone()),
                )?;
            }

            order.status = PurchaseOrderStatus::Received;
            order.received_at = Some(ctx.occurred_at());
            order.received_by = Some(ctx.actor());
            self.store.update_order(order.clone())?;

            tracing::info!(%order_id, quantity = order.total_quantity(), "purchase order received");
            self.events.publish(
                ctx,
                PURCHASE_ORDER_AGGREGATE,
                order_id.into(),
                &PurchasingEvent::PurchaseOrderReceived(PurchaseOrderReceived {
                    order_id,
                    vendor_id: order.vendor_id,
                    lines: order.lines.clone(),
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(order)
        })
    }

    pub fn get_purchase_order(&self, order_id: PurchaseOrderId) -> DomainResult<PurchaseOrder> {
        self.store
            .get_order(order_id)?
            .ok_or_else(|| DomainError::not_found("purchase order", order_id))
    }

    pub fn list_purchase_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
    ) -> DomainResult<Vec<PurchaseOrder>> {
        Ok(self.store.list_orders(status)?)
    }
}
