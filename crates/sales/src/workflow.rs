use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use tradeflow_core::{
    AccountId, DocumentId, DomainError, DomainResult, ItemId, KeyedLocks, OperationContext,
    ProductId, RecordStatus,
};
use tradeflow_events::EventPublisher;
use tradeflow_inventory::{InventoryLedger, TransactionType};
use tradeflow_parties::{Account, AccountDirectory, AccountType};
use tradeflow_pricing::PricingEngine;
use tradeflow_products::{Product, ProductCatalog};

use crate::document::{
    DocumentDetails, DocumentTotals, SalesDocument, SalesDocumentItem, line_total, validate_line,
};
use crate::events::{
    DetailsUpdated, DocumentDeleted, DocumentRetired, InvoiceCreated, ItemAdded, ItemRemoved,
    ItemShipped, ItemUpdated, QuoteConverted, QuoteCreated, SALES_DOCUMENT_AGGREGATE, SalesEvent,
    SalesOrderConfirmed, StatusChanged, TotalsRecalculated,
};
use crate::numbering::next_number;
use crate::settings::SalesSettings;
use crate::status::{DocumentStatus, DocumentType};
use crate::store::{DocumentFilter, SalesDocumentStore};

/// A line to add to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub product_id: Option<ProductId>,
    pub quantity: i64,
    /// Defaults to the product description.
    pub description: Option<String>,
    /// Overrides the pricing engine.
    pub unit_price: Option<Decimal>,
    pub discount_percentage: Decimal,
    pub note: Option<String>,
}

impl NewItem {
    pub fn product(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            quantity,
            description: None,
            unit_price: None,
            discount_percentage: Decimal::ZERO,
            note: None,
        }
    }

    /// Product-less line; description and price are mandatory.
    pub fn custom(description: impl Into<String>, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            product_id: None,
            quantity,
            description: Some(description.into()),
            unit_price: Some(unit_price),
            discount_percentage: Decimal::ZERO,
            note: None,
        }
    }

    pub fn with_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_discount(mut self, percentage: Decimal) -> Self {
        self.discount_percentage = percentage;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Replacement values for an existing line.
///
/// Without a price, product lines are re-priced and custom lines keep their
/// price. Without a description the current one is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub quantity: i64,
    pub unit_price: Option<Decimal>,
    pub discount_percentage: Decimal,
    pub description: Option<String>,
    pub note: Option<String>,
}

impl ItemUpdate {
    pub fn new(quantity: i64) -> Self {
        Self {
            quantity,
            unit_price: None,
            discount_percentage: Decimal::ZERO,
            description: None,
            note: None,
        }
    }

    pub fn with_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_discount(mut self, percentage: Decimal) -> Self {
        self.discount_percentage = percentage;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

struct ResolvedLine {
    description: String,
    unit_price: Decimal,
    price_overridden: bool,
}

/// Quote → sales order → invoice lifecycle.
///
/// Mutations of one document are serialised on a per-document lock; number
/// allocation is serialised on its own lock so numbers never collide.
pub struct SalesDocumentWorkflow {
    store: Arc<dyn SalesDocumentStore>,
    accounts: Arc<dyn AccountDirectory>,
    products: Arc<dyn ProductCatalog>,
    pricing: PricingEngine,
    inventory: Arc<InventoryLedger>,
    events: EventPublisher,
    settings: SalesSettings,
    locks: KeyedLocks<DocumentId>,
    numbering: Mutex<()>,
}

impl core::fmt::Debug for SalesDocumentWorkflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SalesDocumentWorkflow")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SalesDocumentWorkflow {
    pub fn new(
        store: Arc<dyn SalesDocumentStore>,
        accounts: Arc<dyn AccountDirectory>,
        products: Arc<dyn ProductCatalog>,
        inventory: Arc<InventoryLedger>,
        events: EventPublisher,
        settings: SalesSettings,
    ) -> DomainResult<Self> {
        settings.validate()?;
        let pricing = PricingEngine::new(accounts.clone(), products.clone())
            .with_precision(settings.money_precision);
        Ok(Self {
            store,
            accounts,
            products,
            pricing,
            inventory,
            events,
            settings,
            locks: KeyedLocks::new(),
            numbering: Mutex::new(()),
        })
    }

    pub fn settings(&self) -> &SalesSettings {
        &self.settings
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    // ---- queries ----

    pub fn get_document(&self, document_id: DocumentId) -> DomainResult<SalesDocument> {
        self.load(document_id)
    }

    pub fn get_document_items(&self, document_id: DocumentId) -> DomainResult<Vec<SalesDocumentItem>> {
        self.load(document_id)?;
        Ok(self.store.items_for(document_id)?)
    }

    pub fn list_sales_documents(&self, filter: &DocumentFilter) -> DomainResult<Vec<SalesDocument>> {
        Ok(self.store.list_documents(filter)?)
    }

    // ---- quotes ----

    /// Open a new quote in Quote Draft for an active customer.
    #[tracing::instrument(skip(self, ctx, notes, reference_number), fields(actor = %ctx.actor()))]
    pub fn create_quote(
        &self,
        ctx: &OperationContext,
        customer_id: AccountId,
        notes: Option<String>,
        expiry_date: Option<NaiveDate>,
        reference_number: Option<String>,
    ) -> DomainResult<SalesDocument> {
        let customer = self.account(customer_id)?;
        customer.ensure_active(AccountType::Customer)?;

        let today = ctx.today();
        let expiry_date = match expiry_date {
            Some(date) if date < today => {
                return Err(DomainError::validation(format!(
                    "expiry date {date} is before the creation date {today}"
                )));
            }
            Some(date) => date,
            None => add_days(today, self.settings.quote_validity_days)?,
        };

        let quote = self.insert_numbered(&self.settings.quote_prefix, |number| SalesDocument {
            id: DocumentId::new(),
            number,
            customer_id,
            document_type: DocumentType::Quote,
            status: DocumentStatus::QuoteDraft,
            created_on: today,
            created_by: ctx.actor(),
            expiry_date: Some(expiry_date),
            due_date: None,
            reference_number,
            notes,
            subtotal: Decimal::ZERO,
            taxes: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            related_quote_id: None,
            record_status: RecordStatus::Active,
            updated_at: ctx.occurred_at(),
        })?;

        tracing::info!(document_id = %quote.id, number = %quote.number, "quote created");
        self.publish(
            ctx,
            quote.id,
            SalesEvent::QuoteCreated(QuoteCreated {
                document_id: quote.id,
                number: quote.number.clone(),
                customer_id,
                expiry_date: quote.expiry_date,
                occurred_at: ctx.occurred_at(),
            }),
        );
        Ok(quote)
    }

    /// Move every Draft/Sent quote whose expiry date lies before `as_of` to Quote Expired.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn expire_quotes(&self, ctx: &OperationContext, as_of: NaiveDate) -> DomainResult<Vec<DocumentId>> {
        let is_due = |doc: &SalesDocument| {
            doc.is_active()
                && matches!(
                    doc.status,
                    DocumentStatus::QuoteDraft | DocumentStatus::QuoteSent
                )
                && doc.expiry_date.is_some_and(|expiry| expiry < as_of)
        };

        let candidates = self
            .store
            .list_documents(&DocumentFilter::active().of_type(DocumentType::Quote))?;

        let mut expired = Vec::new();
        for candidate in candidates.iter().filter(|doc| is_due(doc)) {
            let changed = self.locks.with_lock(&candidate.id, || -> DomainResult<_> {
                let doc = self.load(candidate.id)?;
                if !is_due(&doc) {
                    return Ok(false);
                }
                self.set_status(ctx, doc, DocumentStatus::QuoteExpired)?;
                Ok(true)
            })?;
            if changed {
                expired.push(candidate.id);
            }
        }

        tracing::info!(count = expired.len(), "quotes expired");
        Ok(expired)
    }

    // ---- items ----

    /// Add a line to a Quote Draft, Invoice Draft or SO Open document.
    #[tracing::instrument(skip(self, ctx, item), fields(actor = %ctx.actor()))]
    pub fn add_item_to_document(
        &self,
        ctx: &OperationContext,
        document_id: DocumentId,
        item: NewItem,
    ) -> DomainResult<SalesDocumentItem> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut doc = self.load(document_id)?;
            doc.ensure_active()?;
            if !doc.status.is_editable() {
                return Err(DomainError::invalid_state(format!(
                    "cannot add items to document {} in status {}",
                    doc.number, doc.status
                )));
            }

            let product = item.product_id.map(|id| self.product(id)).transpose()?;
            if let Some(product) = &product {
                if !product.can_be_sold() {
                    return Err(DomainError::validation(format!(
                        "product {} is retired",
                        product.sku
                    )));
                }
            }

            let line = self.resolve_line(
                doc.customer_id,
                product.as_ref(),
                item.quantity,
                item.description,
                item.unit_price,
                item.discount_percentage,
            )?;

            let mut items = self.store.items_for(document_id)?;
            let line_no = items
                .iter()
                .map(|existing| existing.line_no)
                .max()
                .unwrap_or(0)
                + 1;

            let added = SalesDocumentItem {
                id: ItemId::new(),
                document_id,
                line_no,
                product_id: item.product_id,
                description: line.description,
                quantity: item.quantity,
                unit_price: line.unit_price,
                discount_percentage: item.discount_percentage,
                line_total: line_total(
                    item.quantity,
                    line.unit_price,
                    item.discount_percentage,
                    self.settings.money_precision,
                )?,
                shipped_quantity: 0,
                note: item.note,
            };
            items.push(added.clone());
            self.totals_for(&items)?;
            self.store.insert_items(vec![added.clone()])?;

            tracing::info!(item_id = %added.id, line_total = %added.line_total, "item added");
            self.publish(
                ctx,
                document_id,
                SalesEvent::ItemAdded(ItemAdded {
                    document_id,
                    item_id: added.id,
                    product_id: added.product_id,
                    quantity: added.quantity,
                    unit_price: added.unit_price,
                    price_overridden: line.price_overridden,
                    line_total: added.line_total,
                    occurred_at: ctx.occurred_at(),
                }),
            );

            self.recalculate_locked(ctx, &mut doc)?;
            Ok(added)
        })
    }

    /// Replace quantity, price, discount, description and note of a line.
    #[tracing::instrument(skip(self, ctx, update), fields(actor = %ctx.actor()))]
    pub fn update_sales_document_item(
        &self,
        ctx: &OperationContext,
        item_id: ItemId,
        update: ItemUpdate,
    ) -> DomainResult<SalesDocumentItem> {
        let document_id = self.item(item_id)?.document_id;
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut item = self.item(item_id)?;
            let mut doc = self.load(document_id)?;
            self.ensure_item_changes_allowed(&doc)?;

            let product = item.product_id.map(|id| self.product(id)).transpose()?;
            let price = match (update.unit_price, &product) {
                (Some(price), _) => Some(price),
                (None, Some(_)) => None,
                (None, None) => Some(item.unit_price),
            };
            let description = update.description.or_else(|| Some(item.description.clone()));

            let line = self.resolve_line(
                doc.customer_id,
                product.as_ref(),
                update.quantity,
                description,
                price,
                update.discount_percentage,
            )?;

            item.quantity = update.quantity;
            item.unit_price = line.unit_price;
            item.discount_percentage = update.discount_percentage;
            item.description = line.description;
            item.note = update.note;
            item.line_total = line_total(
                item.quantity,
                item.unit_price,
                item.discount_percentage,
                self.settings.money_precision,
            )?;
            let items: Vec<_> = self
                .store
                .items_for(document_id)?
                .into_iter()
                .map(|existing| if existing.id == item_id { item.clone() } else { existing })
                .collect();
            self.totals_for(&items)?;
            self.store.update_item(item.clone())?;

            tracing::info!(%item_id, line_total = %item.line_total, "item updated");
            self.publish(
                ctx,
                document_id,
                SalesEvent::ItemUpdated(ItemUpdated {
                    document_id,
                    item_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    discount_percentage: item.discount_percentage,
                    line_total: item.line_total,
                    occurred_at: ctx.occurred_at(),
                }),
            );

            self.recalculate_locked(ctx, &mut doc)?;
            Ok(item)
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn delete_sales_document_item(&self, ctx: &OperationContext, item_id: ItemId) -> DomainResult<()> {
        let document_id = self.item(item_id)?.document_id;
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            self.item(item_id)?;
            let mut doc = self.load(document_id)?;
            self.ensure_item_changes_allowed(&doc)?;

            self.store.delete_item(item_id)?;

            tracing::info!(%item_id, "item removed");
            self.publish(
                ctx,
                document_id,
                SalesEvent::ItemRemoved(ItemRemoved {
                    document_id,
                    item_id,
                    occurred_at: ctx.occurred_at(),
                }),
            );

            self.recalculate_locked(ctx, &mut doc)
        })
    }

    /// Track goods leaving for an order line. Never exceeds the ordered quantity.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn record_item_shipment(
        &self,
        ctx: &OperationContext,
        item_id: ItemId,
        quantity: i64,
    ) -> DomainResult<SalesDocumentItem> {
        if quantity <= 0 {
            return Err(DomainError::validation("shipped quantity must be positive"));
        }
        let document_id = self.item(item_id)?.document_id;
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut item = self.item(item_id)?;
            let doc = self.load(document_id)?;
            doc.ensure_active()?;
            doc.ensure_type(DocumentType::SalesOrder)?;
            doc.ensure_status(&[DocumentStatus::SoOpen, DocumentStatus::SoFulfilled])?;

            let shipped = item.shipped_quantity + quantity;
            if shipped > item.quantity {
                return Err(DomainError::validation(format!(
                    "cannot ship {shipped} of {} ordered",
                    item.quantity
                )));
            }
            item.shipped_quantity = shipped;
            self.store.update_item(item.clone())?;

            tracing::info!(%item_id, shipped, "shipment recorded");
            self.publish(
                ctx,
                document_id,
                SalesEvent::ItemShipped(ItemShipped {
                    document_id,
                    item_id,
                    quantity,
                    shipped_quantity: shipped,
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(item)
        })
    }

    /// Recompute subtotal, taxes and total from the document's lines.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn recalculate_totals(&self, ctx: &OperationContext, document_id: DocumentId) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut doc = self.load(document_id)?;
            doc.ensure_active()?;
            if !doc.status.is_editable() {
                return Err(DomainError::invalid_state(format!(
                    "totals of document {} are final in status {}",
                    doc.number, doc.status
                )));
            }
            self.recalculate_locked(ctx, &mut doc)?;
            Ok(doc)
        })
    }

    // ---- conversions ----

    /// Turn an accepted quote into an open sales order. Inventory is untouched.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn convert_quote_to_sales_order(
        &self,
        ctx: &OperationContext,
        quote_id: DocumentId,
    ) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&quote_id, || -> DomainResult<_> {
            let mut doc = self.load(quote_id)?;
            doc.ensure_active()?;
            doc.ensure_type(DocumentType::Quote)?;
            doc.ensure_status(&[DocumentStatus::QuoteAccepted])?;

            let has_reference = doc
                .reference_number
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty());
            if self.settings.require_reference_for_order && !has_reference {
                return Err(DomainError::validation(format!(
                    "quote {} needs a reference number before it can become an order",
                    doc.number
                )));
            }

            doc.document_type = DocumentType::SalesOrder;
            doc.status = DocumentStatus::SoOpen;
            doc.updated_at = ctx.occurred_at();
            self.store.update_document(doc.clone())?;

            tracing::info!(number = %doc.number, "quote converted to sales order");
            self.publish(
                ctx,
                quote_id,
                SalesEvent::QuoteConverted(QuoteConverted {
                    document_id: quote_id,
                    number: doc.number.clone(),
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(doc)
        })
    }

    /// Ship an open order: every product line leaves stock, then SO Fulfilled.
    ///
    /// All products are resolved before the first stock movement.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn confirm_sales_order(&self, ctx: &OperationContext, document_id: DocumentId) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut doc = self.load(document_id)?;
            doc.ensure_active()?;
            doc.ensure_type(DocumentType::SalesOrder)?;
            doc.ensure_status(&[DocumentStatus::SoOpen])?;

            let items = self.store.items_for(document_id)?;
            if items.is_empty() {
                return Err(DomainError::validation(format!(
                    "sales order {} has no items",
                    doc.number
                )));
            }
            for product_id in items.iter().filter_map(|item| item.product_id) {
                self.product(product_id)?;
            }

            let mut stock_lines = 0;
            for item in &items {
                if let Some(product_id) = item.product_id {
                    self.inventory.adjust_stock(
                        ctx,
                        product_id,
                        -item.quantity,
                        TransactionType::Sale,
                        Some(doc.number.clone()),
                    )?;
                    stock_lines += 1;
                }
            }
            for mut item in items {
                item.shipped_quantity = item.quantity;
                self.store.update_item(item)?;
            }

            doc.status = DocumentStatus::SoFulfilled;
            doc.updated_at = ctx.occurred_at();
            self.store.update_document(doc.clone())?;

            tracing::info!(number = %doc.number, stock_lines, "sales order confirmed");
            self.publish(
                ctx,
                document_id,
                SalesEvent::SalesOrderConfirmed(SalesOrderConfirmed {
                    document_id,
                    number: doc.number.clone(),
                    stock_lines,
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(doc)
        })
    }

    /// Raise a draft invoice from a fulfilled or closed order.
    ///
    /// Lines and totals are copied as they are; the order keeps its status.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn convert_sales_order_to_invoice(
        &self,
        ctx: &OperationContext,
        sales_order_id: DocumentId,
        due_date: Option<NaiveDate>,
    ) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&sales_order_id, || -> DomainResult<_> {
            let order = self.load(sales_order_id)?;
            order.ensure_active()?;
            order.ensure_type(DocumentType::SalesOrder)?;
            order.ensure_status(&[DocumentStatus::SoFulfilled, DocumentStatus::SoClosed])?;

            let today = ctx.today();
            let (due_date, due_date_defaulted) = match due_date {
                Some(date) if date < today => {
                    return Err(DomainError::validation(format!(
                        "due date {date} is before the invoice date {today}"
                    )));
                }
                Some(date) => (date, false),
                None => (add_days(today, self.settings.invoice_due_days)?, true),
            };

            let items = self.store.items_for(sales_order_id)?;
            let invoice_id = DocumentId::new();

            self.locks.with_lock(&invoice_id, || -> DomainResult<_> {
                let invoice = self.insert_numbered(&self.settings.invoice_prefix, |number| SalesDocument {
                    id: invoice_id,
                    number,
                    customer_id: order.customer_id,
                    document_type: DocumentType::Invoice,
                    status: DocumentStatus::InvoiceDraft,
                    created_on: today,
                    created_by: ctx.actor(),
                    expiry_date: None,
                    due_date: Some(due_date),
                    reference_number: order.reference_number.clone(),
                    notes: order.notes.clone(),
                    subtotal: order.subtotal,
                    taxes: order.taxes,
                    total_amount: order.total_amount,
                    related_quote_id: Some(sales_order_id),
                    record_status: RecordStatus::Active,
                    updated_at: ctx.occurred_at(),
                })?;

                let copies = items
                    .into_iter()
                    .map(|item| SalesDocumentItem {
                        id: ItemId::new(),
                        document_id: invoice_id,
                        ..item
                    })
                    .collect();
                self.store.insert_items(copies)?;

                if due_date_defaulted {
                    tracing::warn!(
                        number = %invoice.number,
                        %due_date,
                        "no due date supplied; defaulted to {} days",
                        self.settings.invoice_due_days
                    );
                }
                tracing::info!(number = %invoice.number, order = %order.number, "invoice created");
                self.publish(
                    ctx,
                    invoice_id,
                    SalesEvent::InvoiceCreated(InvoiceCreated {
                        document_id: invoice_id,
                        number: invoice.number.clone(),
                        sales_order_id,
                        due_date,
                        due_date_defaulted,
                        total_amount: invoice.total_amount,
                        occurred_at: ctx.occurred_at(),
                    }),
                );
                Ok(invoice)
            })
        })
    }

    // ---- header ----

    /// Move a document within its own family's transition table.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn update_sales_document_status(
        &self,
        ctx: &OperationContext,
        document_id: DocumentId,
        new_status: DocumentStatus,
    ) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let doc = self.load(document_id)?;
            doc.ensure_active()?;

            if new_status.document_type() != doc.document_type {
                return Err(DomainError::invalid_state(format!(
                    "status {new_status} does not apply to {} {}",
                    doc.document_type, doc.number
                )));
            }
            if new_status == doc.status {
                tracing::debug!(number = %doc.number, status = %doc.status, "status unchanged");
                return Ok(doc);
            }
            if !doc.status.can_transition_to(new_status) {
                return Err(DomainError::invalid_state(format!(
                    "document {} cannot move from {} to {new_status}",
                    doc.number, doc.status
                )));
            }

            self.set_status(ctx, doc, new_status)
        })
    }

    /// Edit notes, reference number and expiry/due date of an editable document.
    #[tracing::instrument(skip(self, ctx, details), fields(actor = %ctx.actor()))]
    pub fn update_document_details(
        &self,
        ctx: &OperationContext,
        document_id: DocumentId,
        details: DocumentDetails,
    ) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut doc = self.load(document_id)?;
            doc.ensure_active()?;
            if !doc.status.is_editable() {
                return Err(DomainError::invalid_state(format!(
                    "document {} cannot be edited in status {}",
                    doc.number, doc.status
                )));
            }
            if details.is_empty() {
                return Ok(doc);
            }

            if let Some(expiry) = details.expiry_date {
                if doc.document_type != DocumentType::Quote {
                    return Err(DomainError::validation("only quotes carry an expiry date"));
                }
                if expiry < doc.created_on {
                    return Err(DomainError::validation(format!(
                        "expiry date {expiry} is before the creation date {}",
                        doc.created_on
                    )));
                }
                doc.expiry_date = Some(expiry);
            }
            if let Some(due) = details.due_date {
                if doc.document_type != DocumentType::Invoice {
                    return Err(DomainError::validation("only invoices carry a due date"));
                }
                if due < doc.created_on {
                    return Err(DomainError::validation(format!(
                        "due date {due} is before the invoice date {}",
                        doc.created_on
                    )));
                }
                doc.due_date = Some(due);
            }
            if let Some(notes) = details.notes {
                doc.notes = Some(notes);
            }
            if let Some(reference) = details.reference_number {
                doc.reference_number = Some(reference);
            }

            doc.updated_at = ctx.occurred_at();
            self.store.update_document(doc.clone())?;

            tracing::info!(number = %doc.number, "document details updated");
            self.publish(
                ctx,
                document_id,
                SalesEvent::DetailsUpdated(DetailsUpdated {
                    document_id,
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(doc)
        })
    }

    /// Soft-retire a document in any status. Retired documents are read-only.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn retire_sales_document(&self, ctx: &OperationContext, document_id: DocumentId) -> DomainResult<SalesDocument> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let mut doc = self.load(document_id)?;
            if !doc.is_active() {
                return Ok(doc);
            }

            doc.record_status = RecordStatus::Retired;
            doc.updated_at = ctx.occurred_at();
            self.store.update_document(doc.clone())?;

            tracing::info!(number = %doc.number, "document retired");
            self.publish(
                ctx,
                document_id,
                SalesEvent::DocumentRetired(DocumentRetired {
                    document_id,
                    number: doc.number.clone(),
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(doc)
        })
    }

    /// Hard-delete a document and its lines.
    ///
    /// A document with lines can only be deleted while draft, rejected,
    /// expired or void; otherwise retire it.
    #[tracing::instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub fn delete_sales_document(&self, ctx: &OperationContext, document_id: DocumentId) -> DomainResult<()> {
        self.locks.with_lock(&document_id, || -> DomainResult<_> {
            let doc = self.load(document_id)?;
            let items = self.store.items_for(document_id)?;
            if !items.is_empty() && !doc.status.is_safely_deletable() {
                return Err(DomainError::invalid_state(format!(
                    "document {} has items and is {}; retire it instead",
                    doc.number, doc.status
                )));
            }

            self.store.delete_document(document_id)?;

            tracing::info!(number = %doc.number, items = items.len(), "document deleted");
            self.publish(
                ctx,
                document_id,
                SalesEvent::DocumentDeleted(DocumentDeleted {
                    document_id,
                    number: doc.number,
                    items_removed: items.len(),
                    occurred_at: ctx.occurred_at(),
                }),
            );
            Ok(())
        })
    }

    // ---- helpers ----

    fn load(&self, document_id: DocumentId) -> DomainResult<SalesDocument> {
        self.store
            .get_document(document_id)?
            .ok_or_else(|| DomainError::not_found("sales document", document_id))
    }

    fn item(&self, item_id: ItemId) -> DomainResult<SalesDocumentItem> {
        self.store
            .get_item(item_id)?
            .ok_or_else(|| DomainError::not_found("sales document item", item_id))
    }

    fn account(&self, account_id: AccountId) -> DomainResult<Account> {
        self.accounts
            .get_account_details(account_id)?
            .ok_or_else(|| DomainError::not_found("account", account_id))
    }

    fn product(&self, product_id: ProductId) -> DomainResult<Product> {
        self.products
            .get_product_details(product_id)?
            .ok_or_else(|| DomainError::not_found("product", product_id))
    }

    fn ensure_item_changes_allowed(&self, doc: &SalesDocument) -> DomainResult<()> {
        doc.ensure_active()?;
        if !doc.status.allows_item_changes() {
            return Err(DomainError::invalid_state(format!(
                "items of document {} cannot change in status {}",
                doc.number, doc.status
            )));
        }
        Ok(())
    }

    /// Validate a line and settle its description and unit price.
    fn resolve_line(
        &self,
        customer_id: AccountId,
        product: Option<&Product>,
        quantity: i64,
        description: Option<String>,
        unit_price: Option<Decimal>,
        discount_percentage: Decimal,
    ) -> DomainResult<ResolvedLine> {
        validate_line(
            quantity,
            unit_price.unwrap_or(Decimal::ZERO),
            discount_percentage,
        )?;

        let description = match (description.filter(|d| !d.trim().is_empty()), product) {
            (Some(description), _) => description,
            (None, Some(product)) => product.line_description().to_string(),
            (None, None) => {
                return Err(DomainError::validation(
                    "a line without a product needs a description",
                ));
            }
        };

        let (unit_price, price_overridden) = match (unit_price, product) {
            (Some(price), _) => (price, true),
            (None, Some(product)) => {
                let customer = self.account(customer_id)?;
                let resolved = self.pricing.price_for_details(&customer, product)?;
                (resolved.unit_price, false)
            }
            (None, None) => {
                return Err(DomainError::price_resolution(
                    "a line without a product needs an explicit price",
                ));
            }
        };

        Ok(ResolvedLine {
            description,
            unit_price,
            price_overridden,
        })
    }

    fn totals_for(&self, items: &[SalesDocumentItem]) -> DomainResult<DocumentTotals> {
        DocumentTotals::compute(
            items,
            self.settings.tax_rate_percent,
            self.settings.money_precision,
        )
    }

    // Caller holds the document lock.
    fn recalculate_locked(&self, ctx: &OperationContext, doc: &mut SalesDocument) -> DomainResult<()> {
        let items = self.store.items_for(doc.id)?;
        let totals = self.totals_for(&items)?;
        doc.apply_totals(totals);
        doc.updated_at = ctx.occurred_at();
        self.store.update_document(doc.clone())?;

        tracing::debug!(
            number = %doc.number,
            subtotal = %totals.subtotal,
            taxes = %totals.taxes,
            total = %totals.total_amount,
            "totals recalculated"
        );
        self.publish(
            ctx,
            doc.id,
            SalesEvent::TotalsRecalculated(TotalsRecalculated {
                document_id: doc.id,
                subtotal: totals.subtotal,
                taxes: totals.taxes,
                total_amount: totals.total_amount,
                occurred_at: ctx.occurred_at(),
            }),
        );
        Ok(())
    }

    // Caller holds the document lock.
    fn set_status(
        &self,
        ctx: &OperationContext,
        mut doc: SalesDocument,
        new_status: DocumentStatus,
    ) -> DomainResult<SalesDocument> {
        let from = doc.status;
        doc.status = new_status;
        doc.updated_at = ctx.occurred_at();
        self.store.update_document(doc.clone())?;

        tracing::info!(number = %doc.number, %from, to = %new_status, "status changed");
        self.publish(
            ctx,
            doc.id,
            SalesEvent::StatusChanged(StatusChanged {
                document_id: doc.id,
                from,
                to: new_status,
                occurred_at: ctx.occurred_at(),
            }),
        );
        Ok(doc)
    }

    /// Allocate the next number for `prefix` and store the document built
    /// from it, both under the numbering lock.
    fn insert_numbered(
        &self,
        prefix: &str,
        build: impl FnOnce(String) -> SalesDocument,
    ) -> DomainResult<SalesDocument> {
        let _guard = self.numbering.lock().unwrap_or_else(PoisonError::into_inner);
        let numbers = self.store.document_numbers()?;
        let number = next_number(
            prefix,
            self.settings.number_width,
            numbers.iter().map(String::as_str),
        );
        let document = build(number);
        self.store.insert_document(document.clone())?;
        Ok(document)
    }

    fn publish(&self, ctx: &OperationContext, document_id: DocumentId, event: SalesEvent) {
        self.events
            .publish(ctx, SALES_DOCUMENT_AGGREGATE, document_id.into(), &event);
    }
}

fn add_days(date: NaiveDate, days: u32) -> DomainResult<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| DomainError::validation(format!("{date} + {days} days is out of range")))
}
