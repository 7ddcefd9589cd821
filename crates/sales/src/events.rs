use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::{AccountId, DocumentId, ItemId, ProductId};
use tradeflow_events::Event;

use crate::status::DocumentStatus;

/// Aggregate type used on sales envelopes (aggregate id = document id).
pub const SALES_DOCUMENT_AGGREGATE: &str = "sales.document";

/// Event: QuoteCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCreated {
    pub document_id: DocumentId,
    pub number: String,
    pub customer_id: AccountId,
    pub expiry_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub document_id: DocumentId,
    pub item_id: ItemId,
    pub product_id: Option<ProductId>,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// The caller supplied the price; the pricing engine was not consulted.
    pub price_overridden: bool,
    pub line_total: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub document_id: DocumentId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub discount_percentage: Decimal,
    pub line_total: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub document_id: DocumentId,
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemShipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemShipped {
    pub document_id: DocumentId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub shipped_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TotalsRecalculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsRecalculated {
    pub document_id: DocumentId,
    pub subtotal: Decimal,
    pub taxes: Decimal,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteConverted (quote became a sales order, same id and number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteConverted {
    pub document_id: DocumentId,
    pub number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SalesOrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderConfirmed {
    pub document_id: DocumentId,
    pub number: String,
    /// Lines that moved stock (product lines only).
    pub stock_lines: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub document_id: DocumentId,
    pub number: String,
    pub sales_order_id: DocumentId,
    pub due_date: NaiveDate,
    /// No due date was supplied; the configured default applied.
    pub due_date_defaulted: bool,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub document_id: DocumentId,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub document_id: DocumentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentRetired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRetired {
    pub document_id: DocumentId,
    pub number: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDeleted {
    pub document_id: DocumentId,
    pub number: String,
    pub items_removed: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesEvent {
    QuoteCreated(QuoteCreated),
    ItemAdded(ItemAdded),
    ItemUpdated(ItemUpdated),
    ItemRemoved(ItemRemoved),
    ItemShipped(ItemShipped),
    TotalsRecalculated(TotalsRecalculated),
    QuoteConverted(QuoteConverted),
    SalesOrderConfirmed(SalesOrderConfirmed),
    InvoiceCreated(InvoiceCreated),
    StatusChanged(StatusChanged),
    DetailsUpdated(DetailsUpdated),
    DocumentRetired(DocumentRetired),
    DocumentDeleted(DocumentDeleted),
}

impl Event for SalesEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesEvent::QuoteCreated(_) => "sales.quote.created",
            SalesEvent::ItemAdded(_) => "sales.item.added",
            SalesEvent::ItemUpdated(_) => "sales.item.updated",
            SalesEvent::ItemRemoved(_) => "sales.item.removed",
            SalesEvent::ItemShipped(_) => "sales.item.shipped",
            SalesEvent::TotalsRecalculated(_) => "sales.document.totals_recalculated",
            SalesEvent::QuoteConverted(_) => "sales.quote.converted",
            SalesEvent::SalesOrderConfirmed(_) => "sales.order.confirmed",
            SalesEvent::InvoiceCreated(_) => "sales.invoice.created",
            SalesEvent::StatusChanged(_) => "sales.document.status_changed",
            SalesEvent::DetailsUpdated(_) => "sales.document.details_updated",
            SalesEvent::DocumentRetired(_) => "sales.document.retired",
            SalesEvent::DocumentDeleted(_) => "sales.document.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesEvent::QuoteCreated(e) => e.occurred_at,
            SalesEvent::ItemAdded(e) => e.occurred_at,
            SalesEvent::ItemUpdated(e) => e.occurred_at,
            SalesEvent::ItemRemoved(e) => e.occurred_at,
            SalesEvent::ItemShipped(e) => e.occurred_at,
            SalesEvent::TotalsRecalculated(e) => e.occurred_at,
            SalesEvent::QuoteConverted(e) => e.occurred_at,
            SalesEvent::SalesOrderConfirmed(e) => e.occurred_at,
            SalesEvent::InvoiceCreated(e) => e.occurred_at,
            SalesEvent::StatusChanged(e) => e.occurred_at,
            SalesEvent::DetailsUpdated(e) => e.occurred_at,
            SalesEvent::DocumentRetired(e) => e.occurred_at,
            SalesEvent::DocumentDeleted(e) => e.occurred_at,
        }
    }
}
