use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradeflow_core::money::{apply_discount, is_valid_percentage, percentage_of, round_money};
use tradeflow_core::{
    AccountId, DocumentId, DomainError, DomainResult, Entity, ItemId, ProductId, RecordStatus,
    UserId,
};

use crate::status::{DocumentStatus, DocumentType};

/// Quote, sales order or invoice header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesDocument {
    pub id: DocumentId,
    /// Human-readable, unique across all documents.
    pub number: String,
    pub customer_id: AccountId,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub created_on: NaiveDate,
    pub created_by: UserId,
    /// Quotes only.
    pub expiry_date: Option<NaiveDate>,
    /// Invoices only.
    pub due_date: Option<NaiveDate>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub taxes: Decimal,
    pub total_amount: Decimal,
    /// On invoices: the sales order it was raised from.
    pub related_quote_id: Option<DocumentId>,
    pub record_status: RecordStatus,
    pub updated_at: DateTime<Utc>,
}

impl SalesDocument {
    pub fn is_active(&self) -> bool {
        self.record_status.is_active()
    }

    /// Reject writes to retired documents.
    pub fn ensure_active(&self) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::invalid_state(format!(
                "document {} is retired",
                self.number
            )));
        }
        Ok(())
    }

    pub fn ensure_type(&self, expected: DocumentType) -> DomainResult<()> {
        if self.document_type != expected {
            return Err(DomainError::invalid_state(format!(
                "document {} is a {}, expected a {}",
                self.number, self.document_type, expected
            )));
        }
        Ok(())
    }

    pub fn ensure_status(&self, allowed: &[DocumentStatus]) -> DomainResult<()> {
        if !allowed.contains(&self.status) {
            return Err(DomainError::invalid_state(format!(
                "document {} is {}",
                self.number, self.status
            )));
        }
        Ok(())
    }

    pub fn apply_totals(&mut self, totals: DocumentTotals) {
        self.subtotal = totals.subtotal;
        self.taxes = totals.taxes;
        self.total_amount = totals.total_amount;
    }

    pub fn totals(&self) -> DocumentTotals {
        DocumentTotals {
            subtotal: self.subtotal,
            taxes: self.taxes,
            total_amount: self.total_amount,
        }
    }
}

impl Entity for SalesDocument {
    type Id = DocumentId;
    const KIND: &'static str = "sales document";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A document line. Product-less lines carry only a description and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesDocumentItem {
    pub id: ItemId,
    pub document_id: DocumentId,
    pub line_no: u32,
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// `0..=100`.
    pub discount_percentage: Decimal,
    pub line_total: Decimal,
    pub shipped_quantity: i64,
    pub note: Option<String>,
}

impl Entity for SalesDocumentItem {
    type Id = ItemId;
    const KIND: &'static str = "sales document item";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Quantity/price/discount checks shared by add and update.
pub fn validate_line(quantity: i64, unit_price: Decimal, discount_percentage: Decimal) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    if unit_price < Decimal::ZERO {
        return Err(DomainError::validation("unit price cannot be negative"));
    }
    if !is_valid_percentage(discount_percentage) {
        return Err(DomainError::validation(
            "discount percentage must be between 0 and 100",
        ));
    }
    Ok(())
}

/// `quantity * unit_price * (1 - discount / 100)`, rounded to `precision`.
pub fn line_total(
    quantity: i64,
    unit_price: Decimal,
    discount_percentage: Decimal,
    precision: u32,
) -> DomainResult<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .and_then(|gross| apply_discount(gross, discount_percentage))
        .map(|net| round_money(net, precision))
        .ok_or_else(|| {
            DomainError::validation(format!(
                "line total of {quantity} x {unit_price} is too large to represent"
            ))
        })
}

/// Document money summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Decimal,
    pub taxes: Decimal,
    pub total_amount: Decimal,
}

impl DocumentTotals {
    pub const ZERO: DocumentTotals = DocumentTotals {
        subtotal: Decimal::ZERO,
        taxes: Decimal::ZERO,
        total_amount: Decimal::ZERO,
    };

    /// Subtotal is the sum of line totals; taxes are `tax_rate_percent` of it.
    pub fn compute(
        items: &[SalesDocumentItem],
        tax_rate_percent: Decimal,
        precision: u32,
    ) -> DomainResult<Self> {
        let out_of_range = || DomainError::validation("document totals are too large to represent");
        let subtotal = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total))
            .ok_or_else(out_of_range)?;
        let taxes = percentage_of(subtotal, tax_rate_percent)
            .map(|taxes| round_money(taxes, precision))
            .ok_or_else(out_of_range)?;
        Ok(Self {
            subtotal,
            taxes,
            total_amount: subtotal.checked_add(taxes).ok_or_else(out_of_range)?,
        })
    }
}

/// Header fields a caller may edit while the document is editable.
/// `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDetails {
    pub notes: Option<String>,
    pub reference_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl DocumentDetails {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
