//! Document types and the per-family status machine.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Kind of sales document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum DocumentType {
    Quote,
    #[serde(rename = "Sales Order")]
    #[strum(serialize = "Sales Order")]
    SalesOrder,
    Invoice,
}

/// Document status. Each status belongs to exactly one [`DocumentType`].
///
/// Serialises to the persisted labels (`"Quote Draft"`, `"SO Open"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum DocumentStatus {
    #[serde(rename = "Quote Draft")]
    #[strum(serialize = "Quote Draft")]
    QuoteDraft,
    #[serde(rename = "Quote Sent")]
    #[strum(serialize = "Quote Sent")]
    QuoteSent,
    #[serde(rename = "Quote Accepted")]
    #[strum(serialize = "Quote Accepted")]
    QuoteAccepted,
    #[serde(rename = "Quote Rejected")]
    #[strum(serialize = "Quote Rejected")]
    QuoteRejected,
    #[serde(rename = "Quote Expired")]
    #[strum(serialize = "Quote Expired")]
    QuoteExpired,
    #[serde(rename = "SO Open")]
    #[strum(serialize = "SO Open")]
    SoOpen,
    #[serde(rename = "SO Fulfilled")]
    #[strum(serialize = "SO Fulfilled")]
    SoFulfilled,
    #[serde(rename = "SO Closed")]
    #[strum(serialize = "SO Closed")]
    SoClosed,
    #[serde(rename = "Invoice Draft")]
    #[strum(serialize = "Invoice Draft")]
    InvoiceDraft,
    #[serde(rename = "Invoice Sent")]
    #[strum(serialize = "Invoice Sent")]
    InvoiceSent,
    #[serde(rename = "Invoice Partially Paid")]
    #[strum(serialize = "Invoice Partially Paid")]
    InvoicePartiallyPaid,
    #[serde(rename = "Invoice Paid")]
    #[strum(serialize = "Invoice Paid")]
    InvoicePaid,
    #[serde(rename = "Invoice Void")]
    #[strum(serialize = "Invoice Void")]
    InvoiceVoid,
}

use DocumentStatus::*;

impl DocumentStatus {
    /// The document family this status belongs to.
    pub fn document_type(self) -> DocumentType {
        match self {
            QuoteDraft | QuoteSent | QuoteAccepted | QuoteRejected | QuoteExpired => {
                DocumentType::Quote
            }
            SoOpen | SoFulfilled | SoClosed => DocumentType::SalesOrder,
            InvoiceDraft | InvoiceSent | InvoicePartiallyPaid | InvoicePaid | InvoiceVoid => {
                DocumentType::Invoice
            }
        }
    }

    /// Statuses reachable through a plain status update.
    ///
    /// Sales-order statuses other than Closed are entered only by conversion
    /// and confirmation, so they never appear here.
    pub fn allowed_transitions(self) -> &'static [DocumentStatus] {
        match self {
            QuoteDraft => &[QuoteSent, QuoteAccepted, QuoteRejected, QuoteExpired],
            QuoteSent => &[QuoteAccepted, QuoteRejected, QuoteExpired],
            QuoteAccepted => &[QuoteRejected, QuoteExpired],
            SoFulfilled => &[SoClosed],
            InvoiceDraft => &[InvoiceSent, InvoiceVoid],
            InvoiceSent => &[InvoicePartiallyPaid, InvoicePaid, InvoiceVoid],
            InvoicePartiallyPaid => &[InvoicePaid, InvoiceVoid],
            InvoicePaid => &[InvoiceVoid],
            SoOpen | QuoteRejected | QuoteExpired | SoClosed | InvoiceVoid => &[],
        }
    }

    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// No status can follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, QuoteRejected | QuoteExpired | SoClosed | InvoiceVoid)
    }

    /// Items may be added.
    pub fn is_editable(self) -> bool {
        matches!(self, QuoteDraft | InvoiceDraft | SoOpen)
    }

    /// Existing items may be changed or removed.
    pub fn allows_item_changes(self) -> bool {
        matches!(self, QuoteDraft | InvoiceDraft)
    }

    /// A document with items may be hard-deleted.
    pub fn is_safely_deletable(self) -> bool {
        matches!(
            self,
            QuoteDraft | QuoteRejected | QuoteExpired | InvoiceDraft | InvoiceVoid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const ALL: [DocumentStatus; 13] = [
        QuoteDraft,
        QuoteSent,
        QuoteAccepted,
        QuoteRejected,
        QuoteExpired,
        SoOpen,
        SoFulfilled,
        SoClosed,
        InvoiceDraft,
        InvoiceSent,
        InvoicePartiallyPaid,
        InvoicePaid,
        InvoiceVoid,
    ];

    #[test]
    fn labels_match_persisted_literals() {
        assert_eq!(SoOpen.to_string(), "SO Open");
        assert_eq!(
            serde_json::to_string(&InvoicePartiallyPaid).unwrap(),
            "\"Invoice Partially Paid\""
        );
        assert_eq!(
            serde_json::to_string(&DocumentType::SalesOrder).unwrap(),
            "\"Sales Order\""
        );
        assert_eq!(DocumentStatus::from_str("Quote Expired").unwrap(), QuoteExpired);

        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn paid_invoice_can_only_be_voided() {
        assert!(!InvoicePaid.can_transition_to(InvoiceDraft));
        assert!(!InvoicePaid.can_transition_to(InvoiceSent));
        assert!(InvoicePaid.can_transition_to(InvoiceVoid));
    }

    #[test]
    fn transitions_never_leave_the_family() {
        for status in ALL {
            for next in status.allowed_transitions() {
                assert_eq!(next.document_type(), status.document_type(), "{status} -> {next}");
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        for status in ALL {
            assert_eq!(status.is_terminal(), status.allowed_transitions().is_empty() && status != SoOpen);
        }
    }

    #[test]
    fn item_changes_are_a_subset_of_editable() {
        for status in ALL {
            if status.allows_item_changes() {
                assert!(status.is_editable());
            }
        }
        assert!(SoOpen.is_editable());
        assert!(!SoOpen.allows_item_changes());
    }
}
