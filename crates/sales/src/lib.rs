//! Sales documents: quotes, sales orders and invoices.
//!
//! One document record moves through the families Quote → Sales Order, and an
//! invoice is raised from a fulfilled order as a new document. Each family has
//! its own status table; totals are always recomputed from the lines.

pub mod document;
pub mod events;
pub mod numbering;
pub mod settings;
pub mod status;
pub mod store;
pub mod workflow;

pub use document::{DocumentDetails, DocumentTotals, SalesDocument, SalesDocumentItem, line_total};
pub use events::{SALES_DOCUMENT_AGGREGATE, SalesEvent};
pub use settings::SalesSettings;
pub use status::{DocumentStatus, DocumentType};
pub use store::{DocumentFilter, InMemorySalesDocumentStore, SalesDocumentStore};
pub use workflow::{ItemUpdate, NewItem, SalesDocumentWorkflow};
