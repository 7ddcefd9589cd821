//! Sales document persistence contract.

use tradeflow_core::{
    AccountId, DocumentId, InMemoryRecords, ItemId, RecordStatus, StoreError,
};

use crate::document::{SalesDocument, SalesDocumentItem};
use crate::status::{DocumentStatus, DocumentType};

/// Listing criteria; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub customer_id: Option<AccountId>,
    pub document_type: Option<DocumentType>,
    pub status: Option<DocumentStatus>,
    pub record_status: Option<RecordStatus>,
}

impl DocumentFilter {
    /// Active documents only.
    pub fn active() -> Self {
        Self {
            record_status: Some(RecordStatus::Active),
            ..Self::default()
        }
    }

    pub fn customer(mut self, customer_id: AccountId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn of_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, document: &SalesDocument) -> bool {
        self.customer_id.is_none_or(|id| document.customer_id == id)
            && self.document_type.is_none_or(|t| document.document_type == t)
            && self.status.is_none_or(|s| document.status == s)
            && self.record_status.is_none_or(|r| document.record_status == r)
    }
}

pub trait SalesDocumentStore: Send + Sync {
    /// Fails with `Duplicate` if the id or the number is taken.
    fn insert_document(&self, document: SalesDocument) -> Result<(), StoreError>;
    fn update_document(&self, document: SalesDocument) -> Result<(), StoreError>;
    fn get_document(&self, id: DocumentId) -> Result<Option<SalesDocument>, StoreError>;
    /// Removes the document and its items.
    fn delete_document(&self, id: DocumentId) -> Result<(), StoreError>;
    /// Matching documents ordered by number.
    fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<SalesDocument>, StoreError>;
    /// Every number issued so far, including retired documents.
    fn document_numbers(&self) -> Result<Vec<String>, StoreError>;

    fn insert_items(&self, items: Vec<SalesDocumentItem>) -> Result<(), StoreError>;
    fn update_item(&self, item: SalesDocumentItem) -> Result<(), StoreError>;
    fn get_item(&self, id: ItemId) -> Result<Option<SalesDocumentItem>, StoreError>;
    fn delete_item(&self, id: ItemId) -> Result<(), StoreError>;
    /// Items of a document ordered by line number.
    fn items_for(&self, document_id: DocumentId) -> Result<Vec<SalesDocumentItem>, StoreError>;
}

/// In-memory sales document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySalesDocumentStore {
    documents: InMemoryRecords<SalesDocument>,
    items: InMemoryRecords<SalesDocumentItem>,
}

impl InMemorySalesDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SalesDocumentStore for InMemorySalesDocumentStore {
    fn insert_document(&self, document: SalesDocument) -> Result<(), StoreError> {
        let clash = self.documents.filter(|d| d.number == document.number)?;
        if !clash.is_empty() {
            return Err(StoreError::Duplicate(format!(
                "sales document number {}",
                document.number
            )));
        }
        self.documents.insert(document)
    }

    fn update_document(&self, document: SalesDocument) -> Result<(), StoreError> {
        self.documents.update(document)
    }

    fn get_document(&self, id: DocumentId) -> Result<Option<SalesDocument>, StoreError> {
        self.documents.get(&id)
    }

    fn delete_document(&self, id: DocumentId) -> Result<(), StoreError> {
        if self.documents.remove(&id)?.is_none() {
            return Err(StoreError::Missing(format!("sales document {id}")));
        }
        self.items.remove_where(|item| item.document_id == id)?;
        Ok(())
    }

    fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<SalesDocument>, StoreError> {
        let mut documents = self.documents.filter(|d| filter.matches(d))?;
        documents.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(documents)
    }

    fn document_numbers(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .documents
            .list()?
            .into_iter()
            .map(|d| d.number)
            .collect())
    }

    fn insert_items(&self, items: Vec<SalesDocumentItem>) -> Result<(), StoreError> {
        self.items.insert_all(items)
    }

    fn update_item(&self, item: SalesDocumentItem) -> Result<(), StoreError> {
        self.items.update(item)
    }

    fn get_item(&self, id: ItemId) -> Result<Option<SalesDocumentItem>, StoreError> {
        self.items.get(&id)
    }

    fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        match self.items.remove(&id)? {
            Some(_) => Ok(()),
            None => Err(StoreError::Missing(format!("sales document item {id}"))),
        }
    }

    fn items_for(&self, document_id: DocumentId) -> Result<Vec<SalesDocumentItem>, StoreError> {
        let mut items = self.items.filter(|item| item.document_id == document_id)?;
        items.sort_by_key(|item| item.line_no);
        Ok(items)
    }
}
