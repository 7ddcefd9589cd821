//! `tradeflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns)
//! plus the in-memory record table and lock table shared by the store adapters.

pub mod context;
pub mod entity;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod locks;
pub mod money;
pub mod records;

pub use context::OperationContext;
pub use entity::Entity;
pub use error::{DomainError, DomainResult, StoreError};
pub use id::{
    AccountId, DocumentId, ItemId, PricingRuleId, ProductId, PurchaseOrderId, ReplenishmentId,
    UserId,
};
pub use lifecycle::RecordStatus;
pub use locks::KeyedLocks;
pub use records::InMemoryRecords;
