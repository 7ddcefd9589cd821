//! Accounts (customers and vendors), pricing rules and payment terms.
//!
//! Account CRUD lives outside the workflow engine; this crate only models what
//! the workflows read and exposes the lookup contract.

pub mod account;
pub mod directory;

pub use account::{Account, AccountType, PaymentTerm, PricingRule};
pub use directory::{AccountDirectory, InMemoryAccountDirectory};
