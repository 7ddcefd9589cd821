//! Infrastructure layer: configuration and in-memory wiring of the services.

pub mod backoffice;
pub mod config;

pub use backoffice::Backoffice;
pub use config::{AppConfig, SalesConfig};
