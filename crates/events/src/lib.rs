//! Domain events and their distribution.
//!
//! Workflows publish a typed event for every committed state change, including
//! the decisions they take on the caller's behalf (skipped replenishment,
//! defaulted due dates), so those decisions are observable rather than silent.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod publisher;

pub use bus::{BusError, EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
pub use publisher::{EventPublisher, JsonEnvelope, SharedEventBus};
