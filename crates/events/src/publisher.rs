//! Typed publishing on top of a JSON envelope bus.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use tradeflow_core::OperationContext;

use crate::bus::EventBus;
use crate::envelope::EventEnvelope;
use crate::event::Event;
use crate::in_memory_bus::InMemoryEventBus;

/// Envelope type carried on the shared bus.
pub type JsonEnvelope = EventEnvelope<JsonValue>;

/// Shared, type-erased bus handle.
pub type SharedEventBus = Arc<dyn EventBus<JsonEnvelope>>;

/// Publishes typed domain events as JSON envelopes.
///
/// Publication happens after the state change is stored. A failure to publish
/// is logged and swallowed: the change itself has already been committed.
#[derive(Clone)]
pub struct EventPublisher {
    bus: SharedEventBus,
}

impl core::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventPublisher").finish_non_exhaustive()
    }
}

impl EventPublisher {
    pub fn new(bus: SharedEventBus) -> Self {
        Self { bus }
    }

    /// Publisher backed by a fresh in-memory bus; the bus is returned so the
    /// caller can subscribe.
    pub fn in_memory() -> (Self, Arc<InMemoryEventBus<JsonEnvelope>>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (Self::new(bus.clone()), bus)
    }

    pub fn bus(&self) -> &SharedEventBus {
        &self.bus
    }

    pub fn publish<E>(
        &self,
        ctx: &OperationContext,
        aggregate_type: &'static str,
        aggregate_id: Uuid,
        event: &E,
    ) where
        E: Event + Serialize,
    {
        let envelope = match EventEnvelope::from_typed(aggregate_id, aggregate_type, ctx.actor(), event)
        {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    %aggregate_id,
                    "failed to serialise event: {err}"
                );
                return;
            }
        };

        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(
                event_type = event.event_type(),
                %aggregate_id,
                "failed to publish event: {err}"
            );
        }
    }
}
