//! `coursemart-events` — event mechanics shared by the engine.
//!
//! Pure pub/sub and envelope types; no storage, no business rules.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
