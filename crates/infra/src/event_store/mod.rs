//! Append-only event store boundary.
//!
//! This module defines an infrastructure-facing abstraction for storing and
//! loading per-aggregate event streams without making any storage
//! assumptions. The optimistic append is the engine's single atomic
//! check-and-insert primitive: every uniqueness invariant reduces to an
//! append at expected version 0 on a deterministically-keyed stream.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
