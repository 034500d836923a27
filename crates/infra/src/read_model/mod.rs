//! Scoped read model storage abstractions.

pub mod scoped_store;

pub use scoped_store::{InMemoryScopedStore, ScopedStore};
