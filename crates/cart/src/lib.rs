//! Shopping cart domain module (event-sourced).
//!
//! One cart per user holding the pre-purchase course selection, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod cart;

pub use cart::{
    AddItem, Cart, CartCommand, CartEvent, CartId, CartItem, ItemAdded, ItemRemoved, RemoveItem,
};
