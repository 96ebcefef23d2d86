//! Storefront core types and utilities
//!
//! Identity claims, session slots, the key/value storage seam shared by the
//! session and cart stores, and the cart model.

pub mod cart;
pub mod error;
pub mod identity;
pub mod storage;
pub mod tracing;

pub use cart::{Cart, CartItem, Product};
pub use error::{CoreError, CoreResult};
pub use identity::{Claims, Role, SessionSlot, SessionSnapshot};
pub use storage::{KeyValueStore, MemoryStore, TokenVault};
