//! Browser-facing storefront state
//!
//! Session stores for the customer and staff slots, the persisted cart, and
//! [`Storefront`], which wires them over one backing store and API client.
//! In the browser, `Storefront::in_browser` is the startup hook: it installs
//! console logging (`logging::init`), binds `localStorage` and resolves the API
//! base URL.

#[macro_use]
extern crate tracing;

#[cfg(target_arch = "wasm32")]
pub mod browser;
pub mod cart;
pub mod config;
pub mod context;
#[cfg(target_arch = "wasm32")]
pub mod logging;
pub mod session;

pub use cart::CartStore;
pub use config::AppConfig;
pub use context::Storefront;
pub use session::{Navigator, NoopNavigator, SessionError, SessionStore};
