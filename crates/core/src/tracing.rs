//! Tracing setup shared by the storefront crates
//!
//! The `tracing` macros are used directly throughout; this module only holds
//! subscriber configuration for native hosts. Browser builds install their
//! console writer from the frontend crate.

#[cfg(all(feature = "tracing-init", not(target_arch = "wasm32")))]
pub mod config;
#[cfg(all(feature = "tracing-init", not(target_arch = "wasm32")))]
pub mod init;

#[cfg(all(feature = "tracing-init", not(target_arch = "wasm32")))]
pub use config::InstrumentationConfig;
#[cfg(all(feature = "tracing-init", not(target_arch = "wasm32")))]
pub use init::{init_default, init_dev, init_tracing};
