//! Storefront HTTP client
//!
//! Outbound calls to the storefront backend: an authenticated fetch gateway
//! that attaches the slot's bearer token and recovers from an expired token
//! with a single coordinated refresh, plus typed endpoints built on it.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod types;

pub use client::{
    ClientConfig, ClientError, Gateway, GatewayBuilder, RefreshCoordinator, RefreshError,
    RequestDescriptor, StorefrontApi, TokenRefresher,
};
