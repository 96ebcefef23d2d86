//! Storefront HTTP client

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod refresh;

pub use api::StorefrontApi;
pub use config::ClientConfig;
pub use error::{ClientError, RefreshError};
pub use gateway::{Gateway, GatewayBuilder, RequestDescriptor};
pub use refresh::{RefreshCoordinator, TokenRefresher};
