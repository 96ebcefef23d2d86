//! Typed storefront endpoints

use super::error::ClientError;
use super::gateway::{Gateway, RequestDescriptor, decode_json};
use crate::types::{LoginRequest, LoginResponse, LogoutRequest};
use reqwest::header;
use serde_json::Value as JsonValue;
use storefront_core::SessionSlot;

/// Backend path that records a logout
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Credential login endpoint for a slot
pub const fn login_path(slot: SessionSlot) -> &'static str {
    match slot {
        SessionSlot::Customer => "/login",
        SessionSlot::AdminOrEmployee => "/auth/login",
    }
}

/// Storefront backend API
#[derive(Clone, Debug)]
pub struct StorefrontApi {
    gateway: Gateway,
}

impl StorefrontApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Exchange email and password for a token pair (public endpoint)
    pub async fn login(
        &self,
        slot: SessionSlot,
        request: &LoginRequest,
    ) -> Result<LoginResponse, ClientError> {
        let req = self
            .gateway
            .http()
            .post(self.gateway.config().url(login_path(slot)))
            .json(request);

        #[cfg(target_arch = "wasm32")]
        let req = req.fetch_credentials_include();

        decode_json(req.send().await?).await
    }

    /// Tell the backend the account signed out.
    ///
    /// Sent with the given token directly; an expired token is not refreshed
    /// for a logout.
    pub async fn logout(&self, access_token: &str, subject_id: &str) -> Result<(), ClientError> {
        let req = self
            .gateway
            .http()
            .post(self.gateway.config().url(LOGOUT_PATH))
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .json(&LogoutRequest {
                id: subject_id.to_string(),
            });

        #[cfg(target_arch = "wasm32")]
        let req = req.fetch_credentials_include();

        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }

    /// Current account as seen by the backend
    pub async fn me(&self, slot: SessionSlot) -> Result<JsonValue, ClientError> {
        self.gateway
            .execute_json("/me", &RequestDescriptor::get(), slot)
            .await
    }
}
