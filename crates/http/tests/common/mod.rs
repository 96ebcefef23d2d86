//! Shared helpers for the HTTP client tests

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::tracing::InstrumentationConfig;
use storefront_core::{MemoryStore, SessionSlot, TokenVault};
use storefront_http::{Gateway, RefreshCoordinator};

/// Unsigned JWT carrying the given claims
pub fn mint_token(id: &str, role: Option<&str>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = match role {
        Some(role) => json!({"id": id, "role": role, "exp": 4_102_444_800_i64}),
        None => json!({"id": id, "exp": 4_102_444_800_i64}),
    };
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.test-signature")
}

/// Install the test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = storefront_core::tracing::init_tracing(&InstrumentationConfig {
        service_name: "storefront-http-tests".to_string(),
        log_level: "storefront_http=debug".to_string(),
        json: false,
    });
}

pub struct Harness {
    pub store: MemoryStore,
    pub vault: TokenVault,
    pub gateway: Gateway,
}

impl Harness {
    pub fn new(base_url: &str) -> Self {
        Self::with_coordinator(base_url, RefreshCoordinator::new())
    }

    pub fn with_coordinator(base_url: &str, coordinator: RefreshCoordinator) -> Self {
        init_tracing();
        let store = MemoryStore::new();
        let vault = TokenVault::new(Arc::new(store.clone()));
        let gateway = Gateway::builder()
            .base_url(base_url)
            .refresh_timeout(Duration::from_secs(5))
            .vault(vault.clone())
            .coordinator(coordinator)
            .build()
            .expect("gateway should build");
        Self {
            store,
            vault,
            gateway,
        }
    }

    pub fn sign_in(&self, slot: SessionSlot, access: &str, refresh: Option<&str>) {
        self.vault
            .store(slot, access, refresh)
            .expect("memory store never fails");
    }
}
