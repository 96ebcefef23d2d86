//! Browser bindings: `localStorage` persistence, page origin and navigation

use crate::config::AppConfig;
use crate::session::Navigator;
use storefront_core::{CoreError, CoreResult, KeyValueStore};
use wasm_bindgen::JsValue;
use web_sys::{Storage, window};

/// [`KeyValueStore`] over `window.localStorage`.
///
/// The storage handle is looked up on every call; a page without a window or
/// with storage disabled reads as empty and fails writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn local_storage() -> CoreResult<Storage> {
        window()
            .ok_or_else(|| CoreError::storage("no window"))?
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| CoreError::storage("localStorage is unavailable"))
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::local_storage().ok()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        Self::local_storage()?.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        Self::local_storage()?.remove_item(key).map_err(js_error)
    }
}

fn js_error(value: JsValue) -> CoreError {
    CoreError::storage(format!("{value:?}"))
}

/// Base URL for API calls: `STOREFRONT_API_BASE_URL` when set at build time,
/// else the page's origin, else empty
pub fn api_base_url() -> String {
    AppConfig::resolve_api_base_url(AppConfig::API_BASE_URL, || {
        window().and_then(|window| window.location().origin().ok())
    })
}

/// Navigates by assigning `window.location`
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, route: &str) {
        let Some(window) = window() else {
            warn!(route, "no window to navigate");
            return;
        };
        if let Err(e) = window.location().set_href(route) {
            warn!(route, error = ?e, "navigation failed");
        }
    }
}
