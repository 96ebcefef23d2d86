//! Frontend configuration

/// Application-wide constants
pub struct AppConfig;

impl AppConfig {
    /// Storage key holding the serialized cart
    pub const CART_STORAGE_KEY: &'static str = "cart";

    /// API base URL baked in at build time from `STOREFRONT_API_BASE_URL`
    pub const API_BASE_URL: Option<&'static str> = option_env!("STOREFRONT_API_BASE_URL");

    /// Resolve the API base URL: a configured, non-blank value wins, otherwise
    /// the page origin is asked for (empty when there is none).
    pub fn resolve_api_base_url(
        configured: Option<&str>,
        origin: impl FnOnce() -> Option<String>,
    ) -> String {
        match configured.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) => base.to_string(),
            None => origin().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_base_wins_over_origin() {
        let base = AppConfig::resolve_api_base_url(Some("https://api.example.com"), || {
            panic!("origin must not be consulted")
        });
        assert_eq!(base, "https://api.example.com");
    }

    #[test]
    fn test_falls_back_to_origin() {
        let origin = || Some("http://localhost:5173".to_string());
        assert_eq!(
            AppConfig::resolve_api_base_url(None, origin),
            "http://localhost:5173"
        );
        assert_eq!(
            AppConfig::resolve_api_base_url(Some("  "), origin),
            "http://localhost:5173"
        );
        assert_eq!(AppConfig::resolve_api_base_url(None, || None), "");
    }
}
