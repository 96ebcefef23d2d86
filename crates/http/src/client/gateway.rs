//! Authenticated fetch gateway
//!
//! Every call names the session slot it acts for. The slot's access token is
//! attached as a bearer credential; an exactly-401 answer triggers one
//! coordinated refresh and a single retry with the new token.

use super::config::ClientConfig;
use super::error::ClientError;
use super::refresh::{RefreshCoordinator, TokenRefresher};
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{Claims, SessionSlot, TokenVault};

/// Method, headers and body of an outbound request.
///
/// Descriptors are reusable: the gateway reads them for the initial attempt
/// and again for the retry, and never modifies them.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Set a header; caller headers take precedence over the gateway defaults
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Raw request body
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ClientError> {
        self.body = Some(Bytes::from(serde_json::to_vec(value)?));
        Ok(self)
    }
}

/// Builder for [`Gateway`]
#[derive(Default)]
pub struct GatewayBuilder {
    base_url: Option<String>,
    config: Option<ClientConfig>,
    timeout: Option<Duration>,
    refresh_timeout: Option<Duration>,
    user_agent: Option<String>,
    vault: Option<TokenVault>,
    coordinator: Option<RefreshCoordinator>,
}

impl GatewayBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Start from a complete configuration
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound a single refresh call
    #[must_use]
    pub const fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Token storage the gateway reads from and the refresher writes to
    #[must_use]
    pub fn vault(mut self, vault: TokenVault) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Share a refresh coordinator with other gateways over the same storage
    #[must_use]
    pub fn coordinator(mut self, coordinator: RefreshCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<Gateway, ClientError> {
        let mut config = match (self.config, self.base_url) {
            (_, Some(base_url)) => ClientConfig::new(base_url)?,
            (Some(config), None) => config,
            (None, None) => {
                return Err(ClientError::Configuration("base_url is required".into()));
            }
        };
        if let Some(timeout) = self.timeout {
            config.timeout = Some(timeout);
        }
        if let Some(refresh_timeout) = self.refresh_timeout {
            config.refresh_timeout = refresh_timeout;
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }

        let vault = self
            .vault
            .ok_or_else(|| ClientError::Configuration("token vault is required".into()))?;

        let http = build_http_client(&config)?;
        let config = Arc::new(config);
        let refresher = TokenRefresher::new(
            http.clone(),
            Arc::clone(&config),
            vault.clone(),
            self.coordinator.unwrap_or_default(),
        );

        Ok(Gateway {
            http,
            config,
            vault,
            refresher,
        })
    }
}

fn build_http_client(config: &ClientConfig) -> Result<Client, ClientError> {
    let builder = ClientBuilder::new().user_agent(config.user_agent.clone());

    #[cfg(not(target_arch = "wasm32"))]
    let builder = {
        let mut builder = builder.cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    };

    Ok(builder.build()?)
}

/// Wraps outbound requests with the slot's bearer token and refresh-and-retry
#[derive(Clone, Debug)]
pub struct Gateway {
    http: Client,
    config: Arc<ClientConfig>,
    vault: TokenVault,
    refresher: TokenRefresher,
}

impl Gateway {
    /// Create a new gateway builder
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Create a gateway with its own refresh coordinator
    pub fn new(config: ClientConfig, vault: TokenVault) -> Result<Self, ClientError> {
        Self::builder().config(config).vault(vault).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.api_base_url
    }

    pub fn vault(&self) -> &TokenVault {
        &self.vault
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        self.refresher.coordinator()
    }

    /// Underlying HTTP client, for calls that must not carry a slot token
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Issue a request on behalf of `slot`.
    ///
    /// Returns the response as received unless it is a 401, in which case the
    /// slot's token is refreshed and the request re-issued exactly once; the
    /// retry's response is returned whatever its status. Transport errors and
    /// refresh failures are returned without retrying.
    #[instrument(skip(self, descriptor), fields(slot = %slot, method = %descriptor.method))]
    pub async fn request(
        &self,
        target: &str,
        descriptor: &RequestDescriptor,
        slot: SessionSlot,
    ) -> Result<Response, ClientError> {
        let url = self.config.url(target);
        let token = self.vault.access_token(slot);

        let role = token.as_deref().and_then(|token| match Claims::decode(token) {
            Ok(claims) => claims.role,
            Err(e) => {
                warn!(%slot, error = %e, "stored access token is not decodable, sending it anyway");
                None
            }
        });

        let response = self.send(&url, descriptor, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(%slot, ?role, %url, "request unauthorized, refreshing access token");
        let fresh = self.refresher.refresh(slot).await?;

        let retry = self.send(&url, descriptor, Some(&fresh)).await?;
        debug!(%slot, status = retry.status().as_u16(), "retried request with refreshed token");
        Ok(retry)
    }

    /// Issue a request and decode a successful JSON body
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        target: &str,
        descriptor: &RequestDescriptor,
        slot: SessionSlot,
    ) -> Result<T, ClientError> {
        let response = self.request(target, descriptor, slot).await?;
        decode_json(response).await
    }

    async fn send(
        &self,
        url: &str,
        descriptor: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self
            .http
            .request(descriptor.method.clone(), url)
            .headers(merge_headers(&descriptor.headers, token));

        if let Some(body) = &descriptor.body {
            request = request.body(body.clone());
        }

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        Ok(request.send().await?)
    }
}

/// Gateway defaults with the caller's headers laid over them
fn merge_headers(caller: &HeaderMap, token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("access token contains characters not allowed in a header"),
        }
    }

    for name in caller.keys() {
        headers.remove(name);
    }
    for (name, value) in caller {
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Decode a 2xx JSON body, mapping other statuses to [`ClientError`]
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    } else {
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        Err(ClientError::from_status(status, message))
    }
}
