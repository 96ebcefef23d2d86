//! Observable session state for one slot
//!
//! A [`SessionStore`] mirrors the tokens persisted for its slot as a
//! [`SessionSnapshot`] and republishes it on every login, logout and storage
//! re-check. Subscribers get a `tokio::sync::watch` receiver, which always
//! holds the latest snapshot.

use std::future::Future;
use std::sync::Arc;
use storefront_core::{CoreError, SessionSlot, SessionSnapshot, TokenVault};
use storefront_http::types::LoginRequest;
use storefront_http::{ClientError, StorefrontApi};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl From<CoreError> for SessionError {
    fn from(err: CoreError) -> Self {
        if err.is_malformed_token() {
            Self::MalformedToken(err.to_string())
        } else {
            Self::Storage(err.to_string())
        }
    }
}

/// Routing collaborator used to send the user to a login surface
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that goes nowhere; for hosts without routing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: &str) {
        debug!(route, "navigation requested without a router");
    }
}

#[derive(Clone)]
pub struct SessionStore {
    slot: SessionSlot,
    vault: TokenVault,
    api: StorefrontApi,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionStore {
    /// Create a store for `slot` and hydrate it from persisted tokens
    pub fn new(
        slot: SessionSlot,
        vault: TokenVault,
        api: StorefrontApi,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::empty());
        let store = Self {
            slot,
            vault,
            api,
            navigator,
            state: Arc::new(state),
        };
        store.check_auth();
        store
    }

    pub const fn slot(&self) -> SessionSlot {
        self.slot
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Adopt a freshly issued token pair.
    ///
    /// A token whose claims cannot be decoded is rejected before anything is
    /// persisted. Without a refresh token the stored one is kept.
    pub fn login(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<SessionSnapshot, SessionError> {
        let snapshot = SessionSnapshot::from_token(access_token).inspect_err(|e| {
            warn!(slot = %self.slot, error = %e, "rejected login with undecodable token");
        })?;

        self.vault.store(self.slot, access_token, refresh_token)?;
        info!(
            slot = %self.slot,
            subject = snapshot.subject_id.as_deref().unwrap_or_default(),
            role = ?snapshot.role,
            "signed in"
        );

        self.state.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Sign in with email and password against the slot's login endpoint
    #[instrument(skip(self, password), fields(slot = %self.slot))]
    pub async fn login_with_credentials(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember,
        };
        let response = self.api.login(self.slot, &request).await?;

        if let Some(role) = response.role
            && role.slot() != self.slot
        {
            warn!(slot = %self.slot, %role, "login returned a role belonging to another slot");
        }

        self.login(&response.access_token, response.refresh_token.as_deref())
    }

    /// Sign out.
    ///
    /// The identity reported is the one currently persisted, including any
    /// token the gateway refreshed since login. The backend is told when an
    /// identity is known, but its answer does not matter: local tokens are
    /// always cleared, the empty snapshot published and the user sent to the
    /// slot's login route.
    #[instrument(skip(self), fields(slot = %self.slot))]
    pub async fn logout(&self) {
        let current = self.check_auth();

        if let (Some(token), Some(subject)) =
            (current.access_token.as_deref(), current.subject_id.as_deref())
        {
            if let Err(e) = self.api.logout(token, subject).await {
                warn!(
                    slot = %self.slot,
                    error = %e,
                    "backend logout failed, clearing local session anyway"
                );
            }
        } else {
            debug!(slot = %self.slot, "no identity to report, skipping backend logout");
        }

        if let Err(e) = self.vault.clear(self.slot) {
            warn!(slot = %self.slot, error = %e, "failed to clear persisted tokens");
        }

        self.state.send_replace(SessionSnapshot::empty());
        info!(slot = %self.slot, "signed out");
        self.navigator.navigate(self.slot.login_route());
    }

    /// Re-derive the snapshot from persisted tokens without touching the
    /// network. An undecodable token reads as signed out.
    pub fn check_auth(&self) -> SessionSnapshot {
        let snapshot = match self.vault.access_token(self.slot) {
            Some(token) => SessionSnapshot::from_token(&token).unwrap_or_else(|e| {
                warn!(slot = %self.slot, error = %e, "persisted access token is not decodable");
                SessionSnapshot::empty()
            }),
            None => SessionSnapshot::empty(),
        };

        self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });
        snapshot
    }

    /// Run an API call and sign out when it fails because the session can no
    /// longer be renewed. Otherwise the snapshot is re-read afterwards, so a
    /// token refreshed during the call reaches subscribers.
    pub async fn guard<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match call.await {
            Err(error) if error.is_auth_expired() => {
                debug!(slot = %self.slot, %error, "session expired during call");
                self.logout().await;
                Err(error)
            }
            other => {
                self.check_auth();
                other
            }
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("slot", &self.slot)
            .field("is_authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
