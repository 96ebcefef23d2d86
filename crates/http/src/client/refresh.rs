//! Coordinated access-token refresh
//!
//! Refresh endpoints rotate single-use refresh tokens, so concurrent 401s must
//! not each fire their own refresh. [`RefreshCoordinator`] keeps one state
//! machine per session slot: `Idle`, or `Refreshing` with a shared handle to
//! the pending result. Callers arriving while a refresh is in flight await
//! that handle and observe the same token or the same error.

use super::config::ClientConfig;
use super::error::RefreshError;
use crate::types::{RefreshRequest, RefreshResponse};
use futures::FutureExt;
use futures::future::Shared;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use storefront_core::{SessionSlot, TokenVault};

/// Backend path that exchanges a refresh token for a new access token
pub const REFRESH_PATH: &str = "/auth/refresh";

type RefreshResult = Result<String, RefreshError>;

#[cfg(not(target_arch = "wasm32"))]
type BoxedRefresh = Pin<Box<dyn Future<Output = RefreshResult> + Send>>;
#[cfg(target_arch = "wasm32")]
type BoxedRefresh = Pin<Box<dyn Future<Output = RefreshResult>>>;

type PendingRefresh = Shared<BoxedRefresh>;

/// `Send` on native targets; browser futures are single-threaded
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

#[derive(Default)]
enum RefreshState {
    #[default]
    Idle,
    Refreshing(PendingRefresh),
}

/// Single-flight guard for token refreshes.
///
/// Construct one per process (or per independent browsing context) and share
/// it between every gateway that uses the same token storage. Clones share
/// state.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    slots: Arc<Mutex<HashMap<SessionSlot, RefreshState>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh for the slot is currently outstanding
    pub fn is_refreshing(&self, slot: SessionSlot) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .is_some_and(|state| matches!(state, RefreshState::Refreshing(_)))
    }

    /// Run `start` unless a refresh for `slot` is already in flight, in which
    /// case join that one instead.
    ///
    /// `start` runs under the slot lock and must not call back into the
    /// coordinator. If it fails, the error goes to this caller only and the
    /// slot stays idle. The slot returns to idle as soon as the started future
    /// completes, before any waiter sees the result.
    pub async fn coordinate<F, Fut>(&self, slot: SessionSlot, start: F) -> RefreshResult
    where
        F: FnOnce() -> Result<Fut, RefreshError>,
        Fut: Future<Output = RefreshResult> + MaybeSend + 'static,
    {
        let pending = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let state = slots.entry(slot).or_default();
            if let RefreshState::Refreshing(pending) = &*state {
                debug!(%slot, "joining in-flight token refresh");
                pending.clone()
            } else {
                let work = start()?;
                let shared_state = Arc::clone(&self.slots);
                let boxed: BoxedRefresh = Box::pin(async move {
                    let result = work.await;
                    shared_state
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(slot, RefreshState::Idle);
                    result
                });
                let pending = boxed.shared();
                *state = RefreshState::Refreshing(pending.clone());
                pending
            }
        };

        pending.await
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots: Vec<SessionSlot> = SessionSlot::ALL
            .into_iter()
            .filter(|slot| self.is_refreshing(*slot))
            .collect();
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &slots)
            .finish()
    }
}

/// Exchanges stored refresh tokens for new access tokens through the coordinator
#[derive(Clone, Debug)]
pub struct TokenRefresher {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    vault: TokenVault,
    coordinator: RefreshCoordinator,
}

impl TokenRefresher {
    pub fn new(
        http: reqwest::Client,
        config: Arc<ClientConfig>,
        vault: TokenVault,
        coordinator: RefreshCoordinator,
    ) -> Self {
        Self {
            http,
            config,
            vault,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Obtain a new access token for the slot.
    ///
    /// On success the new access token (and the rotated refresh token, when
    /// the backend sends one) is persisted under the slot's keys.
    #[instrument(skip(self), fields(slot = %slot))]
    pub async fn refresh(&self, slot: SessionSlot) -> RefreshResult {
        self.coordinator
            .coordinate(slot, || self.start_refresh(slot))
            .await
    }

    fn start_refresh(
        &self,
        slot: SessionSlot,
    ) -> Result<impl Future<Output = RefreshResult> + MaybeSend + 'static, RefreshError> {
        let Some(refresh_token) = self.vault.refresh_token(slot) else {
            warn!(%slot, "access token expired and no refresh token is stored");
            return Err(RefreshError::NoRefreshToken(slot));
        };

        let request = self
            .http
            .post(self.config.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token });

        #[cfg(not(target_arch = "wasm32"))]
        let request = request.timeout(self.config.refresh_timeout);
        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        let vault = self.vault.clone();
        debug!(%slot, "starting token refresh");

        Ok(async move {
            let response = request
                .send()
                .await
                .map_err(|e| RefreshError::from_transport(&e))?;

            let status = response.status();
            if !status.is_success() {
                warn!(%slot, status = status.as_u16(), "refresh rejected by backend");
                return Err(RefreshError::BackendRejected {
                    status: status.as_u16(),
                });
            }

            let body: RefreshResponse = response.json().await.map_err(|e| {
                if e.is_timeout() {
                    RefreshError::Timeout
                } else {
                    RefreshError::InvalidResponse(e.to_string())
                }
            })?;

            if body.access_token.is_empty() {
                return Err(RefreshError::InvalidResponse(
                    "empty access_token".to_string(),
                ));
            }

            let rotated = body.refresh_token.as_deref().filter(|t| !t.is_empty());
            vault
                .store(slot, &body.access_token, rotated)
                .map_err(|e| RefreshError::Storage(e.to_string()))?;

            info!(%slot, rotated = rotated.is_some(), "access token refreshed");
            Ok(body.access_token)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let coordinator = RefreshCoordinator::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();
        let gate = Arc::new(Mutex::new(Some(gate)));

        let calls = (0..4).map(|_| {
            let coordinator = coordinator.clone();
            let starts = Arc::clone(&starts);
            let gate = Arc::clone(&gate);
            async move {
                coordinator
                    .coordinate(SessionSlot::Customer, || {
                        starts.fetch_add(1, Ordering::SeqCst);
                        let gate = gate.lock().unwrap().take().unwrap();
                        Ok(async move {
                            gate.await.ok();
                            Ok("fresh".to_string())
                        })
                    })
                    .await
            }
        });

        let joined = futures::future::join_all(calls);
        let releaser = async {
            tokio::task::yield_now().await;
            assert!(coordinator.is_refreshing(SessionSlot::Customer));
            release.send(()).unwrap();
        };
        let (results, ()) = tokio::join!(joined, releaser);

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), "fresh");
        }
        assert!(!coordinator.is_refreshing(SessionSlot::Customer));
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_slot_returns_to_idle() {
        let coordinator = RefreshCoordinator::new();
        let (release, gate) = oneshot::channel::<()>();

        let first = coordinator.coordinate(SessionSlot::AdminOrEmployee, || {
            Ok(async move {
                gate.await.ok();
                Err(RefreshError::BackendRejected { status: 401 })
            })
        });
        let second = async {
            tokio::task::yield_now().await;
            coordinator
                .coordinate(SessionSlot::AdminOrEmployee, || -> Result<
                    std::future::Ready<RefreshResult>,
                    RefreshError,
                > {
                    panic!("second caller must join the pending refresh")
                })
                .await
        };
        let releaser = async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            release.send(()).unwrap();
        };

        let (a, b, ()) = tokio::join!(first, second, releaser);
        assert_eq!(a, Err(RefreshError::BackendRejected { status: 401 }));
        assert_eq!(b, Err(RefreshError::BackendRejected { status: 401 }));
        assert!(!coordinator.is_refreshing(SessionSlot::AdminOrEmployee));
    }

    #[tokio::test]
    async fn test_start_error_does_not_install_pending_refresh() {
        let coordinator = RefreshCoordinator::new();

        let result = coordinator
            .coordinate(SessionSlot::Customer, || -> Result<
                std::future::Ready<RefreshResult>,
                RefreshError,
            > {
                Err(RefreshError::NoRefreshToken(SessionSlot::Customer))
            })
            .await;

        assert_eq!(
            result,
            Err(RefreshError::NoRefreshToken(SessionSlot::Customer))
        );
        assert!(!coordinator.is_refreshing(SessionSlot::Customer));
    }

    #[tokio::test]
    async fn test_slots_refresh_independently() {
        let coordinator = RefreshCoordinator::new();
        let (release, gate) = oneshot::channel::<()>();

        let customer = coordinator.coordinate(SessionSlot::Customer, || {
            Ok(async move {
                gate.await.ok();
                Ok("customer".to_string())
            })
        });
        let staff = async {
            tokio::task::yield_now().await;
            let result = coordinator
                .coordinate(SessionSlot::AdminOrEmployee, || {
                    Ok(std::future::ready(Ok("staff".to_string())))
                })
                .await;
            release.send(()).unwrap();
            result
        };

        let (customer, staff) = tokio::join!(customer, staff);
        assert_eq!(customer.unwrap(), "customer");
        assert_eq!(staff.unwrap(), "staff");
    }
}
