//! Application wiring
//!
//! One [`Storefront`] per browsing context: both session slots, the cart and
//! the API share a single backing store and refresh coordinator.

use crate::cart::CartStore;
use crate::session::{Navigator, SessionStore};
use std::sync::Arc;
use storefront_core::{KeyValueStore, SessionSlot, TokenVault};
use storefront_http::{ClientConfig, ClientError, Gateway, StorefrontApi};

#[derive(Clone, Debug)]
pub struct Storefront {
    api: StorefrontApi,
    customer: SessionStore,
    staff: SessionStore,
    cart: CartStore,
}

impl Storefront {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let vault = TokenVault::new(Arc::clone(&store));
        let gateway = Gateway::new(config, vault.clone())?;
        let api = StorefrontApi::new(gateway);

        let customer = SessionStore::new(
            SessionSlot::Customer,
            vault.clone(),
            api.clone(),
            Arc::clone(&navigator),
        );
        let staff = SessionStore::new(SessionSlot::AdminOrEmployee, vault, api.clone(), navigator);
        let cart = CartStore::new(store);

        info!(
            base_url = api.gateway().base_url(),
            customer = customer.is_authenticated(),
            staff = staff.is_authenticated(),
            "storefront initialized"
        );

        Ok(Self {
            api,
            customer,
            staff,
            cart,
        })
    }

    /// Wire against `window.localStorage` and the configured API base (the
    /// page's origin when none was set at build time). Installs console
    /// logging first.
    #[cfg(target_arch = "wasm32")]
    pub fn in_browser(navigator: Arc<dyn Navigator>) -> Result<Self, ClientError> {
        crate::logging::init();
        let config = ClientConfig::new(crate::browser::api_base_url())?;
        Self::new(config, Arc::new(crate::browser::BrowserStorage), navigator)
    }

    pub fn api(&self) -> &StorefrontApi {
        &self.api
    }

    pub fn gateway(&self) -> &Gateway {
        self.api.gateway()
    }

    pub fn session(&self, slot: SessionSlot) -> &SessionStore {
        match slot {
            SessionSlot::Customer => &self.customer,
            SessionSlot::AdminOrEmployee => &self.staff,
        }
    }

    pub fn customer(&self) -> &SessionStore {
        &self.customer
    }

    pub fn staff(&self) -> &SessionStore {
        &self.staff
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }
}
