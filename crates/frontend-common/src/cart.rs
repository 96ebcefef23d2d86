//! Persisted, observable cart

use crate::config::AppConfig;
use std::sync::Arc;
use storefront_core::{Cart, CartItem, CoreResult, KeyValueStore, Product};
use tokio::sync::watch;

/// Cart kept in sync with the `cart` storage key
#[derive(Clone)]
pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    state: Arc<watch::Sender<Cart>>,
}

impl CartStore {
    /// Load the persisted cart; anything unreadable starts an empty one
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let cart = load(store.as_ref());
        let (state, _) = watch::channel(cart);
        Self {
            store,
            state: Arc::new(state),
        }
    }

    pub fn cart(&self) -> Cart {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.state.borrow().items().to_vec()
    }

    pub fn total_count(&self) -> u64 {
        self.state.borrow().total_count()
    }

    pub fn total_price(&self) -> f64 {
        self.state.borrow().total_price()
    }

    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.state.subscribe()
    }

    /// Add units of a product; returns whether the cart changed
    pub fn add_item(&self, product: Product, qty: u32) -> CoreResult<bool> {
        self.update(|cart| cart.add_item(product, qty))
    }

    pub fn remove_item(&self, id: &str) -> CoreResult<bool> {
        self.update(|cart| cart.remove_item(id))
    }

    pub fn update_quantity(&self, id: &str, quantity: u32) -> CoreResult<bool> {
        self.update(|cart| cart.update_quantity(id, quantity))
    }

    /// Empty the cart and drop its storage key
    pub fn clear(&self) -> CoreResult<()> {
        self.state.send_modify(Cart::clear);
        self.store.remove(AppConfig::CART_STORAGE_KEY)?;
        debug!("cart cleared");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Cart) -> bool) -> CoreResult<bool> {
        let mut snapshot = None;
        self.state.send_if_modified(|cart| {
            let changed = apply(cart);
            if changed {
                snapshot = Some(cart.clone());
            }
            changed
        });

        match snapshot {
            Some(cart) => {
                let json = serde_json::to_string(&cart)?;
                self.store.set(AppConfig::CART_STORAGE_KEY, &json)?;
                debug!(
                    lines = cart.items().len(),
                    units = cart.total_count(),
                    "cart updated"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn load(store: &dyn KeyValueStore) -> Cart {
    let Some(raw) = store.get(AppConfig::CART_STORAGE_KEY) else {
        return Cart::new();
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "discarding unreadable persisted cart");
        Cart::new()
    })
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::MemoryStore;

    fn product(id: &str, price: f64, stock: Option<u32>) -> Product {
        Product {
            id: Some(id.to_string()),
            product_name: format!("Drone {id}"),
            category: "Fixed wing".to_string(),
            price,
            description: None,
            is_active: true,
            created_at: None,
            updated_at: None,
            img: None,
            rating: Some(4.5),
            stock,
        }
    }

    fn stores() -> (MemoryStore, CartStore) {
        let backing = MemoryStore::new();
        let cart = CartStore::new(Arc::new(backing.clone()));
        (backing, cart)
    }

    #[test]
    fn test_mutations_are_persisted_and_reloaded() {
        let (backing, cart) = stores();
        cart.add_item(product("p1", 100.0, Some(5)), 2).unwrap();
        cart.add_item(product("p2", 25.0, None), 1).unwrap();
        cart.update_quantity("p1", 3).unwrap();

        let raw = backing.get("cart").unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);

        let reloaded = CartStore::new(Arc::new(backing));
        assert_eq!(reloaded.cart(), cart.cart());
        assert_eq!(reloaded.total_count(), 4);
        assert!((reloaded.total_price() - 325.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clear_removes_key() {
        let (backing, cart) = stores();
        cart.add_item(product("p1", 10.0, None), 1).unwrap();
        assert!(backing.get("cart").is_some());

        cart.clear().unwrap();
        assert!(backing.get("cart").is_none());
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_unchanged_cart_is_not_written() {
        let (backing, cart) = stores();
        assert!(!cart.remove_item("missing").unwrap());
        assert!(backing.is_empty());
    }

    #[test]
    fn test_unreadable_cart_starts_empty() {
        let backing = MemoryStore::new();
        backing.set("cart", "{not json").unwrap();

        let cart = CartStore::new(Arc::new(backing));
        assert_eq!(cart.total_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (_backing, cart) = stores();
        let mut rx = cart.subscribe();

        cart.add_item(product("p1", 10.0, None), 2).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().total_count(), 2);

        cart.remove_item("p1").unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }
}
