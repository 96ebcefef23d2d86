//! Shopping cart model

use serde::{Deserialize, Serialize};

/// Catalog product as returned by the products endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub product_name: String,
    pub category: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Units available; `None` means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

/// A cart line: a product plus the chosen quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn id(&self) -> Option<&str> {
        self.product.id.as_deref()
    }

    fn max_quantity(&self) -> u32 {
        self.product.stock.unwrap_or(u32::MAX)
    }
}

/// Ordered list of cart lines, at most one per product id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `qty` units of a product, capped at its stock.
    ///
    /// The incoming product replaces the stored one, so the latest stock
    /// applies. Products without an id cannot be tracked and are ignored. Returns
    /// whether the cart changed.
    pub fn add_item(&mut self, product: Product, qty: u32) -> bool {
        let Some(id) = product.id.clone() else {
            return false;
        };

        let limit = product.stock.unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|item| item.id() == Some(id.as_str())) {
            item.quantity = item.quantity.saturating_add(qty).min(limit);
            item.product = product;
        } else {
            self.items.push(CartItem {
                product,
                quantity: qty.min(limit),
            });
        }
        true
    }

    /// Drop the line for a product id
    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != Some(id));
        self.items.len() != before
    }

    /// Set a line's quantity, clamped to `1..=stock`
    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> bool {
        match self.items.iter_mut().find(|item| item.id() == Some(id)) {
            Some(item) => {
                item.quantity = quantity.min(item.max_quantity()).max(1);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total units across all lines
    pub fn total_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of price times quantity
    pub fn total_price(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.product.price * f64::from(item.quantity))
            .sum()
    }
}
