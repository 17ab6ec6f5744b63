use super::catalog::ProductVariant;
use super::money::Money;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cart per user, created on first add and emptied (never deleted) at checkout.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Cart {
    pub cart_id: String,
    pub user_id: String,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CartItem {
    pub cart_item_id: String,
    pub cart_id: String,
    pub variant_id: String,
    pub quantity: u32,
}

impl CartItem {
    /// Storage key: items are grouped under their cart so a prefix scan loads a cart.
    pub fn key(&self) -> String {
        item_key(&self.cart_id, &self.cart_item_id)
    }
}

pub fn item_key(cart_id: &str, cart_item_id: &str) -> String {
    format!("{cart_id}/{cart_item_id}")
}

pub fn items_prefix(cart_id: &str) -> String {
    format!("{cart_id}/")
}

/// A cart item joined with the variant it points at, as read at load time.
#[derive(Debug, PartialEq, Clone)]
pub struct CartLine {
    pub item: CartItem,
    pub variant: ProductVariant,
}

impl CartLine {
    pub fn subtotal(&self) -> Result<Money, StoreError> {
        self.variant.price.times(self.item.quantity)
    }
}

/// The loaded contents of a user's cart. `cart` is `None` when the user never added anything.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct CartView {
    pub user_id: String,
    pub cart: Option<Cart>,
    pub lines: Vec<CartLine>,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> Result<Money, StoreError> {
        Money::total(self.lines.iter().map(CartLine::subtotal))
    }
}
