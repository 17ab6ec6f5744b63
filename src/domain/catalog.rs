use super::money::Price;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Rarity {
    pub rarity_id: String,
    pub name: String,
}

/// A purchasable (product, rarity) combination with its live price and stock.
///
/// Owned by the catalog; the checkout path only reads the price and
/// decrements `stock_quantity`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProductVariant {
    pub variant_id: String,
    pub product_id: String,
    pub rarity_id: String,
    pub price: Price,
    pub stock_quantity: u32,
}

impl ProductVariant {
    /// Takes `quantity` units out of stock, refusing to go below zero.
    pub fn reserve(&mut self, quantity: u32) -> Result<(), StoreError> {
        match self.stock_quantity.checked_sub(quantity) {
            Some(remaining) => {
                self.stock_quantity = remaining;
                Ok(())
            }
            None => Err(StoreError::InsufficientStock {
                variant_id: self.variant_id.clone(),
                requested: quantity,
                available: self.stock_quantity,
            }),
        }
    }
}
