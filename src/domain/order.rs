use super::money::{Money, Price};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CASH_ON_DELIVERY: &str = "COD";
const DEFAULT_COUNTRY: &str = "Vietnam";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum OrderStatus {
    Pending,
    #[serde(rename = "Awaiting Payment")]
    AwaitingPayment,
}

impl OrderStatus {
    /// Cash on delivery orders can be fulfilled right away; anything else waits for payment.
    pub fn for_payment(method: &PaymentMethod) -> Self {
        if method.is_cash_on_delivery() {
            Self::Pending
        } else {
            Self::AwaitingPayment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::AwaitingPayment => "Awaiting Payment",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(transparent)]
pub struct PaymentMethod(String);

impl PaymentMethod {
    pub fn new(method: impl Into<String>) -> Self {
        Self(method.into())
    }

    pub fn cash_on_delivery() -> Self {
        Self(CASH_ON_DELIVERY.to_string())
    }

    pub fn is_cash_on_delivery(&self) -> bool {
        self.0 == CASH_ON_DELIVERY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::cash_on_delivery()
    }
}

/// Where an order ships to, as supplied by the buyer at checkout.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ShippingDetails {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address_line: String,
    pub city: String,
    pub province: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl ShippingDetails {
    pub fn validate(&self) -> Result<(), StoreError> {
        let required = [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("address_line", &self.address_line),
            ("city", &self.city),
            ("province", &self.province),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::ValidationError(format!(
                    "Shipping {field} is required"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ShippingAddress {
    pub shipping_address_id: String,
    pub order_id: String,
    #[serde(flatten)]
    pub details: ShippingDetails,
}

/// A purchased line. `unit_price` is the variant price at checkout and never changes.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderItem {
    pub order_item_id: String,
    pub order_id: String,
    pub variant_id: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderItem {
    pub fn subtotal(&self) -> Result<Money, StoreError> {
        self.unit_price.times(self.quantity)
    }

    pub fn key(&self) -> String {
        item_key(&self.order_id, &self.order_item_id)
    }
}

pub fn item_key(order_id: &str, order_item_id: &str) -> String {
    format!("{order_id}/{order_item_id}")
}

pub fn items_prefix(order_id: &str) -> String {
    format!("{order_id}/")
}

/// The `orders` table row. Lines and address live in their own tables.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// An order together with everything that was written with it.
#[derive(Debug, PartialEq, Clone)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
}

impl Order {
    pub fn from_parts(
        record: OrderRecord,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> Self {
        Self {
            order_id: record.order_id,
            user_id: record.user_id,
            order_date: record.order_date,
            total_amount: record.total_amount,
            status: record.status,
            payment_method: record.payment_method.unwrap_or_default(),
            items,
            shipping_address,
        }
    }

    pub fn record(&self) -> OrderRecord {
        OrderRecord {
            order_id: self.order_id.clone(),
            user_id: self.user_id.clone(),
            order_date: self.order_date,
            total_amount: self.total_amount,
            status: self.status,
            payment_method: Some(self.payment_method.clone()),
        }
    }

    pub fn items_total(&self) -> Result<Money, StoreError> {
        Money::total(self.items.iter().map(OrderItem::subtotal))
    }
}

/// A line of [`OrderDetails`] with catalog display data joined in.
///
/// Display fields are `None` when the product or rarity row no longer exists.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderItemDetails {
    pub order_item_id: String,
    pub variant_id: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
    pub rarity_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderItemDetails {
    pub fn subtotal(&self) -> Result<Money, StoreError> {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderDetails {
    pub order_id: String,
    pub user_id: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingDetails,
    pub items: Vec<OrderItemDetails>,
}

/// Maps `(user, idempotency key)` to the order it produced.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderKey {
    pub user_id: String,
    pub key: String,
    pub order_id: String,
}

/// Storage key of an [`OrderKey`]. The user ID is length-prefixed, so no two
/// `(user, key)` pairs share a storage key whatever characters they contain.
pub fn order_key(user_id: &str, key: &str) -> String {
    format!("{}:{user_id}/{key}", user_id.len())
}
