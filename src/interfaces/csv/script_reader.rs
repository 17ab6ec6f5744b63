use crate::application::storefront::Storefront;
use crate::domain::cart::CartItem;
use crate::domain::catalog::{Product, ProductVariant, Rarity};
use crate::domain::money::Price;
use crate::domain::order::{Order, PaymentMethod, ShippingDetails};
use crate::error::{Result, StoreError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOp {
    Product,
    Rarity,
    Variant,
    Price,
    Add,
    Order,
}

/// One line of a store script.
///
/// | op        | user | item                   | quantity | price |
/// |-----------|------|------------------------|----------|-------|
/// | `product` |      | product name           |          |       |
/// | `rarity`  |      | rarity name            |          |       |
/// | `variant` |      | `PROD001:RAR001`       | stock    | price |
/// | `price`   |      | variant ID             |          | price |
/// | `add`     | user | variant ID             | quantity |       |
/// | `order`   | user | payment method (`COD`) |          |       |
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScriptRow {
    pub op: ScriptOp,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Read as text so the written scale (`12.00`) is kept.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub price: Option<Decimal>,
}

/// What applying a [`ScriptRow`] produced.
#[derive(Debug, PartialEq, Clone)]
pub enum Outcome {
    Product(Product),
    Rarity(Rarity),
    Variant(ProductVariant),
    CartItem(CartItem),
    Order(Order),
}

impl ScriptRow {
    /// Runs the row against `store`. Orders ship to `shipping`.
    pub async fn apply(&self, store: &Storefront, shipping: &ShippingDetails) -> Result<Outcome> {
        match self.op {
            ScriptOp::Product => {
                let name = self.field("item", &self.item)?;
                Ok(Outcome::Product(store.catalog.create_product(name, None).await?))
            }
            ScriptOp::Rarity => {
                let name = self.field("item", &self.item)?;
                Ok(Outcome::Rarity(store.catalog.create_rarity(name).await?))
            }
            ScriptOp::Variant => {
                let item = self.field("item", &self.item)?;
                let (product_id, rarity_id) = item.split_once(':').ok_or_else(|| {
                    StoreError::ValidationError(format!(
                        "Variant item must be PRODUCT:RARITY, got {item}"
                    ))
                })?;
                let variant = store
                    .catalog
                    .create_variant(
                        product_id.trim(),
                        rarity_id.trim(),
                        self.price()?,
                        self.quantity.unwrap_or(0),
                    )
                    .await?;
                Ok(Outcome::Variant(variant))
            }
            ScriptOp::Price => {
                let variant_id = self.field("item", &self.item)?;
                let variant = store.catalog.update_price(variant_id, self.price()?).await?;
                Ok(Outcome::Variant(variant))
            }
            ScriptOp::Add => {
                let user = self.field("user", &self.user)?;
                let variant_id = self.field("item", &self.item)?;
                let quantity = self.quantity.unwrap_or(1);
                Ok(Outcome::CartItem(
                    store.carts.add_item(user, variant_id, quantity).await?,
                ))
            }
            ScriptOp::Order => {
                let user = self.field("user", &self.user)?;
                let payment = match self.item.as_deref() {
                    Some(method) if !method.is_empty() => PaymentMethod::new(method),
                    _ => PaymentMethod::cash_on_delivery(),
                };
                let order = store
                    .orders
                    .place_order(user, shipping.clone(), payment)
                    .await?;
                Ok(Outcome::Order(order))
            }
        }
    }

    fn field<'a>(&self, name: &str, value: &'a Option<String>) -> Result<&'a str> {
        match value.as_deref() {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(StoreError::ValidationError(format!(
                "{:?} row requires {name}",
                self.op
            ))),
        }
    }

    fn price(&self) -> Result<Price> {
        let value = self
            .price
            .ok_or_else(|| StoreError::ValidationError(format!("{:?} row requires price", self.op)))?;
        Price::new(value)
    }
}

/// Reads store script rows from a CSV source.
///
/// Whitespace is trimmed and short rows are accepted, so trailing empty
/// columns can be left out.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes the rows in file order.
    pub fn rows(self) -> impl Iterator<Item = Result<ScriptRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StoreError::from))
    }
}
