use super::id_generator::IdGenerator;
use super::retry::{RetryConfig, retry_on_conflict};
use super::unit_of_work::UnitOfWork;
use crate::domain::cart::{Cart, CartItem, CartLine, CartView, item_key, items_prefix};
use crate::domain::catalog::ProductVariant;
use crate::domain::ports::{StoreHandle, Table};
use crate::error::{Result, StoreError};
use chrono::Utc;
use tracing::{debug, instrument};

/// Loads a user's cart with each line's variant, inside `uow`.
pub(crate) async fn load_cart(uow: &mut UnitOfWork, user_id: &str) -> Result<CartView> {
    let Some(cart) = uow.get::<Cart>(Table::Carts, user_id).await? else {
        return Ok(CartView {
            user_id: user_id.to_string(),
            cart: None,
            lines: Vec::new(),
        });
    };

    let items: Vec<CartItem> = uow
        .scan(Table::CartItems, &items_prefix(&cart.cart_id))
        .await?;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let variant: ProductVariant = uow
            .require(Table::Variants, &item.variant_id, "variant")
            .await?;
        lines.push(CartLine { item, variant });
    }

    Ok(CartView {
        user_id: user_id.to_string(),
        cart: Some(cart),
        lines,
    })
}

fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(StoreError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Shopping cart operations. One cart per user, keyed by user ID.
#[derive(Clone)]
pub struct CartService {
    store: StoreHandle,
    ids: IdGenerator,
    retry: RetryConfig,
}

impl CartService {
    pub fn new(store: StoreHandle, ids: IdGenerator, retry: RetryConfig) -> Self {
        Self { store, ids, retry }
    }

    /// The user's cart; an empty view when they never added anything.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: &str) -> Result<CartView> {
        let mut uow = UnitOfWork::begin(self.store.clone());
        load_cart(&mut uow, user_id).await
    }

    /// Adds `quantity` of a variant, creating the cart on first use and
    /// merging into an existing line for the same variant.
    #[instrument(skip(self))]
    pub async fn add_item(&self, user_id: &str, variant_id: &str, quantity: u32) -> Result<CartItem> {
        validate_quantity(quantity)?;
        retry_on_conflict(&self.retry, || self.add_item_once(user_id, variant_id, quantity)).await
    }

    async fn add_item_once(&self, user_id: &str, variant_id: &str, quantity: u32) -> Result<CartItem> {
        let mut uow = UnitOfWork::begin(self.store.clone());
        uow.require::<ProductVariant>(Table::Variants, variant_id, "variant")
            .await?;

        let cart = match uow.get::<Cart>(Table::Carts, user_id).await? {
            Some(cart) => cart,
            None => {
                let cart = Cart {
                    cart_id: self.ids.generate_id("CART").await?,
                    user_id: user_id.to_string(),
                    created_date: Utc::now(),
                };
                uow.put(Table::Carts, user_id, &cart)?;
                debug!(cart_id = %cart.cart_id, "Created cart");
                cart
            }
        };

        let items: Vec<CartItem> = uow
            .scan(Table::CartItems, &items_prefix(&cart.cart_id))
            .await?;
        let item = match items.into_iter().find(|i| i.variant_id == variant_id) {
            Some(mut existing) => {
                existing.quantity = existing.quantity.checked_add(quantity).ok_or_else(|| {
                    StoreError::ValidationError("Cart quantity overflow".to_string())
                })?;
                existing
            }
            None => CartItem {
                cart_item_id: self.ids.generate_id("ITEM").await?,
                cart_id: cart.cart_id.clone(),
                variant_id: variant_id.to_string(),
                quantity,
            },
        };

        uow.put(Table::CartItems, item.key(), &item)?;
        uow.commit().await?;
        Ok(item)
    }

    /// Sets the quantity of one of the user's cart lines.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: &str,
        cart_item_id: &str,
        quantity: u32,
    ) -> Result<CartItem> {
        validate_quantity(quantity)?;
        retry_on_conflict(&self.retry, || async {
            let mut uow = UnitOfWork::begin(self.store.clone());
            let cart: Cart = uow.require(Table::Carts, user_id, "cart").await?;
            let mut item: CartItem = uow
                .require(
                    Table::CartItems,
                    &item_key(&cart.cart_id, cart_item_id),
                    "cart item",
                )
                .await?;
            item.quantity = quantity;
            uow.put(Table::CartItems, item.key(), &item)?;
            uow.commit().await?;
            Ok(item)
        })
        .await
    }

    /// Removes one line. `false` when the user has no such line.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: &str, cart_item_id: &str) -> Result<bool> {
        retry_on_conflict(&self.retry, || async {
            let mut uow = UnitOfWork::begin(self.store.clone());
            let Some(cart) = uow.get::<Cart>(Table::Carts, user_id).await? else {
                return Ok(false);
            };
            let key = item_key(&cart.cart_id, cart_item_id);
            if uow.get::<CartItem>(Table::CartItems, &key).await?.is_none() {
                return Ok(false);
            }
            uow.delete(Table::CartItems, key);
            uow.commit().await?;
            Ok(true)
        })
        .await
    }

    /// Removes every line from the user's cart. The cart itself is kept.
    /// `false` when the user has no cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: &str) -> Result<bool> {
        retry_on_conflict(&self.retry, || async {
            let mut uow = UnitOfWork::begin(self.store.clone());
            let Some(cart) = uow.get::<Cart>(Table::Carts, user_id).await? else {
                return Ok(false);
            };
            let items: Vec<CartItem> = uow
                .scan(Table::CartItems, &items_prefix(&cart.cart_id))
                .await?;
            for item in &items {
                uow.delete(Table::CartItems, item.key());
            }
            uow.commit().await?;
            debug!(removed = items.len(), "Cleared cart");
            Ok(true)
        })
        .await
    }
}
