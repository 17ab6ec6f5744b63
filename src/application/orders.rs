//! Order placement.
//!
//! A placement is one [`UnitOfWork`]: it loads the cart, snapshots prices,
//! writes the order with its lines and shipping address, reserves stock and
//! deletes the cart lines it consumed. Commit validates every row that was
//! read, so a concurrent checkout of the same stock or a concurrent edit of
//! the same cart turns into a `ConcurrencyConflict` and the whole placement
//! runs again. Nothing is visible until commit; a failed or timed out
//! placement leaves storage exactly as it was.

use super::cart::load_cart;
use super::id_generator::IdGenerator;
use super::retry::{RetryConfig, retry_on_conflict};
use super::unit_of_work::UnitOfWork;
use crate::domain::catalog::{Product, ProductVariant, Rarity};
use crate::domain::order::{
    Order, OrderDetails, OrderItem, OrderItemDetails, OrderKey, OrderRecord, OrderStatus,
    PaymentMethod, ShippingAddress, ShippingDetails, items_prefix, order_key,
};
use crate::domain::ports::{StoreHandle, Table};
use crate::error::{Result, StoreError};
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

#[derive(Clone)]
pub struct OrderCoordinator {
    store: StoreHandle,
    ids: IdGenerator,
    retry: RetryConfig,
    timeout: Duration,
}

impl OrderCoordinator {
    pub fn new(store: StoreHandle, ids: IdGenerator, retry: RetryConfig, timeout: Duration) -> Self {
        Self {
            store,
            ids,
            retry,
            timeout,
        }
    }

    /// Turns the user's cart into an order.
    ///
    /// Fails with `EmptyCart` when there is nothing to order and with
    /// `OrderCreationFailed` for anything else, wrapping the cause
    /// (`InsufficientStock`, `ValidationError`, `Timeout`, exhausted
    /// conflicts, storage faults).
    #[instrument(skip(self, shipping))]
    pub async fn place_order(
        &self,
        user_id: &str,
        shipping: ShippingDetails,
        payment_method: PaymentMethod,
    ) -> Result<Order> {
        self.place(user_id, &shipping, &payment_method, None).await
    }

    /// Like [`place_order`](Self::place_order), but a repeated
    /// `idempotency_key` for the same user returns the order the key
    /// first produced instead of placing another.
    #[instrument(skip(self, shipping))]
    pub async fn place_order_once(
        &self,
        user_id: &str,
        shipping: ShippingDetails,
        payment_method: PaymentMethod,
        idempotency_key: &str,
    ) -> Result<Order> {
        if idempotency_key.trim().is_empty() {
            return Err(creation_failed(
                user_id,
                StoreError::ValidationError("Idempotency key is required".to_string()),
            ));
        }
        self.place(user_id, &shipping, &payment_method, Some(idempotency_key))
            .await
    }

    async fn place(
        &self,
        user_id: &str,
        shipping: &ShippingDetails,
        payment_method: &PaymentMethod,
        idempotency_key: Option<&str>,
    ) -> Result<Order> {
        if let Some(order) = self.keyed_order(user_id, idempotency_key).await? {
            return Ok(order);
        }

        // Fail fast, before any ID is spent.
        let mut peek = UnitOfWork::begin(self.store.clone());
        let cart = load_cart(&mut peek, user_id)
            .await
            .map_err(|e| creation_failed(user_id, e))?;
        if cart.is_empty() {
            // The cart may have been emptied by a concurrent request with the same key.
            if let Some(order) = self.keyed_order(user_id, idempotency_key).await? {
                return Ok(order);
            }
            warn!("Cannot place order, cart for user {} is empty", user_id);
            return Err(StoreError::EmptyCart(user_id.to_string()));
        }
        shipping
            .validate()
            .map_err(|e| creation_failed(user_id, e))?;

        let attempts = retry_on_conflict(&self.retry, || {
            self.try_place(user_id, shipping, payment_method, idempotency_key)
        });
        match tokio::time::timeout(self.timeout, attempts).await {
            Ok(Ok(order)) => {
                info!(
                    order_id = %order.order_id,
                    total = %order.total_amount,
                    "Order placed"
                );
                Ok(order)
            }
            Ok(Err(StoreError::EmptyCart(user))) => {
                warn!("Cart for user {} was emptied before checkout", user);
                Err(StoreError::EmptyCart(user))
            }
            Ok(Err(e)) => {
                error!(error = %e, "Error creating order for user {}", user_id);
                Err(creation_failed(user_id, e))
            }
            Err(_) => {
                error!(timeout = ?self.timeout, "Order placement timed out");
                Err(creation_failed(user_id, StoreError::Timeout(self.timeout)))
            }
        }
    }

    async fn keyed_order(&self, user_id: &str, key: Option<&str>) -> Result<Option<Order>> {
        let Some(key) = key else {
            return Ok(None);
        };
        let mut uow = UnitOfWork::begin(self.store.clone());
        let order = find_keyed(&mut uow, user_id, key)
            .await
            .map_err(|e| creation_failed(user_id, e))?;
        if let Some(order) = &order {
            info!(order_id = %order.order_id, "Returning order already placed for key");
        }
        Ok(order)
    }

    async fn try_place(
        &self,
        user_id: &str,
        shipping: &ShippingDetails,
        payment_method: &PaymentMethod,
        idempotency_key: Option<&str>,
    ) -> Result<Order> {
        let mut uow = UnitOfWork::begin(self.store.clone());

        if let Some(key) = idempotency_key {
            // Another request with the same key may have committed meanwhile.
            if let Some(order) = find_keyed(&mut uow, user_id, key).await? {
                return Ok(order);
            }
        }

        let cart = load_cart(&mut uow, user_id).await?;
        if cart.is_empty() {
            // Validate what was read: a key written meanwhile is a conflict, not an empty cart.
            uow.commit().await?;
            return Err(StoreError::EmptyCart(user_id.to_string()));
        }
        // Item prices are snapshotted from the cart lines, so this is the order total.
        let total_amount = cart.total()?;

        // IDs commit on their own; a placement that fails or retries leaves gaps.
        let order_id = self.ids.generate_id("ORD").await?;
        let mut items = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            items.push(OrderItem {
                order_item_id: self.ids.generate_id("OITEM").await?,
                order_id: order_id.clone(),
                variant_id: line.item.variant_id.clone(),
                quantity: line.item.quantity,
                unit_price: line.variant.price,
            });
        }

        let shipping_address = ShippingAddress {
            shipping_address_id: self.ids.generate_id("SHIP").await?,
            order_id: order_id.clone(),
            details: shipping.clone(),
        };
        let order = Order {
            order_id: order_id.clone(),
            user_id: user_id.to_string(),
            order_date: Utc::now(),
            total_amount,
            status: OrderStatus::for_payment(payment_method),
            payment_method: payment_method.clone(),
            items,
            shipping_address,
        };

        uow.put(Table::Orders, order_id.as_str(), &order.record())?;
        for item in &order.items {
            uow.put(Table::OrderItems, item.key(), item)?;
        }
        uow.put(
            Table::ShippingAddresses,
            order_id.as_str(),
            &order.shipping_address,
        )?;

        for item in &order.items {
            // Re-read through the unit of work so two lines of one variant
            // both count against the same stock.
            let mut variant: ProductVariant = uow
                .require(Table::Variants, &item.variant_id, "variant")
                .await?;
            variant.reserve(item.quantity)?;
            uow.put(Table::Variants, item.variant_id.as_str(), &variant)?;
        }

        for line in &cart.lines {
            uow.delete(Table::CartItems, line.item.key());
        }
        if let Some(key) = idempotency_key {
            let entry = OrderKey {
                user_id: user_id.to_string(),
                key: key.to_string(),
                order_id: order_id.clone(),
            };
            uow.put(Table::OrderKeys, order_key(user_id, key), &entry)?;
        }

        uow.commit().await?;
        Ok(order)
    }

    /// The order with its lines, address and catalog display data, if it
    /// belongs to `user_id`. Another user's order is reported as not found.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str, user_id: &str) -> Result<OrderDetails> {
        let mut uow = UnitOfWork::begin(self.store.clone());
        let order = match load_order(&mut uow, order_id).await? {
            Some(order) if order.user_id == user_id => order,
            _ => return Err(StoreError::not_found("order", order_id)),
        };

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let variant: Option<ProductVariant> =
                uow.get(Table::Variants, &item.variant_id).await?;
            let (product, rarity) = match &variant {
                Some(v) => (
                    uow.get::<Product>(Table::Products, &v.product_id).await?,
                    uow.get::<Rarity>(Table::Rarities, &v.rarity_id).await?,
                ),
                None => (None, None),
            };

            items.push(OrderItemDetails {
                order_item_id: item.order_item_id,
                variant_id: item.variant_id,
                product_id: variant.map(|v| v.product_id),
                product_name: product.as_ref().map(|p| p.name.clone()),
                product_image_url: product.and_then(|p| p.image_url),
                rarity_name: rarity.map(|r| r.name),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        Ok(OrderDetails {
            order_id: order.order_id,
            user_id: order.user_id,
            order_date: order.order_date,
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address.details,
            items,
        })
    }
}

async fn load_order(uow: &mut UnitOfWork, order_id: &str) -> Result<Option<Order>> {
    let Some(record) = uow.get::<OrderRecord>(Table::Orders, order_id).await? else {
        return Ok(None);
    };
    let items: Vec<OrderItem> = uow
        .scan(Table::OrderItems, &items_prefix(order_id))
        .await?;
    let address: ShippingAddress = uow
        .require(Table::ShippingAddresses, order_id, "shipping address")
        .await?;
    Ok(Some(Order::from_parts(record, items, address)))
}

async fn find_keyed(uow: &mut UnitOfWork, user_id: &str, key: &str) -> Result<Option<Order>> {
    let Some(entry) = uow
        .get::<OrderKey>(Table::OrderKeys, &order_key(user_id, key))
        .await?
    else {
        return Ok(None);
    };
    if entry.user_id != user_id || entry.key != key {
        return Ok(None);
    }
    load_order(uow, &entry.order_id)
        .await?
        .map(Some)
        .ok_or_else(|| StoreError::not_found("order", entry.order_id))
}

fn creation_failed(user_id: &str, source: StoreError) -> StoreError {
    StoreError::OrderCreationFailed {
        user_id: user_id.to_string(),
        source: Box::new(source),
    }
}
