#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tcg_checkout::application::retry::RetryConfig;
use tcg_checkout::application::storefront::Storefront;
use tcg_checkout::config::StoreConfig;
use tcg_checkout::domain::money::Price;
use tcg_checkout::domain::order::ShippingDetails;
use tcg_checkout::domain::ports::{CommitBatch, KvStore, Row, StoreHandle, Table, Write};
use tcg_checkout::error::{Result, StoreError};
use tcg_checkout::infrastructure::in_memory::InMemoryStore;

/// Generous retries with short backoff, for tests that race many tasks.
pub fn test_config() -> StoreConfig {
    let retry = RetryConfig {
        max_attempts: 500,
        base_delay: Duration::from_micros(50),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    };
    StoreConfig {
        id_retry: retry.clone(),
        cart_retry: retry.clone(),
        order_retry: retry,
        order_timeout: Duration::from_secs(30),
    }
}

pub fn storefront() -> (Storefront, InMemoryStore) {
    let store = InMemoryStore::new();
    let handle: StoreHandle = Arc::new(store.clone());
    (Storefront::new(handle, &test_config()), store)
}

/// Creates one product per `(price, stock)` pair, all with one shared
/// rarity, and a variant for each. Returns the variant IDs in order.
pub async fn seed_variants(store: &Storefront, variants: &[(Decimal, u32)]) -> Vec<String> {
    let rarity = store.catalog.create_rarity("Holo Rare").await.unwrap();
    let mut ids = Vec::new();
    for (n, (price, stock)) in variants.iter().enumerate() {
        let product = store
            .catalog
            .create_product(&format!("Card {}", n + 1), Some("https://img.example/card.png"))
            .await
            .unwrap();
        let variant = store
            .catalog
            .create_variant(
                &product.product_id,
                &rarity.rarity_id,
                Price::new(*price).unwrap(),
                *stock,
            )
            .await
            .unwrap();
        ids.push(variant.variant_id);
    }
    ids
}

pub async fn stock(store: &Storefront, variant_id: &str) -> u32 {
    store
        .catalog
        .get_variant(variant_id)
        .await
        .unwrap()
        .stock_quantity
}

pub fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Nguyen Van A".to_string(),
        phone: "0900000000".to_string(),
        email: "a@example.com".to_string(),
        address_line: "1 Le Loi".to_string(),
        city: "Ho Chi Minh".to_string(),
        province: "HCM".to_string(),
        postal_code: Some("700000".to_string()),
        country: "Vietnam".to_string(),
    }
}

pub async fn row_count(store: &InMemoryStore, table: Table) -> usize {
    store.scan_prefix(table, "").await.unwrap().len()
}

/// Fails any commit that writes `table/key`, applying nothing.
pub struct FailingStore {
    inner: InMemoryStore,
    table: Table,
    key: String,
}

impl FailingStore {
    pub fn new(inner: InMemoryStore, table: Table, key: &str) -> Self {
        Self {
            inner,
            table,
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl KvStore for FailingStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Row>> {
        self.inner.get(table, key).await
    }

    async fn scan_prefix(&self, table: Table, prefix: &str) -> Result<Vec<(String, Row)>> {
        self.inner.scan_prefix(table, prefix).await
    }

    async fn commit(&self, batch: CommitBatch) -> Result<()> {
        let hit = batch.writes.iter().any(|w| match w {
            Write::Put { table, key, .. } | Write::Delete { table, key } => {
                *table == self.table && *key == self.key
            }
        });
        if hit {
            return Err(StoreError::StorageError(format!(
                "injected fault writing {}/{}",
                self.table.name(),
                self.key
            )));
        }
        self.inner.commit(batch).await
    }
}

/// Sleeps before every commit that writes to `table`.
pub struct SlowStore {
    inner: InMemoryStore,
    table: Table,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: InMemoryStore, table: Table, delay: Duration) -> Self {
        Self {
            inner,
            table,
            delay,
        }
    }
}

#[async_trait]
impl KvStore for SlowStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Row>> {
        self.inner.get(table, key).await
    }

    async fn scan_prefix(&self, table: Table, prefix: &str) -> Result<Vec<(String, Row)>> {
        self.inner.scan_prefix(table, prefix).await
    }

    async fn commit(&self, batch: CommitBatch) -> Result<()> {
        let slow = batch.writes.iter().any(|w| match w {
            Write::Put { table, .. } | Write::Delete { table, .. } => *table == self.table,
        });
        if slow {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.commit(batch).await
    }
}
