use crate::error::{Result, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// The tables a store must provide. Keys are strings, values are opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Sequences,
    Products,
    Rarities,
    Variants,
    Carts,
    CartItems,
    Orders,
    OrderItems,
    ShippingAddresses,
    OrderKeys,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Sequences,
        Table::Products,
        Table::Rarities,
        Table::Variants,
        Table::Carts,
        Table::CartItems,
        Table::Orders,
        Table::OrderItems,
        Table::ShippingAddresses,
        Table::OrderKeys,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Sequences => "sequences",
            Table::Products => "products",
            Table::Rarities => "rarities",
            Table::Variants => "variants",
            Table::Carts => "carts",
            Table::CartItems => "cart_items",
            Table::Orders => "orders",
            Table::OrderItems => "order_items",
            Table::ShippingAddresses => "shipping_addresses",
            Table::OrderKeys => "order_keys",
        }
    }
}

/// Row version. Every committed write stamps a fresh, store-wide increasing version.
/// `ABSENT` is what a reader records when the key did not exist.
pub type Version = u64;
pub const ABSENT: Version = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub version: Version,
    pub value: Vec<u8>,
}

/// A read that must still hold at commit time.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadCheck {
    Key {
        table: Table,
        key: String,
        version: Version,
    },
    /// The exact set of `(key, version)` pairs seen under `prefix`. Guards against phantoms.
    Prefix {
        table: Table,
        prefix: String,
        rows: Vec<(String, Version)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Put {
        table: Table,
        key: String,
        value: Vec<u8>,
    },
    Delete {
        table: Table,
        key: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitBatch {
    pub checks: Vec<ReadCheck>,
    pub writes: Vec<Write>,
}

impl CommitBatch {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Row>>;
    /// All rows whose key starts with `prefix`, in key order.
    async fn scan_prefix(&self, table: Table, prefix: &str) -> Result<Vec<(String, Row)>>;
    /// Validates every check and applies every write as one atomic step.
    ///
    /// Fails with `ConcurrencyConflict` and applies nothing if any checked
    /// read has changed since it was taken.
    async fn commit(&self, batch: CommitBatch) -> Result<()>;
}

pub type StoreHandle = Arc<dyn KvStore>;

impl ReadCheck {
    pub fn table(&self) -> Table {
        match self {
            ReadCheck::Key { table, .. } | ReadCheck::Prefix { table, .. } => *table,
        }
    }

    /// The error a store reports when this check no longer holds.
    pub fn conflict(&self) -> StoreError {
        let key = match self {
            ReadCheck::Key { key, .. } => key.clone(),
            ReadCheck::Prefix { prefix, .. } => format!("{prefix}*"),
        };
        StoreError::ConcurrencyConflict {
            table: self.table().name(),
            key,
        }
    }
}

/// True when a fresh prefix scan still shows exactly the rows a reader saw.
pub fn rows_match(current: &[(String, Row)], seen: &[(String, Version)]) -> bool {
    current.len() == seen.len()
        && current
            .iter()
            .zip(seen)
            .all(|((key, row), (seen_key, seen_version))| {
                key == seen_key && row.version == *seen_version
            })
}
