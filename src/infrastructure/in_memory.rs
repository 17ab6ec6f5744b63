use crate::domain::ports::{
    ABSENT, CommitBatch, KvStore, ReadCheck, Row, Table, Version, Write, rows_match,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    rows: HashMap<Table, BTreeMap<String, Row>>,
    last_version: Version,
}

impl Tables {
    fn version_of(&self, table: Table, key: &str) -> Version {
        self.rows
            .get(&table)
            .and_then(|rows| rows.get(key))
            .map_or(ABSENT, |row| row.version)
    }

    fn scan(&self, table: Table, prefix: &str) -> Vec<(String, Row)> {
        let Some(rows) = self.rows.get(&table) else {
            return Vec::new();
        };
        rows.range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, row)| (key.clone(), row.clone()))
            .collect()
    }

    fn validate(&self, check: &ReadCheck) -> Result<()> {
        let holds = match check {
            ReadCheck::Key {
                table,
                key,
                version,
            } => self.version_of(*table, key) == *version,
            ReadCheck::Prefix {
                table,
                prefix,
                rows,
            } => rows_match(&self.scan(*table, prefix), rows),
        };
        if holds { Ok(()) } else { Err(check.conflict()) }
    }
}

/// A thread-safe in-memory store.
///
/// Uses `Arc<RwLock<..>>` so clones share the same tables. Commits validate
/// their read set and apply their writes under the write lock, so a commit is
/// never observed half-applied. Ideal for testing or when persistence is not
/// required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Row>> {
        let tables = self.tables.read().await;
        Ok(tables.rows.get(&table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn scan_prefix(&self, table: Table, prefix: &str) -> Result<Vec<(String, Row)>> {
        let tables = self.tables.read().await;
        Ok(tables.scan(table, prefix))
    }

    async fn commit(&self, batch: CommitBatch) -> Result<()> {
        let mut tables = self.tables.write().await;
        for check in &batch.checks {
            tables.validate(check)?;
        }
        if batch.is_read_only() {
            return Ok(());
        }

        tables.last_version += 1;
        let version = tables.last_version;
        for write in batch.writes {
            match write {
                Write::Put { table, key, value } => {
                    tables
                        .rows
                        .entry(table)
                        .or_default()
                        .insert(key, Row { version, value });
                }
                Write::Delete { table, key } => {
                    if let Some(rows) = tables.rows.get_mut(&table) {
                        rows.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
