use crate::domain::ports::{ABSENT, CommitBatch, ReadCheck, StoreHandle, Table, Version, Write};
use crate::error::{Result, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};

type RowId = (Table, String);

/// A serializable unit of work over a [`KvStore`](crate::domain::ports::KvStore).
///
/// Reads go to the store once and are cached, writes are buffered. `commit`
/// hands the store every version that was observed together with every
/// buffered write; the store applies all of it or, if anything observed has
/// since changed, none of it. Dropping a unit of work without committing is
/// a rollback: nothing it wrote is ever visible.
pub struct UnitOfWork {
    store: StoreHandle,
    observed: HashMap<RowId, Version>,
    cache: HashMap<RowId, Option<Vec<u8>>>,
    scans: Vec<ReadCheck>,
    writes: BTreeMap<RowId, Option<Vec<u8>>>,
}

impl UnitOfWork {
    pub fn begin(store: StoreHandle) -> Self {
        Self {
            store,
            observed: HashMap::new(),
            cache: HashMap::new(),
            scans: Vec::new(),
            writes: BTreeMap::new(),
        }
    }

    async fn read_raw(&mut self, table: Table, key: &str) -> Result<Option<Vec<u8>>> {
        let id = (table, key.to_string());
        if let Some(pending) = self.writes.get(&id) {
            return Ok(pending.clone());
        }
        if let Some(seen) = self.cache.get(&id) {
            return Ok(seen.clone());
        }

        let row = self.store.get(table, key).await?;
        self.observed
            .insert(id.clone(), row.as_ref().map_or(ABSENT, |r| r.version));
        let value = row.map(|r| r.value);
        self.cache.insert(id, value.clone());
        Ok(value)
    }

    pub async fn get<T: DeserializeOwned>(&mut self, table: Table, key: &str) -> Result<Option<T>> {
        match self.read_raw(table, key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get) but a missing row is `NotFound`.
    pub async fn require<T: DeserializeOwned>(
        &mut self,
        table: Table,
        key: &str,
        entity: &'static str,
    ) -> Result<T> {
        self.get(table, key)
            .await?
            .ok_or_else(|| StoreError::not_found(entity, key))
    }

    /// Every row under `prefix`, in key order, with this unit's own writes applied.
    pub async fn scan<T: DeserializeOwned>(&mut self, table: Table, prefix: &str) -> Result<Vec<T>> {
        let rows = self.store.scan_prefix(table, prefix).await?;
        self.scans.push(ReadCheck::Prefix {
            table,
            prefix: prefix.to_string(),
            rows: rows.iter().map(|(k, r)| (k.clone(), r.version)).collect(),
        });

        let mut merged: BTreeMap<String, Vec<u8>> =
            rows.into_iter().map(|(k, r)| (k, r.value)).collect();
        for ((pending_table, key), pending) in self.writes.range((table, prefix.to_string())..) {
            if *pending_table != table || !key.starts_with(prefix) {
                break;
            }
            match pending {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }

        merged
            .values()
            .map(|bytes| serde_json::from_slice(bytes).map_err(StoreError::from))
            .collect()
    }

    pub fn put<T: Serialize>(&mut self, table: Table, key: impl Into<String>, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.writes.insert((table, key.into()), Some(bytes));
        Ok(())
    }

    pub fn delete(&mut self, table: Table, key: impl Into<String>) {
        self.writes.insert((table, key.into()), None);
    }

    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    pub async fn commit(self) -> Result<()> {
        let mut checks: Vec<ReadCheck> = self
            .observed
            .into_iter()
            .map(|((table, key), version)| ReadCheck::Key {
                table,
                key,
                version,
            })
            .collect();
        checks.extend(self.scans);

        let writes = self
            .writes
            .into_iter()
            .map(|((table, key), value)| match value {
                Some(value) => Write::Put { table, key, value },
                None => Write::Delete { table, key },
            })
            .collect();

        self.store.commit(CommitBatch { checks, writes }).await
    }
}
