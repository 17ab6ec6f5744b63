use crate::domain::ports::{
    ABSENT, CommitBatch, KvStore, ReadCheck, Row, Table, Version, Write, rows_match,
};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family holding store bookkeeping (the last committed version).
pub const CF_META: &str = "meta";
const LAST_VERSION_KEY: &[u8] = b"last_version";
const VERSION_LEN: usize = 8;

/// A persistent store implementation using RocksDB.
///
/// Every [`Table`] gets its own Column Family. Values are framed as an
/// 8-byte big-endian version followed by the payload. Commits are validated
/// and written as a single `WriteBatch` while holding `commit_lock`; RocksDB
/// only lets one process open a database, so the lock covers every writer.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that one column family per table, plus `meta`, exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = Table::ALL
            .iter()
            .map(|table| table.name())
            .chain(std::iter::once(CF_META))
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::StorageError(format!("{name} column family not found")))
    }

    fn read_row(&self, table: Table, key: &str) -> Result<Option<Row>> {
        let cf = self.cf(table.name())?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn scan_rows(&self, table: Table, prefix: &str) -> Result<Vec<(String, Row)>> {
        let cf = self.cf(table.name())?;
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );

        let mut rows = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.to_vec()).map_err(|e| {
                StoreError::StorageError(format!("Non UTF-8 key in {}: {}", table.name(), e))
            })?;
            rows.push((key, decode(&value)?));
        }
        Ok(rows)
    }

    fn last_version(&self) -> Result<Version> {
        let meta = self.cf(CF_META)?;
        match self.db.get_cf(&meta, LAST_VERSION_KEY)? {
            Some(bytes) => read_version(&bytes),
            None => Ok(ABSENT),
        }
    }

    fn holds(&self, check: &ReadCheck) -> Result<bool> {
        Ok(match check {
            ReadCheck::Key {
                table,
                key,
                version,
            } => self.read_row(*table, key)?.map_or(ABSENT, |row| row.version) == *version,
            ReadCheck::Prefix {
                table,
                prefix,
                rows,
            } => rows_match(&self.scan_rows(*table, prefix)?, rows),
        })
    }

    fn commit_blocking(&self, batch: CommitBatch) -> Result<()> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| StoreError::StorageError("Commit lock poisoned".to_string()))?;

        for check in &batch.checks {
            if !self.holds(check)? {
                return Err(check.conflict());
            }
        }
        if batch.is_read_only() {
            return Ok(());
        }

        let version = self.last_version()? + 1;
        let mut wb = WriteBatch::default();
        for write in &batch.writes {
            match write {
                Write::Put { table, key, value } => {
                    let cf = self.cf(table.name())?;
                    wb.put_cf(&cf, key.as_bytes(), encode(version, value));
                }
                Write::Delete { table, key } => {
                    let cf = self.cf(table.name())?;
                    wb.delete_cf(&cf, key.as_bytes());
                }
            }
        }
        let meta = self.cf(CF_META)?;
        wb.put_cf(&meta, LAST_VERSION_KEY, version.to_be_bytes());

        self.db.write(wb)?;
        Ok(())
    }
}

fn encode(version: Version, value: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(VERSION_LEN + value.len());
    bytes.extend_from_slice(&version.to_be_bytes());
    bytes.extend_from_slice(value);
    bytes
}

fn read_version(bytes: &[u8]) -> Result<Version> {
    let head: [u8; VERSION_LEN] = bytes
        .get(..VERSION_LEN)
        .and_then(|head| head.try_into().ok())
        .ok_or_else(|| StoreError::StorageError("Truncated row version".to_string()))?;
    Ok(Version::from_be_bytes(head))
}

fn decode(bytes: &[u8]) -> Result<Row> {
    let version = read_version(bytes)?;
    Ok(Row {
        version,
        value: bytes[VERSION_LEN..].to_vec(),
    })
}

#[async_trait]
impl KvStore for RocksDBStore {
    async fn get(&self, table: Table, key: &str) -> Result<Option<Row>> {
        self.read_row(table, key)
    }

    async fn scan_prefix(&self, table: Table, prefix: &str) -> Result<Vec<(String, Row)>> {
        self.scan_rows(table, prefix)
    }

    async fn commit(&self, batch: CommitBatch) -> Result<()> {
        self.commit_blocking(batch)
    }
}
