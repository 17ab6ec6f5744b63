//! Storage adapters implementing [`crate::domain::ports::KvStore`].

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
