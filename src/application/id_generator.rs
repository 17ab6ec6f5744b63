use super::retry::{RetryConfig, retry_on_conflict};
use super::unit_of_work::UnitOfWork;
use crate::domain::ports::{StoreHandle, Table};
use crate::domain::sequence::{SequenceCounter, format_id, validate_prefix};
use crate::error::{Result, StoreError};
use tracing::{debug, error, info, instrument};

/// Issues human-readable identifiers such as `PROD003` or `ORD014`.
///
/// Each prefix has one counter row. Every call reads it, bumps it and writes
/// it back inside its own [`UnitOfWork`]; two callers racing on the same
/// prefix cannot both commit the same value, the loser sees a
/// `ConcurrencyConflict` and, in [`generate_id`](Self::generate_id), retries.
/// Different prefixes never touch the same row.
#[derive(Clone)]
pub struct IdGenerator {
    store: StoreHandle,
    retry: RetryConfig,
}

impl IdGenerator {
    pub fn new(store: StoreHandle, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Generates the next ID for `prefix`, retrying lost races.
    ///
    /// Fails with `IdGenerationFailed` when the prefix is invalid, storage
    /// fails, or every attempt lost a race.
    #[instrument(skip(self))]
    pub async fn generate_id(&self, prefix: &str) -> Result<String> {
        validate_prefix(prefix).map_err(|e| generation_failed(prefix, e))?;

        retry_on_conflict(&self.retry, || self.next_id(prefix))
            .await
            .map_err(|e| {
                error!(error = %e, "Error generating ID for prefix {}", prefix);
                generation_failed(prefix, e)
            })
    }

    /// Single attempt. A lost race is returned as `ConcurrencyConflict` for
    /// the caller to retry; any other failure is `IdGenerationFailed`.
    pub async fn try_generate_id(&self, prefix: &str) -> Result<String> {
        validate_prefix(prefix).map_err(|e| generation_failed(prefix, e))?;

        self.next_id(prefix).await.map_err(|e| {
            if e.is_conflict() {
                e
            } else {
                generation_failed(prefix, e)
            }
        })
    }

    async fn next_id(&self, prefix: &str) -> Result<String> {
        let mut uow = UnitOfWork::begin(self.store.clone());

        let counter = match uow.get::<SequenceCounter>(Table::Sequences, prefix).await? {
            None => {
                info!("Creating new sequence counter for prefix: {}", prefix);
                SequenceCounter::new(prefix)
            }
            Some(mut counter) => {
                counter.advance();
                debug!(
                    "Incremented sequence counter for {} to {}",
                    prefix, counter.sequence
                );
                counter
            }
        };

        uow.put(Table::Sequences, prefix, &counter)?;
        uow.commit().await?;

        let id = format_id(prefix, counter.sequence);
        info!("Generated new ID: {}", id);
        Ok(id)
    }
}

fn generation_failed(prefix: &str, source: StoreError) -> StoreError {
    StoreError::IdGenerationFailed {
        prefix: prefix.to_string(),
        source: Box::new(source),
    }
}
