use crate::error::StoreError;
use serde::{Deserialize, Serialize};

const MIN_DIGITS: usize = 3;
const MAX_PREFIX_LEN: usize = 16;

/// Per-prefix counter row. `sequence` is the last value handed out.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SequenceCounter {
    pub id: String,
    pub sequence: u64,
}

impl SequenceCounter {
    pub fn new(prefix: &str) -> Self {
        Self {
            id: prefix.to_string(),
            sequence: 1,
        }
    }

    /// Advances the counter and returns the new value.
    pub fn advance(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Renders `prefix` followed by `sequence` zero-padded to at least three digits.
///
/// The width grows past 999 instead of truncating: `CAT999`, `CAT1000`.
pub fn format_id(prefix: &str, sequence: u64) -> String {
    format!("{prefix}{sequence:0width$}", width = MIN_DIGITS)
}

pub fn validate_prefix(prefix: &str) -> Result<(), StoreError> {
    if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
        return Err(StoreError::ValidationError(format!(
            "ID prefix must be 1 to {MAX_PREFIX_LEN} characters, got {:?}",
            prefix
        )));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(StoreError::ValidationError(format!(
            "ID prefix must be alphabetic, got {:?}",
            prefix
        )));
    }
    Ok(())
}
