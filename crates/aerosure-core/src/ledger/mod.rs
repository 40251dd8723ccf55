//! Ledger collaborator interface.
//!
//! The core never picks a persistence technology. It depends on a narrow
//! trait offering atomic `get` and version-checked `compare_and_swap` per
//! key, and every logical operation commits through exactly one swap. That
//! single commit point is what makes concurrent submissions from
//! independently-scheduled workers linearizable without double counts or
//! lost updates.
//!
//! [`MemoryLedger`] is the reference implementation used by tests and the
//! simulation binary.

use crate::errors::SuretyError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Bound on read-modify-write retries before an operation reports
/// [`SuretyError::Conflict`].
const MAX_CAS_ATTEMPTS: u32 = 8;

/// A stored value together with its version counter.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedValue {
    pub version: u64,
    pub value: serde_json::Value,
}

/// Failures reported by a ledger backend.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LedgerError {
    /// The expected version did not match the stored one.
    #[error("version conflict on {key}: expected {expected:?}, found {found:?}")]
    VersionConflict { key: String, expected: Option<u64>, found: Option<u64> },

    /// Backend-specific failure (I/O, encoding, connectivity).
    #[error("ledger backend failure: {0}")]
    Backend(String),
}

/// Atomic key-value storage with compare-and-set semantics per entity.
///
/// Implementations must apply each `compare_and_swap` atomically with
/// respect to every other call touching the same key.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Reads the current versioned value for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, LedgerError>;

    /// Writes `value` iff the stored version matches `expected`.
    ///
    /// `expected = None` means "create only if absent". Returns the new
    /// version on success.
    ///
    /// # Errors
    ///
    /// `VersionConflict` when the stored version differs from `expected`.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: serde_json::Value,
    ) -> Result<u64, LedgerError>;
}

/// In-memory [`Ledger`] backed by a `tokio` `RwLock`.
#[derive(Default)]
pub struct MemoryLedger {
    entries: RwLock<HashMap<String, VersionedValue>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries; used by tests and diagnostics.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, LedgerError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: serde_json::Value,
    ) -> Result<u64, LedgerError> {
        let mut entries = self.entries.write().await;
        let found = entries.get(key).map(|entry| entry.version);
        if found != expected {
            return Err(LedgerError::VersionConflict { key: key.to_string(), expected, found });
        }
        let version = found.unwrap_or(0) + 1;
        entries.insert(key.to_string(), VersionedValue { version, value });
        Ok(version)
    }
}

/// Outcome of a [`TypedStore::update`] closure.
pub enum Commit<T, R> {
    /// Persist the new record, then return the result.
    Write(T, R),
    /// Leave the stored record untouched and return the result (no-op path).
    Keep(R),
}

/// Typed read-modify-write access on top of a [`Ledger`].
///
/// `update` runs the classic optimistic loop: read the current record,
/// apply the mutation, commit with `compare_and_swap`, and retry from a
/// fresh read when another writer won the race. The retry bound turns
/// livelock into a reportable [`SuretyError::Conflict`].
#[derive(Clone)]
pub struct TypedStore {
    ledger: Arc<dyn Ledger>,
}

impl TypedStore {
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Reads and decodes the record at `key`.
    ///
    /// # Errors
    ///
    /// `Ledger` on backend failure or a corrupt (undecodable) record.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SuretyError> {
        match self.ledger.get(key).await? {
            Some(stored) => serde_json::from_value(stored.value)
                .map(Some)
                .map_err(|e| LedgerError::Backend(format!("corrupt record at {key}: {e}")).into()),
            None => Ok(None),
        }
    }

    /// Applies `apply` to the record at `key` under compare-and-swap.
    ///
    /// The closure sees the current record (or `None`) and decides whether
    /// to commit a replacement (`Commit::Write`) or finish without writing
    /// (`Commit::Keep`). It may run several times under contention and must
    /// therefore be free of side effects; publish events only after this
    /// method returns.
    ///
    /// # Errors
    ///
    /// Whatever `apply` returns, plus `Conflict` when the retry bound is
    /// exhausted and `Ledger` on backend failure.
    pub async fn update<T, R, F>(&self, key: &str, mut apply: F) -> Result<R, SuretyError>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> Result<Commit<T, R>, SuretyError>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.ledger.get(key).await?;
            let expected = current.as_ref().map(|stored| stored.version);
            let decoded = match current {
                Some(stored) => Some(serde_json::from_value(stored.value).map_err(|e| {
                    SuretyError::from(LedgerError::Backend(format!(
                        "corrupt record at {key}: {e}"
                    )))
                })?),
                None => None,
            };

            match apply(decoded)? {
                Commit::Keep(result) => return Ok(result),
                Commit::Write(record, result) => {
                    let value = serde_json::to_value(&record).map_err(|e| {
                        SuretyError::from(LedgerError::Backend(format!(
                            "unencodable record for {key}: {e}"
                        )))
                    })?;
                    match self.ledger.compare_and_swap(key, expected, value).await {
                        Ok(_) => return Ok(result),
                        Err(LedgerError::VersionConflict { .. }) => {
                            debug!(key, attempt, "compare-and-swap lost race, retrying");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        Err(SuretyError::Conflict { key: key.to_string(), attempts: MAX_CAS_ATTEMPTS })
    }
}
