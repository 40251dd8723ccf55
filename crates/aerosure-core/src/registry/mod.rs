//! Participant registry: oracles, airlines, and their funding state.
//!
//! The registry owns participant records. Airline admission itself routes
//! through the admission engine in [`crate::consensus::admission`], which is
//! the only writer of the `registered` flag; the registry stores the field
//! and exposes the read surface.
//!
//! All airline state lives in a single ledger document so that funding
//! updates and admissions commit through one compare-and-swap each, keeping
//! the registered-airline count consistent with the records it is derived
//! from. Oracle records are independent entities under their own keys.

pub mod indexes;

use crate::{
    config::RegistryConfig,
    errors::SuretyError,
    events::{Event, EventBus},
    ledger::{Commit, Ledger, TypedStore},
    types::ParticipantId,
};
use self::indexes::{EntropySource, IndexAssigner};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info};

/// Ledger document holding every airline record.
pub(crate) const AIRLINE_DIRECTORY_KEY: &str = "participants/airlines";

fn oracle_key(id: &str) -> String {
    format!("participants/oracle/{id}")
}

/// Stored state of one registered oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OracleRecord {
    indexes: Vec<u8>,
    fee_paid: u64,
}

/// Stored state of one airline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AirlineRecord {
    pub registered: bool,
    pub funded: bool,
    pub funding_total: u64,
}

/// All airline records keyed by participant id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AirlineDirectory {
    pub airlines: BTreeMap<String, AirlineRecord>,
}

impl AirlineDirectory {
    pub fn registered_count(&self) -> usize {
        self.airlines.values().filter(|record| record.registered).count()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.airlines.get(id).is_some_and(|record| record.registered)
    }

    pub fn is_funded(&self, id: &str) -> bool {
        self.airlines.get(id).is_some_and(|record| record.funded)
    }
}

/// Registry of known participants.
pub struct ParticipantRegistry {
    config: RegistryConfig,
    store: TypedStore,
    events: Arc<EventBus>,
    assigner: Arc<IndexAssigner>,
}

impl ParticipantRegistry {
    #[must_use]
    pub fn new(
        config: RegistryConfig,
        ledger: Arc<dyn Ledger>,
        events: Arc<EventBus>,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        let assigner = Arc::new(IndexAssigner::new(&config, entropy));
        Self { config, store: TypedStore::new(ledger), events, assigner }
    }

    /// Index assigner shared with the flight status engine, which derives
    /// request indexes the same way oracle indexes are derived.
    #[must_use]
    pub fn assigner(&self) -> Arc<IndexAssigner> {
        Arc::clone(&self.assigner)
    }

    /// Registers an oracle and assigns its index set.
    ///
    /// The assignment happens exactly once; the stored set is immutable for
    /// the oracle's lifetime.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` below the registration fee, `AlreadyRegistered`
    /// on repeat registration.
    pub async fn register_oracle(
        &self,
        oracle: &ParticipantId,
        fee: u64,
    ) -> Result<Vec<u8>, SuretyError> {
        if fee < self.config.oracle_registration_fee {
            return Err(SuretyError::InsufficientFunds {
                provided: fee,
                required: self.config.oracle_registration_fee,
            });
        }

        let key = oracle_key(oracle);
        let assigned = self.assigner.assign(oracle);
        let indexes = self
            .store
            .update::<OracleRecord, Vec<u8>, _>(&key, |current| {
                if current.is_some() {
                    return Err(SuretyError::AlreadyRegistered(format!("oracle {oracle}")));
                }
                let record = OracleRecord { indexes: assigned.clone(), fee_paid: fee };
                Ok(Commit::Write(record, assigned.clone()))
            })
            .await?;

        info!(oracle = %oracle, ?indexes, "oracle registered");
        self.events
            .publish(Event::OracleRegistered { oracle: Arc::clone(oracle), indexes: indexes.clone() });
        Ok(indexes)
    }

    /// Returns the oracle's assigned index set.
    ///
    /// # Errors
    ///
    /// `NotFound` if the oracle never registered.
    pub async fn oracle_indexes(&self, oracle: &ParticipantId) -> Result<Vec<u8>, SuretyError> {
        self.store
            .get::<OracleRecord>(&oracle_key(oracle))
            .await?
            .map(|record| record.indexes)
            .ok_or_else(|| SuretyError::NotFound(format!("oracle {oracle}")))
    }

    /// Records airline funding; `funded` flips once the accumulated total
    /// meets the threshold and never flips back.
    ///
    /// Repeat calls are idempotent in effect: totals accumulate, the flag is
    /// monotone.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown airline, `InsufficientFunds` when a single
    /// payment is below the threshold and the airline is not yet funded.
    pub async fn fund_airline(
        &self,
        airline: &ParticipantId,
        amount: u64,
    ) -> Result<(), SuretyError> {
        let threshold = self.config.funding_threshold;
        let total = self
            .store
            .update::<AirlineDirectory, u64, _>(AIRLINE_DIRECTORY_KEY, |current| {
                let mut directory = current.unwrap_or_default();
                let Some(record) = directory.airlines.get_mut(airline.as_ref()) else {
                    return Err(SuretyError::NotFound(format!("airline {airline}")));
                };
                if !record.funded && amount < threshold {
                    return Err(SuretyError::InsufficientFunds {
                        provided: amount,
                        required: threshold,
                    });
                }
                record.funding_total += amount;
                record.funded = true;
                let total = record.funding_total;
                Ok(Commit::Write(directory, total))
            })
            .await?;

        debug!(airline = %airline, total, "airline funded");
        self.events.publish(Event::AirlineFunded { airline: Arc::clone(airline), total });
        Ok(())
    }

    pub async fn is_airline_registered(&self, airline: &ParticipantId) -> Result<bool, SuretyError> {
        Ok(self.directory().await?.is_registered(airline))
    }

    pub async fn is_airline_funded(&self, airline: &ParticipantId) -> Result<bool, SuretyError> {
        Ok(self.directory().await?.is_funded(airline))
    }

    /// Number of currently registered airlines; the live quorum denominator.
    pub async fn registered_airline_count(&self) -> Result<usize, SuretyError> {
        Ok(self.directory().await?.registered_count())
    }

    /// Ids of all registered airlines, in stable order.
    pub async fn registered_airlines(&self) -> Result<Vec<ParticipantId>, SuretyError> {
        Ok(self
            .directory()
            .await?
            .airlines
            .iter()
            .filter(|(_, record)| record.registered)
            .map(|(id, _)| ParticipantId::from(id.as_str()))
            .collect())
    }

    pub(crate) async fn directory(&self) -> Result<AirlineDirectory, SuretyError> {
        Ok(self.store.get::<AirlineDirectory>(AIRLINE_DIRECTORY_KEY).await?.unwrap_or_default())
    }

    /// Marks a candidate as registered. Admission-engine use only: the
    /// `registered` flag is monotone and this is its single writer.
    pub(crate) async fn admit(&self, candidate: &ParticipantId) -> Result<(), SuretyError> {
        self.store
            .update::<AirlineDirectory, (), _>(AIRLINE_DIRECTORY_KEY, |current| {
                let mut directory = current.unwrap_or_default();
                let record = directory.airlines.entry(candidate.to_string()).or_default();
                if record.registered {
                    return Ok(Commit::Keep(()));
                }
                record.registered = true;
                Ok(Commit::Write(directory, ()))
            })
            .await
    }
}
