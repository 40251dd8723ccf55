//! Airline admission consensus engine.
//!
//! Two regimes, switched on the live registered-airline count:
//!
//! - **Bootstrap** (fewer than `bootstrap_count` registered): one authorized
//!   call admits the candidate outright. The very first call is privileged
//!   to the configured registrar; every later bootstrap call must come from
//!   a funded, registered airline.
//! - **Quorum** (at or above `bootstrap_count`): each call from a funded,
//!   registered airline casts that airline's vote and checks quorum in the
//!   same step. The threshold recomputes against the registered count at
//!   vote time, never against a snapshot taken when the candidate was first
//!   proposed; late joiners change the denominator.
//!
//! Repeat votes from the same voter are benign no-ops. Votes are retained
//! after admission for audit and are never invalidated when a voter later
//! loses funding.

use crate::{
    config::AdmissionConfig,
    errors::SuretyError,
    events::{Event, EventBus},
    ledger::{Commit, Ledger, TypedStore},
    registry::ParticipantRegistry,
    types::ParticipantId,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info};

fn ballot_key(candidate: &ParticipantId) -> String {
    format!("ballots/{candidate}")
}

/// Stored vote set for one candidate airline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BallotRecord {
    voters: BTreeSet<String>,
}

/// Result of a registration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// The candidate is now registered.
    Registered { votes: usize },
    /// The vote was counted; quorum not yet reached.
    Pending { votes: usize, required: usize },
    /// The caller had already voted for this candidate; tally unchanged.
    AlreadyVoted { votes: usize, required: usize },
    /// The candidate was registered before this call; nothing changed.
    AlreadyRegistered,
}

/// Runs the bootstrap and quorum admission rules.
pub struct AdmissionEngine {
    config: AdmissionConfig,
    store: TypedStore,
    events: Arc<EventBus>,
    registry: Arc<ParticipantRegistry>,
    /// Serializes admission decisions: one registration call spans the
    /// ballot record and the airline directory, and interleaving two such
    /// calls could otherwise admit on a stale count.
    gate: Mutex<()>,
}

impl AdmissionEngine {
    #[must_use]
    pub fn new(
        config: AdmissionConfig,
        ledger: Arc<dyn Ledger>,
        events: Arc<EventBus>,
        registry: Arc<ParticipantRegistry>,
    ) -> Self {
        Self { config, store: TypedStore::new(ledger), events, registry, gate: Mutex::new(()) }
    }

    /// Registers (or votes for) `candidate` on behalf of `by`.
    ///
    /// # Errors
    ///
    /// `NotAuthorized` when the caller holds no admitting role for the
    /// current regime, `NotFunded` when a registered airline tries to vote
    /// before meeting the funding threshold.
    pub async fn register_airline(
        &self,
        candidate: &ParticipantId,
        by: &ParticipantId,
    ) -> Result<AdmissionOutcome, SuretyError> {
        let _gate = self.gate.lock().await;

        let directory = self.registry.directory().await?;
        if directory.is_registered(candidate) {
            debug!(candidate = %candidate, "candidate already registered");
            return Ok(AdmissionOutcome::AlreadyRegistered);
        }

        let registered_count = directory.registered_count();
        if registered_count < self.config.bootstrap_count {
            self.bootstrap(candidate, by, registered_count, &directory).await
        } else {
            self.vote(candidate, by, registered_count, &directory).await
        }
    }

    /// Number of distinct voters required at the given registered count.
    #[must_use]
    pub fn required_votes(&self, registered_count: usize) -> usize {
        (registered_count * self.config.quorum_numerator).div_ceil(self.config.quorum_denominator)
    }

    async fn bootstrap(
        &self,
        candidate: &ParticipantId,
        by: &ParticipantId,
        registered_count: usize,
        directory: &crate::registry::AirlineDirectory,
    ) -> Result<AdmissionOutcome, SuretyError> {
        if registered_count == 0 {
            if by.as_ref() != self.config.registrar {
                return Err(SuretyError::NotAuthorized(format!(
                    "only the registrar may bootstrap the first airline, not {by}"
                )));
            }
        } else if !directory.is_registered(by) || !directory.is_funded(by) {
            return Err(SuretyError::NotAuthorized(format!(
                "{by} is not a funded registered airline"
            )));
        }

        self.registry.admit(candidate).await?;
        info!(candidate = %candidate, by = %by, registered_count, "airline admitted (bootstrap)");
        self.events.publish(Event::AirlineRegistered { airline: Arc::clone(candidate), votes: 1 });
        Ok(AdmissionOutcome::Registered { votes: 1 })
    }

    async fn vote(
        &self,
        candidate: &ParticipantId,
        by: &ParticipantId,
        registered_count: usize,
        directory: &crate::registry::AirlineDirectory,
    ) -> Result<AdmissionOutcome, SuretyError> {
        if !directory.is_registered(by) {
            return Err(SuretyError::NotAuthorized(format!("{by} is not a registered airline")));
        }
        if !directory.is_funded(by) {
            return Err(SuretyError::NotFunded(by.to_string()));
        }

        let required = self.required_votes(registered_count);
        let (votes, fresh_vote) = self
            .store
            .update::<BallotRecord, (usize, bool), _>(&ballot_key(candidate), |current| {
                let mut ballot = current.unwrap_or_default();
                if ballot.voters.contains(by.as_ref()) {
                    return Ok(Commit::Keep((ballot.voters.len(), false)));
                }
                ballot.voters.insert(by.to_string());
                let votes = ballot.voters.len();
                Ok(Commit::Write(ballot, (votes, true)))
            })
            .await?;

        if !fresh_vote {
            debug!(candidate = %candidate, voter = %by, votes, "repeat vote ignored");
            return Ok(AdmissionOutcome::AlreadyVoted { votes, required });
        }

        self.events.publish(Event::VoteRecorded {
            candidate: Arc::clone(candidate),
            voter: Arc::clone(by),
            votes,
            required,
        });

        if votes >= required {
            self.registry.admit(candidate).await?;
            info!(candidate = %candidate, votes, required, "airline admitted (quorum)");
            self.events
                .publish(Event::AirlineRegistered { airline: Arc::clone(candidate), votes });
            Ok(AdmissionOutcome::Registered { votes })
        } else {
            debug!(candidate = %candidate, voter = %by, votes, required, "vote recorded, quorum pending");
            Ok(AdmissionOutcome::Pending { votes, required })
        }
    }
}
