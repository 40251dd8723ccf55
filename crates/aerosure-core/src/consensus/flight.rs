//! Flight status consensus engine.
//!
//! One record per flight tracks the current opening (index, accepted
//! responses) and the archived history of previous openings. Every
//! submission commits through a single compare-and-swap on that record, so
//! racing oracle workers interleave in any order without double counts.
//!
//! Finality is first-code-to-threshold: the moment any status code
//! accumulates `min_responses` accepted responses the opening finalizes and
//! every later submission is a benign no-op. There is no timeout and no
//! closing event; an opening that never reaches threshold simply stays
//! accepting.

use crate::{
    config::ConsensusConfig,
    errors::SuretyError,
    events::{Event, EventBus},
    ledger::{Commit, Ledger, TypedStore},
    registry::{indexes::IndexAssigner, ParticipantRegistry},
    types::{FlightKey, ParticipantId, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info};

fn request_key(flight: &FlightKey) -> String {
    format!("requests/{flight}")
}

/// Stored per-flight request state: the live opening plus archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RequestRecord {
    /// Index the current opening was announced under.
    index: u8,
    /// Monotonic re-inquiry counter; starts at 1.
    opening: u64,
    /// Set exactly once per opening.
    status: Option<StatusCode>,
    /// Accepted responses of the current opening, one per oracle.
    responses: BTreeMap<String, StatusCode>,
    /// Finalized prior openings, oldest first.
    history: Vec<ClosedOpening>,
}

impl RequestRecord {
    fn tally(&self, status: StatusCode) -> usize {
        self.responses.values().filter(|&&recorded| recorded == status).count()
    }

    fn tallies(&self) -> BTreeMap<StatusCode, usize> {
        let mut tallies = BTreeMap::new();
        for status in self.responses.values() {
            *tallies.entry(*status).or_insert(0) += 1;
        }
        tallies
    }
}

/// Audit record of a finalized opening.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClosedOpening {
    opening: u64,
    index: u8,
    status: StatusCode,
    responses: usize,
}

/// Handle returned when a request opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedRequest {
    pub index: u8,
    pub opening: u64,
}

/// Result of a response submission.
///
/// `Duplicate` and `Closed` are the benign no-op paths: callers may retry
/// any submission freely without a distinct failure in the fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Counted toward the tally; threshold not yet reached.
    Accepted { tally: usize },
    /// This response pushed its status code over the threshold.
    Finalized { status: StatusCode },
    /// The oracle already responded to this opening; tally unchanged.
    Duplicate,
    /// The opening already finalized; submission ignored.
    Closed,
}

/// Read-only view of a flight's current opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub index: u8,
    pub opening: u64,
    pub status: Option<StatusCode>,
    pub tallies: BTreeMap<StatusCode, usize>,
}

/// Coordinates status requests and oracle responses per flight.
pub struct FlightStatusEngine {
    config: ConsensusConfig,
    store: TypedStore,
    events: Arc<EventBus>,
    registry: Arc<ParticipantRegistry>,
    assigner: Arc<IndexAssigner>,
}

impl FlightStatusEngine {
    #[must_use]
    pub fn new(
        config: ConsensusConfig,
        ledger: Arc<dyn Ledger>,
        events: Arc<EventBus>,
        registry: Arc<ParticipantRegistry>,
    ) -> Self {
        let assigner = registry.assigner();
        Self { config, store: TypedStore::new(ledger), events, registry, assigner }
    }

    /// Opens a status request for `flight`.
    ///
    /// The request index is derived the same way oracle indexes are; only
    /// oracles holding that index may respond. Re-querying a finalized
    /// flight archives the previous opening and starts a fresh tally.
    ///
    /// # Errors
    ///
    /// `InvalidState` if an opening for this flight is still accepting.
    pub async fn open_request(&self, flight: &FlightKey) -> Result<OpenedRequest, SuretyError> {
        let index = self.assigner.pick(&flight.to_string());
        let opened = self
            .store
            .update::<RequestRecord, OpenedRequest, _>(&request_key(flight), |current| {
                let record = match current {
                    None => RequestRecord {
                        index,
                        opening: 1,
                        status: None,
                        responses: BTreeMap::new(),
                        history: Vec::new(),
                    },
                    Some(previous) => {
                        let Some(status) = previous.status else {
                            return Err(SuretyError::InvalidState(format!(
                                "request for {flight} is still accepting responses"
                            )));
                        };
                        let mut history = previous.history;
                        history.push(ClosedOpening {
                            opening: previous.opening,
                            index: previous.index,
                            status,
                            responses: previous.responses.len(),
                        });
                        RequestRecord {
                            index,
                            opening: previous.opening + 1,
                            status: None,
                            responses: BTreeMap::new(),
                            history,
                        }
                    }
                };
                let opened = OpenedRequest { index: record.index, opening: record.opening };
                Ok(Commit::Write(record, opened))
            })
            .await?;

        info!(flight = %flight, index = opened.index, opening = opened.opening, "status request opened");
        self.events.publish(Event::RequestOpened {
            flight: flight.clone(),
            index: opened.index,
            opening: opened.opening,
        });
        Ok(opened)
    }

    /// Submits one oracle's status observation against an open request.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown oracle or flight, `IndexMismatch` when the
    /// submitted index is not the request's or not among the oracle's
    /// assigned indexes. Duplicate and post-finalization submissions are
    /// no-op outcomes, not errors.
    pub async fn submit_response(
        &self,
        oracle: &ParticipantId,
        index: u8,
        flight: &FlightKey,
        status: StatusCode,
    ) -> Result<ResponseOutcome, SuretyError> {
        let assigned = self.registry.oracle_indexes(oracle).await?;
        if !assigned.contains(&index) {
            return Err(SuretyError::IndexMismatch(format!(
                "oracle {oracle} does not hold index {index}"
            )));
        }

        let min_responses = self.config.min_responses;
        let outcome = self
            .store
            .update::<RequestRecord, ResponseOutcome, _>(&request_key(flight), |current| {
                let Some(mut record) = current else {
                    return Err(SuretyError::NotFound(format!("no status request for {flight}")));
                };

                // A finalized opening absorbs late submissions silently; racing
                // workers must not see an error for losing the race.
                if record.status.is_some() {
                    return Ok(Commit::Keep(ResponseOutcome::Closed));
                }

                if record.index != index {
                    return Err(SuretyError::IndexMismatch(format!(
                        "request for {flight} is open under index {}, not {index}",
                        record.index
                    )));
                }

                if record.responses.contains_key(oracle.as_ref()) {
                    return Ok(Commit::Keep(ResponseOutcome::Duplicate));
                }

                record.responses.insert(oracle.to_string(), status);
                let tally = record.tally(status);
                if tally >= min_responses {
                    if record.responses.len() < tally {
                        return Err(SuretyError::Internal(format!(
                            "tally for {flight} exceeds recorded responses"
                        )));
                    }
                    record.status = Some(status);
                    Ok(Commit::Write(record, ResponseOutcome::Finalized { status }))
                } else {
                    Ok(Commit::Write(record, ResponseOutcome::Accepted { tally }))
                }
            })
            .await?;

        match &outcome {
            ResponseOutcome::Accepted { tally } => {
                debug!(flight = %flight, oracle = %oracle, %status, tally, "response recorded");
                self.events.publish(Event::ResponseRecorded {
                    flight: flight.clone(),
                    oracle: Arc::clone(oracle),
                    status,
                    tally: *tally,
                });
            }
            ResponseOutcome::Finalized { status } => {
                let status = *status;
                info!(flight = %flight, %status, "status request finalized");
                self.events.publish(Event::ResponseRecorded {
                    flight: flight.clone(),
                    oracle: Arc::clone(oracle),
                    status,
                    tally: min_responses,
                });
                self.events.publish(Event::StatusFinalized { flight: flight.clone(), status });
            }
            ResponseOutcome::Duplicate => {
                debug!(flight = %flight, oracle = %oracle, "duplicate response ignored");
            }
            ResponseOutcome::Closed => {
                debug!(flight = %flight, oracle = %oracle, "response after finalization ignored");
            }
        }

        Ok(outcome)
    }

    /// Last finalized status of `flight`, if any opening ever finalized.
    pub async fn flight_status(&self, flight: &FlightKey) -> Result<Option<StatusCode>, SuretyError> {
        let record = self.store.get::<RequestRecord>(&request_key(flight)).await?;
        Ok(record.and_then(|record| {
            record.status.or_else(|| record.history.last().map(|closed| closed.status))
        }))
    }

    /// Snapshot of the flight's current opening for observability.
    pub async fn request_state(
        &self,
        flight: &FlightKey,
    ) -> Result<Option<RequestSnapshot>, SuretyError> {
        let record = self.store.get::<RequestRecord>(&request_key(flight)).await?;
        Ok(record.map(|record| RequestSnapshot {
            index: record.index,
            opening: record.opening,
            status: record.status,
            tallies: record.tallies(),
        }))
    }
}
