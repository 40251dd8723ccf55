//! Event bus for consensus state transitions.
//!
//! Engines publish an [`Event`] after every committed state transition.
//! Consumers choose push or pull semantics:
//!
//! - **Push**: [`EventBus::subscribe`] returns a `broadcast::Receiver`;
//!   slow subscribers may observe `Lagged` and should fall back to polling.
//! - **Pull**: [`EventBus::events_since`] reads the append-only log from a
//!   cursor, which never loses events and doubles as the audit trail.

use crate::types::{FlightKey, ParticipantId, StatusCode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the broadcast channel backing [`EventBus`].
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A committed consensus state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// An oracle registered and received its index assignment.
    OracleRegistered { oracle: ParticipantId, indexes: Vec<u8> },
    /// An airline met (or topped up past) the funding threshold.
    AirlineFunded { airline: ParticipantId, total: u64 },
    /// A status request opened; oracles holding `index` should respond.
    RequestOpened { flight: FlightKey, index: u8, opening: u64 },
    /// An oracle's response was accepted into an open request's tally.
    ResponseRecorded { flight: FlightKey, oracle: ParticipantId, status: StatusCode, tally: usize },
    /// A status request finalized with the given code.
    StatusFinalized { flight: FlightKey, status: StatusCode },
    /// A funded airline's vote for a candidate was counted.
    VoteRecorded { candidate: ParticipantId, voter: ParticipantId, votes: usize, required: usize },
    /// A candidate airline became registered.
    AirlineRegistered { airline: ParticipantId, votes: usize },
}

/// Publish/subscribe hub plus append-only event log.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    log: RwLock<Vec<Event>>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, log: RwLock::new(Vec::new()) }
    }

    /// Subscribes for push delivery of future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Appends an event to the log and fans it out to subscribers.
    ///
    /// A send error only means there are no live subscribers; the log still
    /// records the event for pull consumers.
    pub fn publish(&self, event: Event) {
        trace!(?event, "event published");
        self.log.write().push(event.clone());
        let _ = self.sender.send(event);
    }

    /// Returns events at positions `>= cursor` and the next cursor value.
    ///
    /// A cursor of 0 replays the full history; passing the returned cursor
    /// back yields only events published in between.
    #[must_use]
    pub fn events_since(&self, cursor: usize) -> (Vec<Event>, usize) {
        let log = self.log.read();
        let events = log.get(cursor..).unwrap_or_default().to_vec();
        (events, log.len())
    }

    /// Total number of events published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
