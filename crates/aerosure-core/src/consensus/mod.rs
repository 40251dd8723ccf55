//! # Consensus Engines
//!
//! Two independent consensus protocols share this module:
//!
//! ## Flight status
//!
//! 1. **Open**: a caller opens a request; a request index is derived and
//!    announced via `RequestOpened`
//! 2. **Accept**: oracles holding the index submit observations; each
//!    accepted response joins the per-status tally, one per oracle
//! 3. **Finalize**: the first status code to reach `min_responses` becomes
//!    the flight's permanent status (`StatusFinalized`); later submissions
//!    are benign no-ops
//!
//! ## Airline admission
//!
//! 1. **Bootstrap**: below `bootstrap_count` registered airlines, a single
//!    authorized call admits the candidate
//! 2. **Quorum**: at or above the threshold, funded registered airlines
//!    vote; casting and quorum-checking happen in one atomic step against
//!    the live registered count
//!
//! Both engines commit every state transition through one ledger
//! compare-and-swap and publish events afterwards.
//!
//! # Module Organization
//!
//! - [`flight`]: status request lifecycle and response tallying
//! - [`admission`]: bootstrap and quorum voting rules

pub mod admission;
pub mod flight;

#[cfg(test)]
mod tests;

pub use admission::{AdmissionEngine, AdmissionOutcome};
pub use flight::{FlightStatusEngine, OpenedRequest, RequestSnapshot, ResponseOutcome};
