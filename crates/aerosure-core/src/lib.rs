//! # Aerosure Core
//!
//! Consensus core for a flight-insurance scheme: turns status reports from
//! independent, untrusted oracles into finalized flight statuses, and runs
//! the quorum-voting protocol that governs airline admission.
//!
//! This crate provides:
//!
//! - **[`registry`]**: participant records (oracles, airlines), funding
//!   state, and deterministic index assignment for sharding oracle work.
//!
//! - **[`consensus`]**: the flight status engine (threshold finality over
//!   oracle responses) and the airline admission engine (bootstrap rule
//!   plus live-denominator quorum voting).
//!
//! - **[`ledger`]**: the narrow storage collaborator interface (atomic
//!   get/compare-and-swap per entity) plus the in-memory reference
//!   implementation.
//!
//! - **[`events`]**: publish/subscribe hub and append-only log for
//!   `RequestOpened` / `StatusFinalized` / `AirlineRegistered` and friends.
//!
//! - **[`config`]**: named, overridable protocol constants.
//!
//! ## Data Flow
//!
//! ```text
//! register_oracle ──► ParticipantRegistry ──► IndexAssigner (3 indexes)
//!
//! open_request ──► FlightStatusEngine ──► RequestOpened(index, flight)
//!                        ▲                        │
//!                        │                        ▼
//!                submit_response ◄──── oracle workers (external)
//!                        │
//!                 tally >= min_responses
//!                        │
//!                        ▼
//!                 StatusFinalized(flight, code)
//!
//! register_airline ──► AdmissionEngine ──► bootstrap │ quorum vote
//!                                                    │
//!                                                    ▼
//!                                       AirlineRegistered(airline)
//! ```
//!
//! The core performs no network I/O and never blocks on external actors;
//! the surrounding service layer drives it synchronously and owns retry
//! and timeout policy. Idempotent duplicate handling makes those retries
//! safe.

pub mod config;
pub mod consensus;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod types;

pub use config::AppConfig;
pub use consensus::{AdmissionEngine, AdmissionOutcome, FlightStatusEngine, ResponseOutcome};
pub use errors::SuretyError;
pub use events::{Event, EventBus};
pub use ledger::{Ledger, MemoryLedger};
pub use registry::ParticipantRegistry;
pub use types::{FlightKey, ParticipantId, StatusCode};
