//! Identifier and status types shared across the consensus subsystem.

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Opaque address-like key identifying a participant (airline, oracle, or
/// the privileged registrar).
pub type ParticipantId = Arc<str>;

/// Identifies one scheduled flight instance.
///
/// Immutable once created; all status requests and responses for the same
/// flight instance share the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightKey {
    /// Operating airline.
    pub airline: ParticipantId,
    /// Flight designator, e.g. `"ND1309"`.
    pub flight: String,
    /// Scheduled departure as a unix timestamp.
    pub departure: i64,
}

impl FlightKey {
    pub fn new(airline: impl Into<ParticipantId>, flight: impl Into<String>, departure: i64) -> Self {
        Self { airline: airline.into(), flight: flight.into(), departure }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.airline, self.flight, self.departure)
    }
}

/// Resolved flight status as reported by oracles.
///
/// A small closed enumeration; the numeric codes are part of the external
/// protocol and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusCode {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl StatusCode {
    /// Every defined status code, in protocol order.
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    /// Protocol wire value of this status code.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::OnTime => 10,
            StatusCode::LateAirline => 20,
            StatusCode::LateWeather => 30,
            StatusCode::LateTechnical => 40,
            StatusCode::LateOther => 50,
        }
    }

    /// Parses a protocol wire value; returns `None` for undefined codes.
    #[must_use]
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(StatusCode::Unknown),
            10 => Some(StatusCode::OnTime),
            20 => Some(StatusCode::LateAirline),
            30 => Some(StatusCode::LateWeather),
            40 => Some(StatusCode::LateTechnical),
            50 => Some(StatusCode::LateOther),
            _ => None,
        }
    }

    /// Returns `true` for any of the four late variants.
    #[must_use]
    pub fn is_late(self) -> bool {
        matches!(
            self,
            StatusCode::LateAirline |
                StatusCode::LateWeather |
                StatusCode::LateTechnical |
                StatusCode::LateOther
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusCode::Unknown => "unknown",
            StatusCode::OnTime => "on-time",
            StatusCode::LateAirline => "late-airline",
            StatusCode::LateWeather => "late-weather",
            StatusCode::LateTechnical => "late-technical",
            StatusCode::LateOther => "late-other",
        };
        f.write_str(label)
    }
}
