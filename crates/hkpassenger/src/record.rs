//! Core record types for hkpassenger.
//!
//! A [`FlowRecord`] is one day's traveller counts in one direction across the
//! border. Field names serialize in PascalCase (`Date`, `Flow`, `Local`, ...)
//! because that is the document shape clients send and expect back.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of travel for a record.
///
/// Ordering matters: `Arrival` sorts before `Departure`, matching the text
/// ordering of the stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Flow {
    /// Travellers entering.
    Arrival,
    /// Travellers leaving.
    Departure,
}

impl Flow {
    /// The stored text for this direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrival => "Arrival",
            Self::Departure => "Departure",
        }
    }

    /// Sign applied when computing net flow.
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Self::Arrival => 1,
            Self::Departure => -1,
        }
    }
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored flow value is neither `Arrival` nor `Departure`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown flow direction: {0}")]
pub struct ParseFlowError(pub String);

impl FromStr for Flow {
    type Err = ParseFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Arrival" => Ok(Self::Arrival),
            "Departure" => Ok(Self::Departure),
            other => Err(ParseFlowError(other.to_string())),
        }
    }
}

/// A persisted passenger-flow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlowRecord {
    /// Textual date. Storage form is `month/day/year`; API responses use
    /// `day/month/year`.
    pub date: String,
    /// Direction of travel.
    pub flow: Flow,
    /// Hong Kong residents.
    pub local: u32,
    /// Mainland visitors.
    pub mainland: u32,
    /// Other visitors.
    pub others: u32,
}

/// One entry of a bulk insert body, before it is bound to a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlowEntry {
    /// Direction of travel.
    pub flow: Flow,
    /// Hong Kong residents.
    pub local: u32,
    /// Mainland visitors.
    pub mainland: u32,
    /// Other visitors.
    pub others: u32,
}

impl FlowEntry {
    /// Bind this entry to a storage date.
    #[must_use]
    pub fn into_record(self, date: impl Into<String>) -> FlowRecord {
        FlowRecord {
            date: date.into(),
            flow: self.flow,
            local: self.local,
            mainland: self.mainland,
            others: self.others,
        }
    }
}
