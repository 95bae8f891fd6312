use serde::{Deserialize, Serialize};

use crate::models::driver::DriverId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoMatchReason {
    NoSuitableDriver,
    JobCancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchResult {
    Matched {
        driver_id: DriverId,
        empty_miles_km: f64,
    },
    NoMatch {
        reason: NoMatchReason,
    },
}

impl MatchResult {
    pub fn no_suitable_driver() -> Self {
        MatchResult::NoMatch {
            reason: NoMatchReason::NoSuitableDriver,
        }
    }

    pub fn matched_driver(&self) -> Option<DriverId> {
        match self {
            MatchResult::Matched { driver_id, .. } => Some(*driver_id),
            MatchResult::NoMatch { .. } => None,
        }
    }
}
