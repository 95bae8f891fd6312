use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchEventKind {
    JobMatched,
    JobUnmatched,
    JobCancelled,
    JobCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub kind: DispatchEventKind,
    pub job_id: Uuid,
    pub driver_id: Option<DriverId>,
    pub empty_miles_km: Option<f64>,
    pub at: DateTime<Utc>,
}

impl DispatchEvent {
    pub fn new(kind: DispatchEventKind, job_id: Uuid, driver_id: Option<DriverId>) -> Self {
        Self {
            kind,
            job_id,
            driver_id,
            empty_miles_km: None,
            at: Utc::now(),
        }
    }
}
