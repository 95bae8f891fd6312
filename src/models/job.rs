use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::{DriverId, GeoPoint};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub client_id: u64,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub required_capacity: f64,
    pub is_express: bool,
    pub base_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Matched,
    NoMatch,
    Cancelled,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Matched => "MATCHED",
            JobStatus::NoMatch => "NO_MATCH",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job: Job,
    pub status: JobStatus,
    pub assigned_driver: Option<DriverId>,
    pub updated_at: DateTime<Utc>,
}
