use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DriverId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub vehicle_type: String,
    pub truck_plate: String,
    pub location: GeoPoint,
    pub capacity: f64,
    pub rating: f64,
    pub verified: bool,
    pub active: bool,
    pub reservation: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn is_eligible_for(&self, required_capacity: f64) -> bool {
        self.active && self.verified && self.capacity >= required_capacity && self.reservation.is_none()
    }
}
