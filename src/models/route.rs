use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

impl RouteEstimate {
    pub fn is_valid(&self) -> bool {
        self.distance_km.is_finite()
            && self.distance_km >= 0.0
            && self.duration_minutes.is_finite()
            && self.duration_minutes >= 0.0
    }
}
