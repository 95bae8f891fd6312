use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collaborators::JsonEndpoint;
use crate::error::CollaboratorError;

const TRUCK_KEYWORDS: [&str; 6] = ["PICKUP", "TRUCK", "F-150", "RAM", "SILVERADO", "TUNDRA"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub vehicle_type: String,
    pub plate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub status: ComplianceStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl ComplianceVerdict {
    pub fn passed(&self) -> bool {
        self.status == ComplianceStatus::Success
    }
}

#[async_trait]
pub trait ComplianceChecker: Send + Sync {
    async fn verify_truck(
        &self,
        vehicle: &VehicleDescriptor,
    ) -> Result<ComplianceVerdict, CollaboratorError>;
}

#[derive(Debug, Default, Clone)]
pub struct TruckKeywordChecker;

#[async_trait]
impl ComplianceChecker for TruckKeywordChecker {
    async fn verify_truck(
        &self,
        vehicle: &VehicleDescriptor,
    ) -> Result<ComplianceVerdict, CollaboratorError> {
        let vehicle_type = vehicle.vehicle_type.to_uppercase();

        if TRUCK_KEYWORDS
            .iter()
            .any(|keyword| vehicle_type.contains(keyword))
        {
            info!(plate = %vehicle.plate, vehicle_type = %vehicle_type, "truck verified");
            Ok(ComplianceVerdict {
                status: ComplianceStatus::Success,
                message: None,
            })
        } else {
            warn!(plate = %vehicle.plate, vehicle_type = %vehicle_type, "vehicle is not an approved truck type");
            Ok(ComplianceVerdict {
                status: ComplianceStatus::Failed,
                message: Some("Vehicle is not an approved truck type.".to_string()),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpComplianceClient {
    endpoint: JsonEndpoint,
}

impl HttpComplianceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            endpoint: JsonEndpoint::new("legal service", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ComplianceChecker for HttpComplianceClient {
    async fn verify_truck(
        &self,
        vehicle: &VehicleDescriptor,
    ) -> Result<ComplianceVerdict, CollaboratorError> {
        self.endpoint.post("verify_truck", vehicle).await
    }
}

#[cfg(test)]
mod tests {
    use super::{ComplianceChecker, ComplianceStatus, TruckKeywordChecker, VehicleDescriptor};

    fn vehicle(vehicle_type: &str) -> VehicleDescriptor {
        VehicleDescriptor {
            vehicle_type: vehicle_type.to_string(),
            plate: "PKPLK1".to_string(),
        }
    }

    #[tokio::test]
    async fn pickup_trucks_pass() {
        let checker = TruckKeywordChecker;
        for kind in ["FORD F-150 LIGHT DUTY", "ram 2500", "Toyota Tundra", "Box Truck"] {
            let verdict = checker.verify_truck(&vehicle(kind)).await.unwrap();
            assert_eq!(verdict.status, ComplianceStatus::Success, "{kind}");
        }
    }

    #[tokio::test]
    async fn sedans_fail() {
        let verdict = TruckKeywordChecker
            .verify_truck(&vehicle("TOYOTA CAMRY SEDAN"))
            .await
            .unwrap();
        assert!(!verdict.passed());
        assert!(verdict.message.is_some());
    }

    #[test]
    fn verdict_wire_format() {
        let verdict: super::ComplianceVerdict =
            serde_json::from_str(r#"{"status":"SUCCESS","is_truck":true}"#).unwrap();
        assert!(verdict.passed());
    }
}
