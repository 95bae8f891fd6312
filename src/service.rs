use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborators::finance::{FinanceGateway, InvoiceRequest};
use crate::collaborators::legal::{ComplianceChecker, TruckKeywordChecker, VehicleDescriptor};
use crate::engine::jobs::JobStore;
use crate::engine::matching::{MatchingEngine, validate_capacity};
use crate::engine::pool::DriverPool;
use crate::error::{AppError, CollaboratorError};
use crate::geo::validate_point;
use crate::models::driver::{Driver, DriverId, GeoPoint};
use crate::models::event::{DispatchEvent, DispatchEventKind};
use crate::models::job::{Job, JobRecord, JobStatus};
use crate::models::matching::{MatchResult, NoMatchReason};
use crate::observability::metrics::Metrics;
use crate::routing::RouteEstimator;

pub const DEFAULT_BASE_PRICE: f64 = 50.0;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJobRequest {
    pub client_id: u64,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub required_capacity: f64,
    #[serde(default)]
    pub is_express: bool,
    #[serde(default)]
    pub base_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub status: String,
    pub job_id: Uuid,
    pub match_info: MatchResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub driver_id: Option<DriverId>,
    pub driver_location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDriverRequest {
    pub name: String,
    pub license_number: String,
    pub truck_plate: String,
    pub vehicle_type: String,
    pub insurance_status: bool,
    pub location: GeoPoint,
    pub capacity: f64,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverStatusAck {
    pub status: String,
    pub driver_id: DriverId,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub status: String,
    pub details: Value,
}

pub struct DispatchService {
    pool: Arc<dyn DriverPool>,
    jobs: Arc<dyn JobStore>,
    engine: MatchingEngine,
    compliance: Arc<dyn ComplianceChecker>,
    finance: Option<Arc<dyn FinanceGateway>>,
    events_tx: broadcast::Sender<DispatchEvent>,
    default_base_price: f64,
}

impl DispatchService {
    pub fn new(
        pool: Arc<dyn DriverPool>,
        jobs: Arc<dyn JobStore>,
        estimator: RouteEstimator,
        metrics: Metrics,
        event_buffer_size: usize,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));
        let engine = MatchingEngine::new(pool.clone(), jobs.clone(), estimator, metrics);

        Self {
            pool,
            jobs,
            engine,
            compliance: Arc::new(TruckKeywordChecker),
            finance: None,
            events_tx,
            default_base_price: DEFAULT_BASE_PRICE,
        }
    }

    pub fn with_compliance(mut self, compliance: Arc<dyn ComplianceChecker>) -> Self {
        self.compliance = compliance;
        self
    }

    pub fn with_finance(mut self, finance: Arc<dyn FinanceGateway>) -> Self {
        self.finance = Some(finance);
        self
    }

    pub fn with_default_base_price(mut self, price: f64) -> Self {
        self.default_base_price = price;
        self
    }

    pub fn with_estimate_concurrency(mut self, limit: usize) -> Self {
        self.engine = self.engine.with_estimate_concurrency(limit);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events_tx.subscribe()
    }

    pub fn driver_count(&self) -> usize {
        self.pool.len()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub async fn submit_job(&self, request: SubmitJobRequest) -> Result<SubmitJobResponse, AppError> {
        validate_point("pickup", &request.pickup).map_err(AppError::Validation)?;
        validate_point("dropoff", &request.dropoff).map_err(AppError::Validation)?;
        validate_capacity(request.required_capacity)?;

        let base_price = request.base_price.unwrap_or(self.default_base_price);
        if !base_price.is_finite() || base_price < 0.0 {
            return Err(AppError::Validation(format!(
                "base price must be >= 0, got {base_price}"
            )));
        }

        let job = Job {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            pickup: request.pickup,
            dropoff: request.dropoff,
            required_capacity: request.required_capacity,
            is_express: request.is_express,
            base_price,
            created_at: Utc::now(),
        };
        self.jobs.insert(job.clone());
        info!(job_id = %job.id, client_id = job.client_id, "job submitted");

        let match_info = self.engine.match_job(&job).await?;

        match &match_info {
            MatchResult::Matched {
                driver_id,
                empty_miles_km,
            } => {
                let mut event =
                    DispatchEvent::new(DispatchEventKind::JobMatched, job.id, Some(*driver_id));
                event.empty_miles_km = Some(*empty_miles_km);
                self.publish(event);
            }
            MatchResult::NoMatch {
                reason: NoMatchReason::NoSuitableDriver,
            } => {
                if let Err(err) = self.jobs.mark_unmatched(job.id) {
                    debug!(job_id = %job.id, error = %err, "job changed state before it could be marked unmatched");
                }
                self.publish(DispatchEvent::new(
                    DispatchEventKind::JobUnmatched,
                    job.id,
                    None,
                ));
            }
            MatchResult::NoMatch {
                reason: NoMatchReason::JobCancelled,
            } => {}
        }

        Ok(SubmitJobResponse {
            status: "JOB_SUBMITTED".to_string(),
            job_id: job.id,
            match_info,
        })
    }

    pub fn get_job_status(&self, job_id: Uuid) -> Result<JobStatusResponse, AppError> {
        let record = self
            .jobs
            .get(job_id)
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))?;
        Ok(self.status_of(&record))
    }

    pub fn cancel_job(&self, job_id: Uuid) -> Result<JobStatusResponse, AppError> {
        let record = self.jobs.cancel(job_id)?;
        if let Some(driver_id) = record.assigned_driver {
            self.release_for(driver_id, job_id)?;
        }

        info!(job_id = %job_id, "job cancelled");
        self.publish(DispatchEvent::new(
            DispatchEventKind::JobCancelled,
            job_id,
            record.assigned_driver,
        ));
        Ok(self.status_of(&record))
    }

    pub fn complete_job(&self, job_id: Uuid) -> Result<JobStatusResponse, AppError> {
        let record = self.jobs.complete(job_id)?;
        if let Some(driver_id) = record.assigned_driver {
            self.release_for(driver_id, job_id)?;
        }

        info!(job_id = %job_id, driver_id = ?record.assigned_driver, "job completed");
        self.publish(DispatchEvent::new(
            DispatchEventKind::JobCompleted,
            job_id,
            record.assigned_driver,
        ));
        Ok(self.status_of(&record))
    }

    pub async fn invoice_job(&self, job_id: Uuid) -> Result<InvoiceResponse, AppError> {
        let record = self
            .jobs
            .get(job_id)
            .ok_or_else(|| AppError::NotFound(format!("job {job_id} not found")))?;

        if record.status != JobStatus::Completed {
            return Err(AppError::Conflict(format!(
                "job {job_id} is {} and cannot be invoiced yet",
                record.status.as_str()
            )));
        }

        let finance = self
            .finance
            .as_ref()
            .ok_or(CollaboratorError::NotConfigured("finance service"))?;

        let request = InvoiceRequest {
            job_id,
            driver_id: record.assigned_driver,
            amount: record.job.base_price,
            is_express: record.job.is_express,
        };
        let details = finance.process_invoice(&request).await.map_err(|err| {
            warn!(job_id = %job_id, error = %err, "invoicing failed");
            AppError::from(err)
        })?;

        info!(job_id = %job_id, amount = request.amount, "job invoiced");
        Ok(InvoiceResponse {
            status: "INVOICING_COMPLETE".to_string(),
            details,
        })
    }

    pub async fn register_driver(&self, request: RegisterDriverRequest) -> Result<Driver, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        if request.license_number.trim().is_empty() {
            return Err(AppError::Validation("license number cannot be empty".to_string()));
        }
        if !request.capacity.is_finite() || request.capacity <= 0.0 {
            return Err(AppError::Validation("capacity must be > 0".to_string()));
        }
        validate_point("location", &request.location).map_err(AppError::Validation)?;

        let vehicle = VehicleDescriptor {
            vehicle_type: request.vehicle_type.clone(),
            plate: request.truck_plate.clone(),
        };
        let verdict = self.compliance.verify_truck(&vehicle).await.map_err(|err| {
            warn!(plate = %vehicle.plate, error = %err, "compliance check unavailable");
            AppError::from(err)
        })?;

        if !verdict.passed() {
            return Err(AppError::Validation(format!(
                "registration failed: {}",
                verdict
                    .message
                    .unwrap_or_else(|| "vehicle is not an approved truck type".to_string())
            )));
        }

        let driver = Driver {
            id: self.pool.next_id(),
            name: request.name,
            vehicle_type: request.vehicle_type,
            truck_plate: request.truck_plate,
            location: request.location,
            capacity: request.capacity,
            rating: if request.rating.is_finite() {
                request.rating.clamp(0.0, 5.0)
            } else {
                0.0
            },
            verified: request.insurance_status,
            active: false,
            reservation: None,
            updated_at: Utc::now(),
        };
        self.pool.insert(driver.clone());

        info!(driver_id = driver.id, verified = driver.verified, "driver registered");
        Ok(driver)
    }

    pub fn update_driver_location(
        &self,
        driver_id: DriverId,
        location: GeoPoint,
        active: bool,
    ) -> Result<DriverStatusAck, AppError> {
        validate_point("location", &location).map_err(AppError::Validation)?;

        self.pool.update_location(driver_id, location)?;
        let driver = self.pool.set_active(driver_id, active)?;

        debug!(driver_id, active, "driver status updated");
        Ok(DriverStatusAck {
            status: "UPDATED".to_string(),
            driver_id,
            active: driver.active,
        })
    }

    pub fn list_drivers(&self) -> Vec<Driver> {
        self.pool.list()
    }

    pub fn get_driver(&self, driver_id: DriverId) -> Result<Driver, AppError> {
        self.pool
            .get(driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))
    }

    /// Releases the driver only while it still holds this job.
    fn release_for(&self, driver_id: DriverId, job_id: Uuid) -> Result<(), AppError> {
        let holds_job = self
            .pool
            .get(driver_id)
            .map(|driver| driver.reservation == Some(job_id))
            .unwrap_or(false);

        if holds_job {
            self.pool.release(driver_id)?;
        }
        Ok(())
    }

    fn status_of(&self, record: &JobRecord) -> JobStatusResponse {
        let driver_location = match record.status {
            JobStatus::Matched => record
                .assigned_driver
                .and_then(|driver_id| self.pool.get(driver_id))
                .map(|driver| driver.location),
            _ => None,
        };

        JobStatusResponse {
            job_id: record.job.id,
            status: record.status,
            driver_id: record.assigned_driver,
            driver_location,
        }
    }

    fn publish(&self, event: DispatchEvent) {
        // No subscribers is the normal case outside websocket sessions.
        let _ = self.events_tx.send(event);
    }
}
