use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::JobStoreError;
use crate::models::driver::DriverId;
use crate::models::job::{Job, JobRecord, JobStatus};

/// Every transition runs under the record's entry lock, so a cancel and an assign racing on
/// the same job are totally ordered.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job) -> JobRecord;

    fn get(&self, job_id: Uuid) -> Option<JobRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_cancelled(&self, job_id: Uuid) -> bool;

    fn assign(&self, job_id: Uuid, driver_id: DriverId) -> Result<JobRecord, JobStoreError>;

    fn mark_unmatched(&self, job_id: Uuid) -> Result<JobRecord, JobStoreError>;

    /// Cancelling twice is a no-op. The returned record keeps `assigned_driver` so the caller
    /// can release it.
    fn cancel(&self, job_id: Uuid) -> Result<JobRecord, JobStoreError>;

    fn complete(&self, job_id: Uuid) -> Result<JobRecord, JobStoreError>;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, JobRecord>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition<F>(&self, job_id: Uuid, apply: F) -> Result<JobRecord, JobStoreError>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), JobStoreError>,
    {
        let mut record = self
            .jobs
            .get_mut(&job_id)
            .ok_or(JobStoreError::UnknownJob(job_id))?;

        apply(&mut *record)?;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

fn invalid(job_id: Uuid, from: JobStatus, to: JobStatus) -> JobStoreError {
    JobStoreError::InvalidTransition {
        job_id,
        from: from.as_str(),
        to: to.as_str(),
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> JobRecord {
        let record = JobRecord {
            job,
            status: JobStatus::Pending,
            assigned_driver: None,
            updated_at: Utc::now(),
        };
        self.jobs.insert(record.job.id, record.clone());
        record
    }

    fn get(&self, job_id: Uuid) -> Option<JobRecord> {
        self.jobs.get(&job_id).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.jobs.len()
    }

    fn is_cancelled(&self, job_id: Uuid) -> bool {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.status == JobStatus::Cancelled)
            .unwrap_or(false)
    }

    fn assign(&self, job_id: Uuid, driver_id: DriverId) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, |record| match record.status {
            JobStatus::Cancelled => Err(JobStoreError::Cancelled(job_id)),
            JobStatus::Completed => Err(invalid(job_id, record.status, JobStatus::Matched)),
            JobStatus::Pending | JobStatus::NoMatch | JobStatus::Matched => {
                record.status = JobStatus::Matched;
                record.assigned_driver = Some(driver_id);
                Ok(())
            }
        })
    }

    fn mark_unmatched(&self, job_id: Uuid) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, |record| match record.status {
            JobStatus::Cancelled => Err(JobStoreError::Cancelled(job_id)),
            JobStatus::Pending | JobStatus::NoMatch => {
                record.status = JobStatus::NoMatch;
                Ok(())
            }
            other => Err(invalid(job_id, other, JobStatus::NoMatch)),
        })
    }

    fn cancel(&self, job_id: Uuid) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, |record| match record.status {
            JobStatus::Completed => Err(invalid(job_id, record.status, JobStatus::Cancelled)),
            _ => {
                record.status = JobStatus::Cancelled;
                Ok(())
            }
        })
    }

    fn complete(&self, job_id: Uuid) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, |record| match record.status {
            JobStatus::Matched => {
                record.status = JobStatus::Completed;
                Ok(())
            }
            other => Err(invalid(job_id, other, JobStatus::Completed)),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{InMemoryJobStore, JobStore};
    use crate::error::JobStoreError;
    use crate::models::driver::GeoPoint;
    use crate::models::job::{Job, JobStatus};

    fn job() -> Job {
        Job {
            id: Uuid::new_v4(),
            client_id: 1,
            pickup: GeoPoint {
                lat: 35.2271,
                lng: -80.8431,
            },
            dropoff: GeoPoint {
                lat: 35.35,
                lng: -80.70,
            },
            required_capacity: 100.0,
            is_express: true,
            base_price: 65.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_jobs_start_pending() {
        let store = InMemoryJobStore::new();
        let record = store.insert(job());
        assert_eq!(record.status, JobStatus::Pending);
        assert!(record.assigned_driver.is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn cancelled_job_refuses_assignment() {
        let store = InMemoryJobStore::new();
        let id = store.insert(job()).job.id;

        store.cancel(id).unwrap();
        assert!(store.is_cancelled(id));
        assert_eq!(store.assign(id, 101).unwrap_err(), JobStoreError::Cancelled(id));
        assert_eq!(store.mark_unmatched(id).unwrap_err(), JobStoreError::Cancelled(id));
    }

    #[test]
    fn cancel_keeps_assigned_driver_for_release() {
        let store = InMemoryJobStore::new();
        let id = store.insert(job()).job.id;

        store.assign(id, 101).unwrap();
        let cancelled = store.cancel(id).unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(cancelled.assigned_driver, Some(101));
        assert!(store.cancel(id).is_ok());
    }

    #[test]
    fn only_matched_jobs_complete() {
        let store = InMemoryJobStore::new();
        let id = store.insert(job()).job.id;

        assert!(matches!(
            store.complete(id),
            Err(JobStoreError::InvalidTransition { from: "PENDING", .. })
        ));

        store.assign(id, 7).unwrap();
        assert_eq!(store.complete(id).unwrap().status, JobStatus::Completed);
        assert!(store.cancel(id).is_err());
    }

    #[test]
    fn unknown_job_is_reported() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.assign(id, 1).unwrap_err(), JobStoreError::UnknownJob(id));
        assert!(!store.is_cancelled(id));
    }
}
