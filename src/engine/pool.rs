use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::PoolError;
use crate::geo::haversine_km;
use crate::models::driver::{Driver, DriverId, GeoPoint};
use crate::observability::metrics::Metrics;

/// Callers only see snapshots. `reservation` changes exclusively through `reserve` and
/// `release`, which behave as compare-and-set.
pub trait DriverPool: Send + Sync {
    // Unreserved only, ascending by id.
    fn query_candidates(&self, near: &GeoPoint) -> Vec<Driver>;

    fn get(&self, driver_id: DriverId) -> Option<Driver>;

    fn list(&self) -> Vec<Driver>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&self) -> DriverId;

    fn insert(&self, driver: Driver);

    fn reserve(
        &self,
        driver_id: DriverId,
        job_id: Uuid,
        required_capacity: f64,
    ) -> Result<Driver, PoolError>;

    fn release(&self, driver_id: DriverId) -> Result<Option<Uuid>, PoolError>;

    fn update_location(&self, driver_id: DriverId, location: GeoPoint) -> Result<Driver, PoolError>;

    fn set_active(&self, driver_id: DriverId, active: bool) -> Result<Driver, PoolError>;
}

pub struct InMemoryDriverPool {
    drivers: DashMap<DriverId, Driver>,
    next_id: AtomicU64,
    search_radius_km: Option<f64>,
    metrics: Metrics,
}

impl InMemoryDriverPool {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            drivers: DashMap::new(),
            next_id: AtomicU64::new(1),
            search_radius_km: None,
            metrics,
        }
    }

    pub fn with_search_radius(mut self, radius_km: Option<f64>) -> Self {
        self.search_radius_km = radius_km;
        self
    }

    fn within_radius(&self, driver: &Driver, near: &GeoPoint) -> bool {
        match self.search_radius_km {
            Some(radius) => haversine_km(&driver.location, near) <= radius,
            None => true,
        }
    }

    fn modify<F>(&self, driver_id: DriverId, apply: F) -> Result<Driver, PoolError>
    where
        F: FnOnce(&mut Driver),
    {
        let mut driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or(PoolError::UnknownDriver(driver_id))?;

        apply(&mut *driver);
        driver.updated_at = Utc::now();
        Ok(driver.clone())
    }
}

impl DriverPool for InMemoryDriverPool {
    fn query_candidates(&self, near: &GeoPoint) -> Vec<Driver> {
        let mut candidates: Vec<Driver> = self
            .drivers
            .iter()
            .filter_map(|entry| {
                let driver = entry.value();
                if driver.reservation.is_none() && self.within_radius(driver, near) {
                    Some(driver.clone())
                } else {
                    None
                }
            })
            .collect();

        candidates.sort_by_key(|driver| driver.id);
        candidates
    }

    fn get(&self, driver_id: DriverId) -> Option<Driver> {
        self.drivers.get(&driver_id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by_key(|driver| driver.id);
        drivers
    }

    fn len(&self) -> usize {
        self.drivers.len()
    }

    fn next_id(&self) -> DriverId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn insert(&self, driver: Driver) {
        self.next_id.fetch_max(driver.id + 1, Ordering::SeqCst);
        if driver.reservation.is_some() {
            self.metrics.drivers_reserved.inc();
        }
        if let Some(previous) = self.drivers.insert(driver.id, driver) {
            if previous.reservation.is_some() {
                self.metrics.drivers_reserved.dec();
            }
        }
    }

    fn reserve(
        &self,
        driver_id: DriverId,
        job_id: Uuid,
        required_capacity: f64,
    ) -> Result<Driver, PoolError> {
        // The entry guard is held across check and set, so concurrent reservations of the same
        // driver are serialized.
        let mut driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or(PoolError::UnknownDriver(driver_id))?;

        if let Some(held_by) = driver.reservation {
            return Err(PoolError::ReservationConflict { driver_id, held_by });
        }
        if !driver.is_eligible_for(required_capacity) {
            return Err(PoolError::Ineligible(driver_id));
        }

        driver.reservation = Some(job_id);
        driver.updated_at = Utc::now();
        self.metrics.drivers_reserved.inc();

        Ok(driver.clone())
    }

    fn release(&self, driver_id: DriverId) -> Result<Option<Uuid>, PoolError> {
        let mut driver = self
            .drivers
            .get_mut(&driver_id)
            .ok_or(PoolError::UnknownDriver(driver_id))?;

        let held_by = driver.reservation.take();
        if held_by.is_some() {
            driver.updated_at = Utc::now();
            self.metrics.drivers_reserved.dec();
        }

        Ok(held_by)
    }

    fn update_location(&self, driver_id: DriverId, location: GeoPoint) -> Result<Driver, PoolError> {
        self.modify(driver_id, |driver| driver.location = location)
    }

    fn set_active(&self, driver_id: DriverId, active: bool) -> Result<Driver, PoolError> {
        self.modify(driver_id, |driver| driver.active = active)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::{DriverPool, InMemoryDriverPool};
    use crate::error::PoolError;
    use crate::models::driver::{Driver, GeoPoint};
    use crate::observability::metrics::Metrics;

    fn driver(id: u64, lat: f64, lng: f64, capacity: f64) -> Driver {
        Driver {
            id,
            name: format!("driver-{id}"),
            vehicle_type: "RAM 1500 PICKUP".to_string(),
            truck_plate: format!("PLT{id}"),
            location: GeoPoint { lat, lng },
            capacity,
            rating: 4.7,
            verified: true,
            active: true,
            reservation: None,
            updated_at: Utc::now(),
        }
    }

    fn pickup() -> GeoPoint {
        GeoPoint {
            lat: 35.2271,
            lng: -80.8431,
        }
    }

    #[test]
    fn candidates_are_sorted_by_id() {
        let pool = InMemoryDriverPool::new(Metrics::new());
        for id in [42, 7, 19, 3] {
            pool.insert(driver(id, 35.23, -80.85, 200.0));
        }

        let ids: Vec<u64> = pool.query_candidates(&pickup()).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 7, 19, 42]);
    }

    #[test]
    fn reserved_driver_is_excluded_from_candidates() {
        let pool = InMemoryDriverPool::new(Metrics::new());
        pool.insert(driver(101, 35.23, -80.85, 250.0));
        pool.insert(driver(102, 35.29, -80.75, 180.0));

        pool.reserve(101, Uuid::new_v4(), 100.0).unwrap();

        let ids: Vec<u64> = pool.query_candidates(&pickup()).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![102]);
        assert_eq!(pool.list().len(), 2);
    }

    #[test]
    fn second_reservation_conflicts() {
        let pool = InMemoryDriverPool::new(Metrics::new());
        pool.insert(driver(101, 35.23, -80.85, 250.0));

        let first = Uuid::new_v4();
        let reserved = pool.reserve(101, first, 100.0).unwrap();
        assert_eq!(reserved.reservation, Some(first));

        let err = pool.reserve(101, Uuid::new_v4(), 100.0).unwrap_err();
        assert_eq!(
            err,
            PoolError::ReservationConflict {
                driver_id: 101,
                held_by: first
            }
        );
    }

    #[test]
    fn reserve_rechecks_eligibility() {
        let pool = InMemoryDriverPool::new(Metrics::new());
        pool.insert(driver(101, 35.23, -80.85, 250.0));
        pool.set_active(101, false).unwrap();

        assert_eq!(
            pool.reserve(101, Uuid::new_v4(), 100.0).unwrap_err(),
            PoolError::Ineligible(101)
        );
        assert_eq!(
            pool.reserve(999, Uuid::new_v4(), 100.0).unwrap_err(),
            PoolError::UnknownDriver(999)
        );
    }

    #[test]
    fn release_is_idempotent() {
        let metrics = Metrics::new();
        let pool = InMemoryDriverPool::new(metrics.clone());
        pool.insert(driver(101, 35.23, -80.85, 250.0));

        let job = Uuid::new_v4();
        pool.reserve(101, job, 100.0).unwrap();
        assert_eq!(metrics.drivers_reserved.get(), 1);

        assert_eq!(pool.release(101), Ok(Some(job)));
        assert_eq!(pool.release(101), Ok(None));
        assert_eq!(metrics.drivers_reserved.get(), 0);
        assert!(pool.get(101).unwrap().reservation.is_none());
    }

    #[test]
    fn location_and_activity_updates_do_not_touch_reservation() {
        let pool = InMemoryDriverPool::new(Metrics::new());
        pool.insert(driver(101, 35.23, -80.85, 250.0));
        let job = Uuid::new_v4();
        pool.reserve(101, job, 100.0).unwrap();

        let moved = pool
            .update_location(101, GeoPoint { lat: 35.0, lng: -80.0 })
            .unwrap();
        assert_eq!(moved.location, GeoPoint { lat: 35.0, lng: -80.0 });
        assert_eq!(moved.reservation, Some(job));

        let offline = pool.set_active(101, false).unwrap();
        assert!(!offline.active);
        assert_eq!(offline.reservation, Some(job));
    }

    #[test]
    fn search_radius_limits_candidates() {
        let pool = InMemoryDriverPool::new(Metrics::new()).with_search_radius(Some(5.0));
        pool.insert(driver(1, 35.2300, -80.8500, 250.0));
        pool.insert(driver(2, 35.9000, -80.0000, 250.0));

        let ids: Vec<u64> = pool.query_candidates(&pickup()).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn next_id_skips_inserted_ids() {
        let pool = InMemoryDriverPool::new(Metrics::new());
        pool.insert(driver(101, 35.23, -80.85, 250.0));
        assert_eq!(pool.next_id(), 102);
        assert_eq!(pool.next_id(), 103);
    }

    #[test]
    fn concurrent_reservations_have_one_winner() {
        let pool = Arc::new(InMemoryDriverPool::new(Metrics::new()));
        pool.insert(driver(101, 35.23, -80.85, 250.0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.reserve(101, Uuid::new_v4(), 100.0).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
