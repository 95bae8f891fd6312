use crate::models::driver::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    // Rounding can push the term slightly outside [0, 1] for antipodal points.
    let central_angle = 2.0 * haversine.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn validate_point(label: &str, point: &GeoPoint) -> Result<(), String> {
    if !point.lat.is_finite() || !point.lng.is_finite() {
        return Err(format!("{label} coordinates must be finite"));
    }
    if !(-90.0..=90.0).contains(&point.lat) {
        return Err(format!("{label} latitude {} is outside [-90, 90]", point.lat));
    }
    if !(-180.0..=180.0).contains(&point.lng) {
        return Err(format!("{label} longitude {} is outside [-180, 180]", point.lng));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, validate_point};
    use crate::models::driver::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 35.2271,
            lng: -80.8431,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let a = GeoPoint { lat: 0.0, lng: 0.0 };
        let b = GeoPoint { lat: 0.0, lng: 180.0 };
        let distance = haversine_km(&a, &b);
        assert!(distance.is_finite());
        assert!((distance - std::f64::consts::PI * 6_371.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_out_of_range_and_nan_coordinates() {
        assert!(validate_point("pickup", &GeoPoint { lat: 35.0, lng: -80.0 }).is_ok());
        assert!(validate_point("pickup", &GeoPoint { lat: 91.0, lng: 0.0 }).is_err());
        assert!(validate_point("pickup", &GeoPoint { lat: 0.0, lng: -180.5 }).is_err());
        assert!(validate_point("pickup", &GeoPoint { lat: f64::NAN, lng: 0.0 }).is_err());
    }
}
