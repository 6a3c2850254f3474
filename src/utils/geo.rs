/// Calculate distance between two coordinates using Haversine formula
/// Returns distance in kilometers
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Check that a latitude/longitude pair is on the globe
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_delhi_jaipur() {
        // Delhi center
        let delhi = (28.6139, 77.2090);
        // Jaipur center
        let jaipur = (26.9124, 75.7873);

        let distance = haversine_distance(delhi.0, delhi.1, jaipur.0, jaipur.1);
        // Should be approximately 230-250 km
        assert!(distance > 200.0 && distance < 280.0);
    }

    #[test]
    fn test_zero_distance() {
        let d = haversine_distance(28.6139, 77.2090, 28.6139, 77.2090);
        assert!(d < 1e-9);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(is_valid_coordinate(28.6, 77.2));
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, -181.0));
    }
}
