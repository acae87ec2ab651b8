//! Great-circle distance on a spherical Earth.

/// Mean Earth radius used by every distance in the service
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Padding added to bounding-box edges so floating-point error can only
/// widen the prefilter, never drop a candidate on the boundary.
const BOX_PADDING_DEG: f64 = 1e-6;

/// Haversine distance in kilometres between two WGS84 coordinates.
///
/// Pure and symmetric; inputs are not validated.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = ((d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rounds a distance to two decimals for presentation.
pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

/// Longitude window of a bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LonRange {
    /// Every longitude qualifies (pole inside the circle, or the circle
    /// crosses the antimeridian)
    Any,
    Between(f64, f64),
}

/// Latitude/longitude rectangle enclosing every point within a radius of
/// a centre. Used as a storage-side prefilter; exact distances are still
/// computed afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lon: LonRange,
}

impl BoundingBox {
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let d_lat = angular.to_degrees() + BOX_PADDING_DEG;

        let min_lat = (lat - d_lat).max(-90.0);
        let max_lat = (lat + d_lat).min(90.0);

        // A pole inside the circle means every meridian is reachable
        if lat + d_lat >= 90.0 || lat - d_lat <= -90.0 {
            return Self {
                min_lat,
                max_lat,
                lon: LonRange::Any,
            };
        }

        let ratio = angular.sin() / lat.to_radians().cos();
        if !ratio.is_finite() || ratio >= 1.0 {
            return Self {
                min_lat,
                max_lat,
                lon: LonRange::Any,
            };
        }

        let d_lon = ratio.asin().to_degrees() + BOX_PADDING_DEG;
        let (west, east) = (lon - d_lon, lon + d_lon);
        let lon = if west < -180.0 || east > 180.0 {
            LonRange::Any
        } else {
            LonRange::Between(west, east)
        };

        Self {
            min_lat,
            max_lat,
            lon,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        match self.lon {
            LonRange::Any => true,
            LonRange::Between(west, east) => lon >= west && lon <= east,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(distance_km(10.7769, 106.7009, 10.7769, 106.7009), 0.0);
        assert_eq!(distance_km(-89.9, -179.9, -89.9, -179.9), 0.0);
    }

    #[test]
    fn nearby_gym_in_saigon_is_about_half_a_kilometre() {
        let d = distance_km(10.7800, 106.7050, 10.7769, 106.7009);
        assert!((d - 0.56).abs() < 0.01, "got {d}");
        assert!((round_km(d) - 0.56).abs() <= 0.01 + f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = distance_km(51.5074, -0.1278, 48.8566, 2.3522);
        let b = distance_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert_eq!(a, b);
    }

    #[test_case(51.5074, -0.1278, 48.8566, 2.3522, 343.56 ; "london to paris")]
    #[test_case(40.7128, -74.0060, 34.0522, -118.2437, 3935.75 ; "new york to los angeles")]
    #[test_case(0.0, 0.0, 0.0, 180.0, 20015.09 ; "half the equator")]
    fn matches_reference_distances(lat1: f64, lon1: f64, lat2: f64, lon2: f64, expected: f64) {
        let d = distance_km(lat1, lon1, lat2, lon2);
        assert!((d - expected).abs() / expected < 1e-4, "got {d}");
    }

    #[test]
    fn box_contains_points_on_the_circle() {
        let (lat, lon, r) = (10.78, 106.705, 5.0);
        let bbox = BoundingBox::around(lat, lon, r);
        for step in 0..360 {
            let bearing = (step as f64).to_radians();
            // destination point at exactly r km
            let ang = r / EARTH_RADIUS_KM;
            let lat1 = lat.to_radians();
            let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * bearing.cos()).asin();
            let lon2 = lon.to_radians()
                + (bearing.sin() * ang.sin() * lat1.cos())
                    .atan2(ang.cos() - lat1.sin() * lat2.sin());
            assert!(bbox.contains(lat2.to_degrees(), lon2.to_degrees()));
        }
    }

    #[test]
    fn box_excludes_far_points() {
        let bbox = BoundingBox::around(10.78, 106.705, 5.0);
        assert!(!bbox.contains(11.0, 106.705));
        assert!(!bbox.contains(10.78, 107.0));
    }

    #[test]
    fn box_near_pole_or_antimeridian_drops_longitude_bound() {
        assert_eq!(BoundingBox::around(89.99, 10.0, 50.0).lon, LonRange::Any);
        assert_eq!(BoundingBox::around(0.0, 179.99, 10.0).lon, LonRange::Any);
        assert!(matches!(
            BoundingBox::around(45.0, 0.0, 10.0).lon,
            LonRange::Between(_, _)
        ));
    }
}
