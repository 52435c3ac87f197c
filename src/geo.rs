use serde::{Deserialize, Serialize};

/// Meters per degree of latitude. Constant enough for a pre-filter.
pub const METERS_PER_DEGREE_LAT: f64 = 110_567.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Bit-identical comparison, used when deduplicating snapped vertices.
    pub fn same_point(&self, other: &LatLon) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
    }
}

/// Cheap great-circle approximation seeded at a reference point: longitude
/// degrees shrink with cos(lat). Good to a fraction of a percent at the
/// distances the feasibility gate cares about.
pub struct DistanceApproximator {
    origin: LatLon,
    meters_per_lon_degree: f64,
}

impl DistanceApproximator {
    pub fn new(origin: LatLon) -> Self {
        Self {
            origin,
            meters_per_lon_degree: origin.lat.to_radians().cos() * METERS_PER_DEGREE_LAT,
        }
    }

    /// Squared distance in meters^2 from the seed point.
    pub fn distance_squared(&self, to: LatLon) -> f64 {
        let dy = (to.lat - self.origin.lat) * METERS_PER_DEGREE_LAT;
        let dx = (to.lon - self.origin.lon) * self.meters_per_lon_degree;
        dx * dx + dy * dy
    }
}

/// Approximate distance in meters between two points.
pub fn approx_distance(a: LatLon, b: LatLon) -> f64 {
    DistanceApproximator::new(a).distance_squared(b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_lat_degree_is_about_110km() {
        let d = approx_distance(LatLon::new(0.0, 0.0), LatLon::new(1.0, 0.0));
        assert!((d - METERS_PER_DEGREE_LAT).abs() < 1.0);
    }

    #[test]
    fn lon_degrees_shrink_with_latitude() {
        let at_equator = approx_distance(LatLon::new(0.0, 0.0), LatLon::new(0.0, 1.0));
        let at_sixty = approx_distance(LatLon::new(60.0, 0.0), LatLon::new(60.0, 1.0));
        // cos(60 deg) = 0.5
        assert!((at_sixty / at_equator - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pole_to_pole_is_about_20000km() {
        let d = approx_distance(LatLon::new(90.0, 0.0), LatLon::new(-90.0, 0.0));
        assert!((d - 180.0 * METERS_PER_DEGREE_LAT).abs() < 1.0);
    }

    #[test]
    fn same_point_is_exact() {
        let a = LatLon::new(1.5, -2.5);
        assert!(a.same_point(&LatLon::new(1.5, -2.5)));
        assert!(!a.same_point(&LatLon::new(1.5 + 1e-12, -2.5)));
    }
}
