//! Parsed stop locations, immutable once validated.

use serde_json::Value;

use crate::error::RequestError;
use crate::geo::LatLon;
use crate::tree;

/// How the path-finding stage should treat the stop. `Break` is a hard stop
/// with a full trip leg boundary, `Through` a shaping point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopKind {
    #[default]
    Break,
    Through,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub point: LatLon,
    pub stop: StopKind,
    pub heading: Option<f64>,
    pub name: Option<String>,
}

impl Location {
    /// Range-validated constructor; everything user-supplied funnels through
    /// here.
    pub fn new(lat: f64, lon: f64) -> Result<Self, RequestError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(RequestError::MalformedLocation);
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(RequestError::MalformedLocation);
        }
        Ok(Self {
            point: LatLon::new(lat, lon),
            stop: StopKind::default(),
            heading: None,
            name: None,
        })
    }

    /// Parse one `locations` entry of the request tree.
    pub fn from_tree(entry: &Value) -> Result<Self, RequestError> {
        let obj = entry.as_object().ok_or(RequestError::MalformedLocation)?;
        let lat = obj
            .get("lat")
            .and_then(tree::lenient_f64)
            .ok_or(RequestError::MalformedLocation)?;
        let lon = obj
            .get("lon")
            .and_then(tree::lenient_f64)
            .ok_or(RequestError::MalformedLocation)?;
        let mut location = Location::new(lat, lon)?;

        if let Some(value) = obj.get("heading") {
            let heading = tree::lenient_f64(value).ok_or(RequestError::MalformedLocation)?;
            if !(0.0..=360.0).contains(&heading) {
                return Err(RequestError::MalformedLocation);
            }
            location.heading = Some(heading);
        }
        match obj.get("type") {
            None => {}
            Some(Value::String(kind)) => {
                location.stop = match kind.as_str() {
                    "break" => StopKind::Break,
                    "through" => StopKind::Through,
                    _ => return Err(RequestError::MalformedLocation),
                };
            }
            Some(_) => return Err(RequestError::MalformedLocation),
        }
        if let Some(value) = obj.get("name") {
            let name = value.as_str().ok_or(RequestError::MalformedLocation)?;
            location.name = Some(name.to_string());
        }
        Ok(location)
    }

    /// Parse an OSRM-style CSV waypoint: `lat,lon` with an optional trailing
    /// heading.
    pub fn from_csv(waypoint: &str) -> Result<Self, RequestError> {
        let fields: Vec<&str> = waypoint.split(',').collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(RequestError::MalformedLocation);
        }
        let lat: f64 = fields[0]
            .trim()
            .parse()
            .map_err(|_| RequestError::MalformedLocation)?;
        let lon: f64 = fields[1]
            .trim()
            .parse()
            .map_err(|_| RequestError::MalformedLocation)?;
        let mut location = Location::new(lat, lon)?;
        if let Some(field) = fields.get(2) {
            let heading: f64 = field
                .trim()
                .parse()
                .map_err(|_| RequestError::MalformedLocation)?;
            if !(0.0..=360.0).contains(&heading) {
                return Err(RequestError::MalformedLocation);
            }
            location.heading = Some(heading);
        }
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_object() {
        let loc = Location::from_tree(&json!({"lat": 52.1, "lon": 13.4})).unwrap();
        assert_eq!(loc.point, LatLon::new(52.1, 13.4));
        assert_eq!(loc.stop, StopKind::Break);
        assert_eq!(loc.heading, None);
    }

    #[test]
    fn accepts_numeric_strings() {
        let loc = Location::from_tree(&json!({"lat": "52.1", "lon": "13.4"})).unwrap();
        assert_eq!(loc.point, LatLon::new(52.1, 13.4));
    }

    #[test]
    fn parses_optional_fields() {
        let loc = Location::from_tree(&json!({
            "lat": 1.0, "lon": 2.0, "type": "through", "heading": 90, "name": "Alexanderplatz"
        }))
        .unwrap();
        assert_eq!(loc.stop, StopKind::Through);
        assert_eq!(loc.heading, Some(90.0));
        assert_eq!(loc.name.as_deref(), Some("Alexanderplatz"));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(Location::from_tree(&json!({"lon": 0})).is_err());
        assert!(Location::from_tree(&json!({"lat": 0})).is_err());
        assert!(Location::from_tree(&json!("52.1,13.4")).is_err());
        assert!(Location::from_tree(&json!({"lat": "north", "lon": 0})).is_err());
        assert!(Location::from_tree(&json!({"lat": 0, "lon": 0, "type": "detour"})).is_err());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Location::new(90.5, 0.0).is_err());
        assert!(Location::new(-90.5, 0.0).is_err());
        assert!(Location::new(0.0, 180.5).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
        assert!(Location::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn parses_csv_waypoints() {
        let loc = Location::from_csv("52.1,13.4").unwrap();
        assert_eq!(loc.point, LatLon::new(52.1, 13.4));
        let with_heading = Location::from_csv("52.1, 13.4, 180").unwrap();
        assert_eq!(with_heading.heading, Some(180.0));
        assert!(Location::from_csv("52.1").is_err());
        assert!(Location::from_csv("52.1,east").is_err());
        assert!(Location::from_csv("52.1,13.4,180,extra").is_err());
    }
}
