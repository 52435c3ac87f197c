//! The two outbound formats: the forward message handed to the next
//! pipeline stage, and the client-facing locate JSON.

use serde_json::{json, Map, Value};

use crate::correlate::{CorrelatedLocation, WayMatch};
use crate::location::Location;

/// Six decimals is about 11cm of longitude at the equator; all the wire
/// format carries.
fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn way_entry(way: &WayMatch, rounded: bool) -> Value {
    let (lat, lon) = if rounded {
        (round6(way.point.lat), round6(way.point.lon))
    } else {
        (way.point.lat, way.point.lon)
    };
    json!({
        "way_id": way.way_id,
        "correlated_lat": lat,
        "correlated_lon": lon,
    })
}

/// Build the Route/ViaRoute forward message: the request tree with the raw
/// `locations` replaced by per-index `correlated_N` entries. Serialized in
/// the same representation the configuration uses (compact JSON), so the
/// next stage parses it with the decoder it already has.
pub fn forward_message(
    tree: Value,
    locations: &[Location],
    matches: &[Vec<WayMatch>],
    osrm_compat: bool,
) -> String {
    let mut tree = match tree {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    tree.remove("locations");

    for (index, (location, ways)) in locations.iter().zip(matches).enumerate() {
        tree.insert(
            format!("correlated_{index}"),
            json!({
                "ways": ways.iter().map(|way| way_entry(way, false)).collect::<Vec<_>>(),
                "input_lat": location.point.lat,
                "input_lon": location.point.lon,
            }),
        );
    }

    // let the next stage know this trip came in through the compatibility
    // endpoint and must be serialized accordingly
    if osrm_compat {
        tree.insert("osrm".to_string(), Value::String("compatibility".to_string()));
    }
    Value::Object(tree).to_string()
}

/// Build the Locate response: one JSON object per input location, in input
/// order. Failed locations keep their slot with `ways: null` and a reason.
/// A `jsonp` callback name wraps the array in a function call.
pub fn client_message(correlated: &[CorrelatedLocation], jsonp: Option<&str>) -> String {
    let entries: Vec<Value> = correlated
        .iter()
        .map(|location| {
            let input_lat = round6(location.input.point.lat);
            let input_lon = round6(location.input.point.lon);
            match &location.outcome {
                Ok(ways) => json!({
                    "ways": ways.iter().map(|way| way_entry(way, true)).collect::<Vec<_>>(),
                    "input_lat": input_lat,
                    "input_lon": input_lon,
                }),
                Err(reason) => json!({
                    "ways": Value::Null,
                    "input_lat": input_lat,
                    "input_lon": input_lon,
                    "reason": reason,
                }),
            }
        })
        .collect();

    let body = Value::Array(entries).to_string();
    match jsonp {
        Some(name) => format!("{name}({body})"),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLon;

    fn way(way_id: u64, lat: f64, lon: f64) -> WayMatch {
        WayMatch {
            way_id,
            point: LatLon::new(lat, lon),
        }
    }

    fn location(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).unwrap()
    }

    #[test]
    fn forward_message_replaces_locations_with_correlated_entries() {
        let tree = json!({
            "locations": [{"lat": 1.0, "lon": 2.0}, {"lat": 3.0, "lon": 4.0}],
            "costing": "auto",
        });
        let locations = [location(1.0, 2.0), location(3.0, 4.0)];
        let matches = vec![vec![way(900, 1.001, 2.001)], vec![way(901, 3.001, 4.001)]];

        let message = forward_message(tree, &locations, &matches, false);
        let parsed: Value = serde_json::from_str(&message).unwrap();

        assert!(parsed.get("locations").is_none());
        assert!(parsed.get("osrm").is_none());
        assert_eq!(parsed["costing"], json!("auto"));
        assert_eq!(parsed["correlated_0"]["ways"][0]["way_id"], json!(900));
        assert_eq!(parsed["correlated_0"]["input_lat"], json!(1.0));
        assert_eq!(parsed["correlated_1"]["ways"][0]["correlated_lon"], json!(4.001));
        assert_eq!(parsed["correlated_1"]["input_lon"], json!(4.0));
    }

    #[test]
    fn viaroute_forward_message_is_stamped_for_compatibility() {
        let tree = json!({"locations": [{"lat": 1.0, "lon": 2.0}]});
        let message = forward_message(tree, &[location(1.0, 2.0)], &[vec![]], true);
        let parsed: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(parsed["osrm"], json!("compatibility"));
    }

    #[test]
    fn client_message_keeps_order_and_failure_slots() {
        let correlated = [
            CorrelatedLocation {
                input: location(1.0, 2.0),
                outcome: Ok(vec![way(900, 1.001, 2.001)]),
            },
            CorrelatedLocation {
                input: location(3.0, 4.0),
                outcome: Err("No suitable edges near location".to_string()),
            },
        ];
        let parsed: Value = serde_json::from_str(&client_message(&correlated, None)).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0]["ways"][0]["way_id"], json!(900));
        assert!(entries[0].get("reason").is_none());

        assert_eq!(entries[1]["ways"], Value::Null);
        assert_eq!(entries[1]["input_lat"], json!(3.0));
        assert_eq!(entries[1]["reason"], json!("No suitable edges near location"));
    }

    #[test]
    fn client_coordinates_are_rounded_to_six_decimals() {
        let correlated = [CorrelatedLocation {
            input: location(1.23456789, 2.0),
            outcome: Ok(vec![way(900, 1.98765432, -2.98765432)]),
        }];
        let parsed: Value = serde_json::from_str(&client_message(&correlated, None)).unwrap();
        assert_eq!(parsed[0]["input_lat"], json!(1.234568));
        assert_eq!(parsed[0]["ways"][0]["correlated_lat"], json!(1.987654));
        assert_eq!(parsed[0]["ways"][0]["correlated_lon"], json!(-2.987654));
    }

    #[test]
    fn jsonp_wraps_the_array() {
        let correlated = [CorrelatedLocation {
            input: location(1.0, 2.0),
            outcome: Ok(vec![]),
        }];
        let wrapped = client_message(&correlated, Some("callback"));
        assert!(wrapped.starts_with("callback(["));
        assert!(wrapped.ends_with(")"));
    }
}
