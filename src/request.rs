//! Multi-format request decoding into the canonical request tree.
//!
//! Three input shapes (a `json` query parameter, a JSON body, bare query
//! parameters) all normalize to one `serde_json::Value` object. Purely
//! structural; semantic validation happens in the worker.

use axum::http::Method;
use serde_json::{json, Map, Value};

use crate::error::RequestError;
use crate::location::Location;

/// The actions the pipeline recognizes by path. `ViaRoute` differs from
/// `Route` only in input shape; the decoder normalizes it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Route,
    ViaRoute,
    Locate,
    Nearest,
    Version,
}

/// Raw transport-level job, one per request. Query pairs keep their wire
/// order, repeats included.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Normalize a raw request into the canonical tree.
pub fn decode(raw: &RawRequest, action: ActionKind) -> Result<Value, RequestError> {
    // inline json parameter wins over the body; neither means an empty tree
    let seed = if let Some((_, inline)) = raw.query.iter().find(|(key, _)| key == "json") {
        parse_json(inline.as_bytes())?
    } else if !raw.body.is_empty() {
        parse_json(&raw.body)?
    } else {
        Value::Object(Map::new())
    };
    let Value::Object(mut tree) = seed else {
        return Err(RequestError::ParseFailed);
    };

    fold_query(&mut tree, &raw.query);

    if action == ActionKind::ViaRoute {
        normalize_csv_waypoints(&mut tree)?;
    }
    Ok(Value::Object(tree))
}

fn parse_json(bytes: &[u8]) -> Result<Value, RequestError> {
    serde_json::from_slice(bytes).map_err(|_| RequestError::ParseFailed)
}

/// Fold bare query parameters into the tree: single-valued keys become
/// scalars, repeated keys arrays. The `json` key, empty keys and empty
/// values are skipped, and a key the JSON document already set wins.
fn fold_query(tree: &mut Map<String, Value>, query: &[(String, String)]) {
    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for (key, value) in query {
        if key == "json" || key.is_empty() || value.is_empty() {
            continue;
        }
        match grouped.iter_mut().find(|(name, _)| *name == key.as_str()) {
            Some((_, values)) => values.push(value),
            None => grouped.push((key, vec![value])),
        }
    }

    for (key, values) in grouped {
        if tree.contains_key(key) {
            continue;
        }
        let entry = if values.len() == 1 {
            Value::String(values[0].to_string())
        } else {
            Value::Array(values.iter().map(|v| Value::String(v.to_string())).collect())
        };
        tree.insert(key.to_string(), entry);
    }
}

/// OSRM-style input: `loc` holds CSV waypoints. Rewrite them as the standard
/// `locations` array so everything downstream sees one schema.
fn normalize_csv_waypoints(tree: &mut Map<String, Value>) -> Result<(), RequestError> {
    let Some(loc) = tree.remove("loc") else {
        return Ok(());
    };
    let waypoints: Vec<String> = match loc {
        Value::String(single) => vec![single],
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::String(s) => Ok(s),
                _ => Err(RequestError::MalformedLocation),
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(RequestError::MalformedLocation),
    };

    let mut locations = Vec::with_capacity(waypoints.len());
    for waypoint in &waypoints {
        let parsed = Location::from_csv(waypoint)?;
        locations.push(json!({"lat": parsed.point.lat, "lon": parsed.point.lon}));
    }
    tree.insert("locations".to_string(), Value::Array(locations));
    Ok(())
}
