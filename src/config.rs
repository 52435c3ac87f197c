//! Service configuration, loaded once at startup and immutable for the
//! worker's lifetime.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub graph: GraphConfig,
    pub service_limits: ServiceLimits,
    /// Per-costing default option trees, merged with request overrides at
    /// resolve time. Kept free-form: option keys belong to the cost models,
    /// not to this worker.
    #[serde(default)]
    pub costing_options: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Listen address for the HTTP front end, e.g. `0.0.0.0:8002`.
    pub listen: String,
    /// Next pipeline stage's ingest address for forward messages. Without
    /// one, forward messages are only echoed to the client.
    #[serde(default)]
    pub downstream: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Graph snapshot artifact consumed by the tile store and search index.
    pub snapshot: PathBuf,
    /// Grid size of the lowest-detail level, in degrees.
    #[serde(default = "default_tile_size")]
    pub tile_size_deg: f64,
    /// Tile cache budget; the cache is trimmed back under this after a job.
    #[serde(default = "default_cache_budget")]
    pub cache_budget_bytes: usize,
}

fn default_tile_size() -> f64 {
    4.0
}

fn default_cache_budget() -> usize {
    64 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceLimits {
    /// Hard cap on locations for Route/ViaRoute requests.
    pub max_route_locations: usize,
    /// Per-costing cap on the distance between adjacent locations, meters.
    /// A costing with no entry here gets no distance pre-check.
    #[serde(default)]
    pub max_distance: HashMap<String, f64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("cannot parse config {}", path.display()))
    }
}
