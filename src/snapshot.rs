//! Graph snapshot artifact: one JSON file that yields both the tile store
//! and the search index.
//!
//! A stand-in for real tiled storage behind the [`TileStore`] seam. The
//! snapshot is produced offline by the tiler; this worker only consumes it.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::LatLon;
use crate::graph::{EdgeId, RegionId, Tile, TileGrid, TileStore};
use crate::search::EdgeIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub way_id: u64,
    pub lat: f64,
    pub lon: f64,
    /// Travel-mode access bits, see [`crate::graph::access`].
    pub access: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Region to connectivity component, keyed by the same grid the service
    /// is configured with.
    #[serde(default)]
    pub components: HashMap<RegionId, u32>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

impl GraphSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open graph snapshot {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("cannot parse graph snapshot {}", path.display()))
    }

    /// Split into the worker's two collaborators: tile storage and the
    /// nearest-edge index. Edge ids are region-local positions, identical on
    /// both sides.
    pub fn into_parts(self, grid: TileGrid) -> (SnapshotStore, EdgeIndex) {
        let mut tiles: HashMap<RegionId, Vec<u64>> = HashMap::new();
        let mut indexed = Vec::with_capacity(self.edges.len());

        for edge in &self.edges {
            let point = LatLon::new(edge.lat, edge.lon);
            let region = grid.region(point);
            let way_ids = tiles.entry(region).or_default();
            let id = EdgeId {
                region,
                index: way_ids.len() as u32,
            };
            way_ids.push(edge.way_id);
            indexed.push((id, point, edge.access));
        }

        (
            SnapshotStore {
                tiles,
                components: self.components,
            },
            EdgeIndex::new(indexed),
        )
    }
}

/// In-memory [`TileStore`] over a loaded snapshot.
pub struct SnapshotStore {
    tiles: HashMap<RegionId, Vec<u64>>,
    components: HashMap<RegionId, u32>,
}

impl TileStore for SnapshotStore {
    fn tile(&self, region: RegionId) -> Option<Tile> {
        self.tiles.get(&region).map(|way_ids| Tile {
            way_ids: way_ids.clone(),
        })
    }

    fn components(&self) -> HashMap<RegionId, u32> {
        self.components.clone()
    }
}
