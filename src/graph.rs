//! Coarse graph access: the region grid, the budgeted tile cache and way-id
//! resolution.
//!
//! Tile storage itself is an external collaborator behind [`TileStore`]; the
//! reader adds grid math and caching so a long-lived worker keeps hot tiles
//! across jobs.

use std::collections::HashMap;

use crate::geo::LatLon;

pub type RegionId = u32;

/// Travel-mode access bits carried on every edge.
pub mod access {
    pub const AUTO: u8 = 1 << 0;
    pub const BUS: u8 = 1 << 1;
    pub const BICYCLE: u8 = 1 << 2;
    pub const PEDESTRIAN: u8 = 1 << 3;
    pub const ALL: u8 = AUTO | BUS | BICYCLE | PEDESTRIAN;
}

/// Reference to a directed edge inside a region's tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId {
    pub region: RegionId,
    pub index: u32,
}

/// Fixed-degree grid at the network's lowest-detail level. Region ids are
/// row-major over the whole globe.
#[derive(Debug, Clone, Copy)]
pub struct TileGrid {
    size_deg: f64,
    rows: u32,
    cols: u32,
}

impl TileGrid {
    pub fn new(size_deg: f64) -> Self {
        let size_deg = size_deg.clamp(0.05, 90.0);
        Self {
            size_deg,
            rows: (180.0 / size_deg).ceil() as u32,
            cols: (360.0 / size_deg).ceil() as u32,
        }
    }

    /// Coarse partition id for a point. Inputs are already range-validated;
    /// the clamp only guards the exact +90/+180 boundary.
    pub fn region(&self, point: LatLon) -> RegionId {
        let row = (((point.lat + 90.0) / self.size_deg) as u32).min(self.rows - 1);
        let col = (((point.lon + 180.0) / self.size_deg) as u32).min(self.cols - 1);
        row * self.cols + col
    }
}

/// Per-region tile payload: the per-edge way ids the worker needs to
/// serialize correlations.
#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub way_ids: Vec<u64>,
}

impl Tile {
    pub fn approx_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.way_ids.len() * std::mem::size_of::<u64>()
    }
}

/// External tile storage. Loading may block on IO; the reader treats that as
/// a page fault, transparent to its callers.
pub trait TileStore {
    /// One region's tile, or `None` where storage has nothing.
    fn tile(&self, region: RegionId) -> Option<Tile>;

    /// Region to connectivity-component map, precomputed by the tiler and
    /// loaded once per reader.
    fn components(&self) -> HashMap<RegionId, u32>;
}

struct CachedTile {
    tile: Tile,
    bytes: usize,
    last_used: u64,
}

/// Budgeted tile cache. Trimming evicts least-recently-used tiles down to
/// half the budget rather than clearing, so hot tiles survive per-job
/// cleanup.
pub struct TileCache {
    tiles: HashMap<RegionId, CachedTile>,
    budget: usize,
    bytes: usize,
    clock: u64,
}

impl TileCache {
    pub fn new(budget: usize) -> Self {
        Self {
            tiles: HashMap::new(),
            budget,
            bytes: 0,
            clock: 0,
        }
    }

    fn get(&mut self, region: RegionId) -> Option<&Tile> {
        self.clock += 1;
        let clock = self.clock;
        self.tiles.get_mut(&region).map(|cached| {
            cached.last_used = clock;
            &cached.tile
        })
    }

    fn insert(&mut self, region: RegionId, tile: Tile) {
        self.clock += 1;
        let bytes = tile.approx_bytes();
        self.bytes += bytes;
        self.tiles.insert(
            region,
            CachedTile {
                tile,
                bytes,
                last_used: self.clock,
            },
        );
    }

    pub fn over_budget(&self) -> bool {
        self.bytes > self.budget
    }

    /// Evict coldest tiles until usage is at most half the budget.
    pub fn trim(&mut self) {
        let target = self.budget / 2;
        let mut by_age: Vec<(RegionId, u64)> = self
            .tiles
            .iter()
            .map(|(region, cached)| (*region, cached.last_used))
            .collect();
        by_age.sort_by_key(|(_, last_used)| *last_used);
        for (region, _) in by_age {
            if self.bytes <= target {
                break;
            }
            if let Some(evicted) = self.tiles.remove(&region) {
                self.bytes -= evicted.bytes;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

/// Long-lived graph handle: grid math, connectivity lookups and cached
/// way-id resolution over a [`TileStore`].
pub struct GraphReader<S> {
    grid: TileGrid,
    store: S,
    components: HashMap<RegionId, u32>,
    cache: TileCache,
}

impl<S: TileStore> GraphReader<S> {
    pub fn new(store: S, grid: TileGrid, cache_budget: usize) -> Self {
        let components = store.components();
        Self {
            grid,
            store,
            components,
            cache: TileCache::new(cache_budget),
        }
    }

    pub fn region(&self, point: LatLon) -> RegionId {
        self.grid.region(point)
    }

    /// Coarse admissibility: regions the tiler never saw are disconnected
    /// from everything, including themselves.
    pub fn connected(&self, a: RegionId, b: RegionId) -> bool {
        match (self.components.get(&a), self.components.get(&b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Way id behind an edge reference; `None` when storage no longer has
    /// the tile or the edge (stale search index).
    pub fn way_id(&mut self, edge: EdgeId) -> Option<u64> {
        if self.cache.get(edge.region).is_none() {
            let tile = self.store.tile(edge.region)?;
            self.cache.insert(edge.region, tile);
        }
        self.cache
            .get(edge.region)
            .and_then(|tile| tile.way_ids.get(edge.index as usize).copied())
    }

    pub fn over_budget(&self) -> bool {
        self.cache.over_budget()
    }

    pub fn trim(&mut self) {
        self.cache.trim();
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }
}
