//! The nearest-edge search seam and its default R-tree implementation.
//!
//! The real search algorithm is an external collaborator; everything here is
//! the trait the worker talks to plus a plain nearest-neighbour index good
//! enough to run the service against a snapshot.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use thiserror::Error;

use crate::costing::EdgeFilter;
use crate::geo::LatLon;
use crate::graph::EdgeId;
use crate::location::Location;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("No suitable edges near location")]
    NoEdgesFound,
}

/// One admissible edge candidate with the position the input snapped to.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub edge: EdgeId,
    pub point: LatLon,
}

/// `Search(location, filter) -> candidates`, the collaborator contract.
pub trait Search {
    fn nearest(&self, location: &Location, filter: &EdgeFilter) -> Result<Vec<Candidate>, SearchError>;
}

/// Point with edge reference and access mask for the R-tree.
#[derive(Clone, Copy, Debug, PartialEq)]
struct IndexedEdge {
    coords: [f64; 2], // [lon, lat]
    edge: EdgeId,
    access: u8,
}

impl RTreeObject for IndexedEdge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for IndexedEdge {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coords[0] - point[0];
        let dy = self.coords[1] - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.coords == *point
    }
}

/// Spatial index over snapshot edges; candidates beyond the degree cutoff
/// are not worth anchoring a route to.
pub struct EdgeIndex {
    tree: RTree<IndexedEdge>,
    cutoff_deg: f64,
    max_candidates: usize,
}

/// Roughly 25km at the equator.
const DEFAULT_CUTOFF_DEG: f64 = 0.25;
const DEFAULT_MAX_CANDIDATES: usize = 8;

impl EdgeIndex {
    pub fn new(edges: Vec<(EdgeId, LatLon, u8)>) -> Self {
        let points = edges
            .into_iter()
            .map(|(edge, point, access)| IndexedEdge {
                coords: [point.lon, point.lat],
                edge,
                access,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(points),
            cutoff_deg: DEFAULT_CUTOFF_DEG,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_cutoff(mut self, cutoff_deg: f64) -> Self {
        self.cutoff_deg = cutoff_deg;
        self
    }
}

impl Search for EdgeIndex {
    fn nearest(&self, location: &Location, filter: &EdgeFilter) -> Result<Vec<Candidate>, SearchError> {
        let origin = [location.point.lon, location.point.lat];
        let cutoff_2 = self.cutoff_deg * self.cutoff_deg;
        let admit = filter.as_ref();

        let mut candidates = Vec::new();
        for (indexed, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&origin) {
            if distance_2 > cutoff_2 {
                break;
            }
            if !admit(indexed.access) {
                continue;
            }
            candidates.push(Candidate {
                edge: indexed.edge,
                point: LatLon::new(indexed.coords[1], indexed.coords[0]),
            });
            if candidates.len() >= self.max_candidates {
                break;
            }
        }

        if candidates.is_empty() {
            return Err(SearchError::NoEdgesFound);
        }
        Ok(candidates)
    }
}
