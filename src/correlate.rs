//! Per-location correlation against the graph, with way-level deduplication.

use tracing::warn;

use crate::costing::EdgeFilter;
use crate::geo::LatLon;
use crate::graph::{GraphReader, TileStore};
use crate::location::Location;
use crate::search::{Search, SearchError};

/// A matched way reference: the way id plus the position the input snapped
/// to on it.
#[derive(Debug, Clone, PartialEq)]
pub struct WayMatch {
    pub way_id: u64,
    pub point: LatLon,
}

/// Input location plus its correlation outcome. Collections of these stay
/// order-aligned with the request's locations, failures included.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedLocation {
    pub input: Location,
    pub outcome: Result<Vec<WayMatch>, String>,
}

/// Snap one location onto the graph. Candidates from the search collaborator
/// are resolved to way ids and deduplicated: two matches are duplicates iff
/// they share the way id and the exact snapped vertex, which is what the two
/// directed edges of a bidirectional way produce.
///
/// Failure policy is the caller's: Route propagates, Locate records.
pub fn correlate<S: TileStore>(
    location: &Location,
    search: &dyn Search,
    reader: &mut GraphReader<S>,
    filter: &EdgeFilter,
) -> Result<Vec<WayMatch>, SearchError> {
    let candidates = search.nearest(location, filter)?;

    let mut matches: Vec<WayMatch> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(way_id) = reader.way_id(candidate.edge) else {
            // search references should be valid; stale storage degrades to
            // "no match" for that edge
            warn!(
                region = candidate.edge.region,
                index = candidate.edge.index,
                "edge found by search is missing from storage"
            );
            continue;
        };
        let duplicate = matches
            .iter()
            .any(|m| m.way_id == way_id && m.point.same_point(&candidate.point));
        if !duplicate {
            matches.push(WayMatch {
                way_id,
                point: candidate.point,
            });
        }
    }
    Ok(matches)
}
