//! Cheap feasibility pre-checks run before any correlation work.

use tracing::{debug, info};

use crate::error::RequestError;
use crate::geo::DistanceApproximator;
use crate::graph::{GraphReader, TileStore};
use crate::location::Location;

/// Reject requests whose adjacent location pairs are obviously infeasible:
/// disconnected coarse regions, or further apart than the costing's limit.
/// Walks pairs in request order and stops at the first failure; passing a
/// pair is admissibility, not proof a route exists.
pub fn check_feasible<S: TileStore>(
    locations: &[Location],
    reader: &GraphReader<S>,
    max_distance: Option<f64>,
) -> Result<(), RequestError> {
    for pair in locations.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);

        let from_region = reader.region(from.point);
        let to_region = reader.region(to.point);
        if !reader.connected(from_region, to_region) {
            return Err(RequestError::UnconnectedRegions);
        }

        let distance = DistanceApproximator::new(from.point)
            .distance_squared(to.point)
            .sqrt();
        match max_distance {
            Some(max) if distance > max => return Err(RequestError::DistanceExceeded),
            Some(_) => info!(distance_m = distance, "location pair within limits"),
            None => debug!(distance_m = distance, "no distance limit for costing"),
        }
    }
    Ok(())
}
