//! Request-level error taxonomy shared by decode, validation and correlation.

use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong with a single job. All variants are
/// request-local: the worker converts them to a response and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Failed to parse json request")]
    ParseFailed,

    #[error("Failed to parse location")]
    MalformedLocation,

    #[error("Insufficient number of locations provided")]
    InsufficientLocations,

    #[error("Exceeded max locations of {0}.")]
    TooManyLocations(usize),

    #[error("No edge/node costing provided")]
    MissingCosting,

    #[error("No costing method found for '{0}'")]
    UnknownCosting(String),

    #[error("Expected {expected} for '{key}'")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Locations are in unconnected regions. Go check/edit the map at osm.org")]
    UnconnectedRegions,

    #[error("Path distance exceeds the max distance limit.")]
    DistanceExceeded,

    /// The search collaborator's own message, surfaced verbatim.
    #[error("{0}")]
    SearchFailed(String),
}

impl RequestError {
    /// HTTP status the transport answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::UnconnectedRegions => StatusCode::NOT_FOUND,
            RequestError::DistanceExceeded => StatusCode::PRECONDITION_FAILED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
