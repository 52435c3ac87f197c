pub mod config;
pub mod correlate;
pub mod costing;
pub mod error;
pub mod gate;
pub mod geo;
pub mod graph;
pub mod location;
pub mod request;
pub mod search;
pub mod serialize;
pub mod server;
pub mod snapshot;
pub mod tree;
pub mod worker;

pub use config::Config;
pub use correlate::{CorrelatedLocation, WayMatch};
pub use error::RequestError;
pub use location::Location;
pub use snapshot::GraphSnapshot;
pub use worker::Worker;
