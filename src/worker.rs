//! The per-job worker: decode, validate, dispatch, respond, clean up.
//!
//! One worker instance handles exactly one job at a time. Correctness rests
//! on the cleanup phase, not on locking: no per-request state survives past
//! [`Worker::cleanup`], which runs unconditionally after every job.

use std::collections::HashMap;

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::correlate::{self, CorrelatedLocation};
use crate::costing::{self, CostFactory, CostModel, EdgeFilter};
use crate::error::RequestError;
use crate::gate;
use crate::graph::{GraphReader, TileStore};
use crate::location::Location;
use crate::request::{self, ActionKind, RawRequest};
use crate::search::Search;
use crate::serialize;
use crate::tree;

/// Fixed body for requests whose path selects no action.
pub const VALID_ACTIONS: &str =
    "Try any of: '/route' '/viaroute' '/locate' '/nearest' '/version'";

/// What the transport should do with a finished job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Hand the message to the next pipeline stage.
    Forward(String),
    /// Answer the client directly.
    Respond(HttpReply),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
    pub json: bool,
}

impl HttpReply {
    pub fn plain(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            json: false,
        }
    }

    pub fn json(status: StatusCode, body: String) -> Self {
        Self {
            status,
            body,
            json: true,
        }
    }

    pub fn from_error(err: &RequestError) -> Self {
        Self::plain(err.status(), err.to_string())
    }
}

pub struct Worker<S: TileStore> {
    /// Immutable path-to-action table, built once at construction.
    actions: HashMap<&'static str, ActionKind>,
    max_route_locations: usize,
    max_distance: HashMap<String, f64>,
    costing_defaults: HashMap<String, Value>,
    factory: CostFactory,
    search: Box<dyn Search + Send>,
    reader: GraphReader<S>,
    // per-job scratch, cleared by cleanup()
    locations: Vec<Location>,
    cost: Option<CostModel>,
}

impl<S: TileStore> Worker<S> {
    pub fn new(config: &Config, reader: GraphReader<S>, search: Box<dyn Search + Send>) -> Self {
        let actions = HashMap::from([
            ("/route", ActionKind::Route),
            ("/viaroute", ActionKind::ViaRoute),
            ("/locate", ActionKind::Locate),
            ("/nearest", ActionKind::Nearest),
            ("/version", ActionKind::Version),
        ]);
        Self {
            actions,
            max_route_locations: config.service_limits.max_route_locations,
            max_distance: config.service_limits.max_distance.clone(),
            costing_defaults: config.costing_options.clone(),
            factory: CostFactory::new(),
            search,
            reader,
            locations: Vec::new(),
            cost: None,
        }
    }

    /// Extension hook for custom cost models.
    pub fn factory_mut(&mut self) -> &mut CostFactory {
        &mut self.factory
    }

    /// Process one job end to end. The cleanup phase always runs, success or
    /// failure, before the outcome is handed back.
    pub fn handle(&mut self, raw: &RawRequest) -> Outcome {
        debug!(path = %raw.path, "processing request");
        let outcome = self.run(raw);
        self.cleanup();
        outcome.unwrap_or_else(|err| Outcome::Respond(HttpReply::from_error(&err)))
    }

    fn run(&mut self, raw: &RawRequest) -> Result<Outcome, RequestError> {
        let Some(&action) = self.actions.get(raw.path.as_str()) else {
            return Ok(Outcome::Respond(HttpReply::plain(
                StatusCode::NOT_FOUND,
                VALID_ACTIONS,
            )));
        };

        let tree = request::decode(raw, action)?;
        self.validate(action, &tree)?;

        match action {
            ActionKind::Route | ActionKind::ViaRoute => self.route(action, tree),
            ActionKind::Locate => self.locate(&tree),
            // recognized in the path table but unhandled in dispatch
            ActionKind::Nearest | ActionKind::Version => Ok(Outcome::Respond(
                HttpReply::plain(StatusCode::NOT_IMPLEMENTED, ""),
            )),
        }
    }

    /// Progressive validation: locations first, then the costing model.
    /// Leaves the parsed locations and resolved cost model in the session
    /// scratch for the dispatch phase.
    fn validate(&mut self, action: ActionKind, tree: &Value) -> Result<(), RequestError> {
        if let Some(entries) = tree.get("locations") {
            let entries = entries.as_array().ok_or(RequestError::MalformedLocation)?;
            for entry in entries {
                self.locations.push(Location::from_tree(entry)?);
                // fail fast mid-iteration, not after collecting all
                if action != ActionKind::Locate && self.locations.len() > self.max_route_locations
                {
                    return Err(RequestError::TooManyLocations(self.max_route_locations));
                }
            }
        }
        if self.locations.is_empty() {
            return Err(RequestError::InsufficientLocations);
        }
        info!(count = self.locations.len(), "parsed locations");

        let costing = tree::optional_str(tree, "costing")?.ok_or(RequestError::MissingCosting)?;
        // multimodal costing is not yet location-aware; degrade to pedestrian
        let costing = if costing == "multimodal" {
            "pedestrian"
        } else {
            costing
        };
        self.cost = Some(costing::resolve(
            costing,
            &self.costing_defaults,
            tree,
            &self.factory,
        )?);
        Ok(())
    }

    fn cost_context(&self) -> Result<(String, EdgeFilter), RequestError> {
        match &self.cost {
            Some(cost) => Ok((cost.name.clone(), cost.filter.clone())),
            // validate() always resolved a model before dispatch runs
            None => Err(RequestError::MissingCosting),
        }
    }

    /// Route/ViaRoute: feasibility gate, then hard-fail correlation of every
    /// location, then the forward message for the path-finding stage.
    fn route(&mut self, action: ActionKind, tree: Value) -> Result<Outcome, RequestError> {
        let (costing, filter) = self.cost_context()?;
        let max_distance = self.max_distance.get(&costing).copied();
        gate::check_feasible(&self.locations, &self.reader, max_distance)?;

        let mut matches = Vec::with_capacity(self.locations.len());
        for index in 0..self.locations.len() {
            let ways = correlate::correlate(
                &self.locations[index],
                &*self.search,
                &mut self.reader,
                &filter,
            )
            .map_err(|err| RequestError::SearchFailed(err.to_string()))?;
            matches.push(ways);
        }

        let message = serialize::forward_message(
            tree,
            &self.locations,
            &matches,
            action == ActionKind::ViaRoute,
        );
        Ok(Outcome::Forward(message))
    }

    /// Locate: best-effort correlation; failures become per-location error
    /// entries and the batch carries on.
    fn locate(&mut self, tree: &Value) -> Result<Outcome, RequestError> {
        let (_, filter) = self.cost_context()?;

        let mut correlated = Vec::with_capacity(self.locations.len());
        for index in 0..self.locations.len() {
            let outcome = correlate::correlate(
                &self.locations[index],
                &*self.search,
                &mut self.reader,
                &filter,
            )
            .map_err(|err| err.to_string());
            correlated.push(CorrelatedLocation {
                input: self.locations[index].clone(),
                outcome,
            });
        }

        let jsonp = tree::optional_str(tree, "jsonp")?;
        let body = serialize::client_message(&correlated, jsonp);
        Ok(Outcome::Respond(HttpReply::json(StatusCode::OK, body)))
    }

    /// The finalizer phase: per-request scratch is dropped, and the reader's
    /// tile cache is trimmed back under budget while keeping hot tiles.
    pub fn cleanup(&mut self) {
        self.locations.clear();
        self.cost = None;
        if self.reader.over_budget() {
            self.reader.trim();
        }
    }
}
