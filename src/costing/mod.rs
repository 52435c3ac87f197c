//! Travel-mode cost models: per-mode defaults, request overrides and the
//! edge-admissibility filters used during correlation.
//!
//! The path-finding stage owns the real traversal costs; this worker only
//! resolves a named model into merged options plus the filter the search
//! collaborator applies when snapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::RequestError;
use crate::graph::access;

/// Admissibility predicate over an edge's travel-mode access mask.
pub type EdgeFilter = Arc<dyn Fn(u8) -> bool + Send + Sync>;

/// Builds a model from already-merged options.
pub type CostBuilder = Arc<dyn Fn(&Map<String, Value>) -> CostModel + Send + Sync>;

/// The closed set of built-in travel modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostMode {
    Auto,
    AutoShorter,
    Bus,
    Bicycle,
    Pedestrian,
}

impl CostMode {
    pub const ALL: [CostMode; 5] = [
        CostMode::Auto,
        CostMode::AutoShorter,
        CostMode::Bus,
        CostMode::Bicycle,
        CostMode::Pedestrian,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CostMode::Auto => "auto",
            CostMode::AutoShorter => "auto_shorter",
            CostMode::Bus => "bus",
            CostMode::Bicycle => "bicycle",
            CostMode::Pedestrian => "pedestrian",
        }
    }

    fn access_mask(self) -> u8 {
        match self {
            CostMode::Auto | CostMode::AutoShorter => access::AUTO,
            CostMode::Bus => access::BUS,
            CostMode::Bicycle => access::BICYCLE,
            CostMode::Pedestrian => access::PEDESTRIAN,
        }
    }
}

/// A fully resolved costing model: the merged options handed downstream and
/// the filter handed to the search collaborator.
#[derive(Clone)]
pub struct CostModel {
    pub name: String,
    pub options: Map<String, Value>,
    pub filter: EdgeFilter,
}

impl fmt::Debug for CostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostModel")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn mask_builder(name: &'static str, mask: u8) -> CostBuilder {
    Arc::new(move |options| CostModel {
        name: name.to_string(),
        options: options.clone(),
        filter: Arc::new(move |edge_access| edge_access & mask != 0),
    })
}

/// Name-keyed factory over the built-in modes. `register` is the extension
/// hook for custom models; built-ins can be overridden the same way.
pub struct CostFactory {
    builders: HashMap<String, CostBuilder>,
}

impl CostFactory {
    pub fn new() -> Self {
        let mut factory = Self {
            builders: HashMap::new(),
        };
        for mode in CostMode::ALL {
            factory.register(mode.name(), mask_builder(mode.name(), mode.access_mask()));
        }
        factory
    }

    pub fn register(&mut self, name: &str, builder: CostBuilder) {
        self.builders.insert(name.to_string(), builder);
    }

    pub fn create(&self, name: &str, options: &Map<String, Value>) -> Result<CostModel, RequestError> {
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| RequestError::UnknownCosting(name.to_string()))?;
        Ok(builder(options))
    }
}

impl Default for CostFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a costing name: configured defaults, shallow request overrides,
/// then the factory. The config lookup and the factory lookup are separate
/// checkpoints; both yield `UnknownCosting`.
pub fn resolve(
    name: &str,
    defaults: &HashMap<String, Value>,
    request: &Value,
    factory: &CostFactory,
) -> Result<CostModel, RequestError> {
    let configured = defaults
        .get(name)
        .ok_or_else(|| RequestError::UnknownCosting(name.to_string()))?;
    let mut merged = configured.as_object().cloned().unwrap_or_default();

    // Shallow per-key overwrite: override replaces or adds keys, untouched
    // defaults survive. Not a recursive merge.
    if let Some(overrides) = request
        .get("costing_options")
        .and_then(|options| options.get(name))
        .and_then(Value::as_object)
    {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }

    factory.create(name, &merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> HashMap<String, Value> {
        HashMap::from([
            (
                "auto".to_string(),
                json!({"top_speed": 140, "toll_factor": 1.0}),
            ),
            ("pedestrian".to_string(), json!({"walking_speed": 5.1})),
        ])
    }

    #[test]
    fn unconfigured_name_fails_at_the_config_checkpoint() {
        let err = resolve("yak", &defaults(), &json!({}), &CostFactory::new()).unwrap_err();
        assert_eq!(err, RequestError::UnknownCosting("yak".to_string()));
        assert_eq!(err.to_string(), "No costing method found for 'yak'");
    }

    #[test]
    fn unregistered_name_fails_at_the_factory_checkpoint() {
        // configured, but no builder registered for it
        let mut configured = defaults();
        configured.insert("yak".to_string(), json!({}));
        let err = resolve("yak", &configured, &json!({}), &CostFactory::new()).unwrap_err();
        assert_eq!(err, RequestError::UnknownCosting("yak".to_string()));
    }

    #[test]
    fn merge_is_shallow_per_key() {
        let request = json!({
            "costing_options": {"auto": {"toll_factor": 8.5, "height": 4.1}}
        });
        let model = resolve("auto", &defaults(), &request, &CostFactory::new()).unwrap();
        assert_eq!(model.options["top_speed"], json!(140));
        assert_eq!(model.options["toll_factor"], json!(8.5));
        assert_eq!(model.options["height"], json!(4.1));
    }

    #[test]
    fn overrides_for_another_costing_are_ignored() {
        let request = json!({"costing_options": {"pedestrian": {"walking_speed": 7.0}}});
        let model = resolve("auto", &defaults(), &request, &CostFactory::new()).unwrap();
        assert_eq!(model.options["toll_factor"], json!(1.0));
    }

    #[test]
    fn filters_follow_the_mode_access_mask() {
        let resolver = CostFactory::new();
        let auto = resolve("auto", &defaults(), &json!({}), &resolver).unwrap();
        let foot = resolve("pedestrian", &defaults(), &json!({}), &resolver).unwrap();

        assert!((auto.filter)(access::AUTO));
        assert!((auto.filter)(access::ALL));
        assert!(!(auto.filter)(access::PEDESTRIAN));
        assert!((foot.filter)(access::PEDESTRIAN | access::BICYCLE));
        assert!(!(foot.filter)(access::AUTO | access::BUS));
    }

    #[test]
    fn registered_extensions_resolve_like_builtins() {
        let mut factory = CostFactory::new();
        factory.register("yak", mask_builder("yak", access::PEDESTRIAN));
        let mut configured = defaults();
        configured.insert("yak".to_string(), json!({"stubbornness": 11}));

        let model = resolve("yak", &configured, &json!({}), &factory).unwrap();
        assert_eq!(model.name, "yak");
        assert_eq!(model.options["stubbornness"], json!(11));
    }
}
