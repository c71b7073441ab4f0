//! The key/value property bag handed to the engine.

use std::collections::BTreeMap;

/// Engine configuration derived from [`crate::options::Options`].
pub type Properties = BTreeMap<String, String>;

pub const SPILL_THRESHOLD: &str = "load.spill.threshold";
pub const CHILD_OPTS: &str = "load.child.opts";
pub const MAPPERS: &str = "load.mappers";
pub const REDUCERS: &str = "load.reducers";
pub const MAP_SPECULATIVE: &str = "load.map.speculative";
pub const REDUCE_SPECULATIVE: &str = "load.reduce.speculative";
pub const BLOCK_SIZE: &str = "load.block.size";
pub const MAX_CONCURRENT_FLOWS: &str = "load.max.concurrent.flows";
pub const MAX_CONCURRENT_STEPS: &str = "load.max.concurrent.steps";
pub const APP_NAME: &str = "load.app.name";
pub const APP_TAGS: &str = "load.app.tags";
pub const APP_FRAMEWORK: &str = "load.app.framework";
pub const DEBUG_LEVEL: &str = "load.debug.level";

/// Read an integer property, ignoring absent or malformed values.
pub fn get_i64(properties: &Properties, key: &str) -> Option<i64> {
    properties.get(key).and_then(|v| v.trim().parse().ok())
}

/// Read a positive count, or `None` for "engine default".
pub fn get_positive(properties: &Properties, key: &str) -> Option<usize> {
    get_i64(properties, key).filter(|v| *v > 0).map(|v| v as usize)
}
