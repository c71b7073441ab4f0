//! Execution platform abstraction.
//!
//! A platform reports its capacity (used while deriving options), turns the
//! derived options into engine properties, and provides the storage
//! operations the driver needs around a run.

pub mod local;

pub use local::LocalPlatform;

use crate::cascade::Cascade;
use crate::flow::FlowDef;
use crate::options::Options;
use crate::properties::{self, Properties};
use crate::stats::Stats;
use load_common::{LoadError, Result};

/// Reports how many tasks of each kind the platform can run at once.
pub trait CapacityProvider {
    fn max_concurrent_mappers(&self) -> i32;
    fn max_concurrent_reducers(&self) -> i32;
}

/// A backend the harness can run on.
pub trait Platform: CapacityProvider + Send + Sync {
    fn name(&self) -> &str;

    /// The capacity this platform reports, for option derivation.
    fn capacity(&self) -> &dyn CapacityProvider;

    /// Engine properties for a derived configuration.
    fn build_properties(&self, options: &Options) -> Result<Properties> {
        base_properties(options)
    }

    /// Names of the entries directly under `path`, sorted.
    fn children_of(&self, path: &str) -> Result<Vec<String>>;

    /// Write `lines` as a single text file at `path`.
    fn write_lines(&self, path: &str, lines: &[String]) -> Result<()>;

    /// Remove every given path that exists. All paths are attempted; the
    /// first failure is returned.
    fn clean_directories(&self, paths: &[&str]) -> Result<()>;

    /// CPU time consumed by the unit of work behind `stats`, when known.
    fn cpu_millis(&self, stats: &Stats) -> u64;

    /// Connect flows into a cascade runnable on this platform.
    fn new_cascade(&self, name: &str, flows: Vec<FlowDef>, properties: Properties) -> Result<Cascade> {
        Cascade::connect(name, flows, properties)
    }
}

/// Resolve a platform by name.
pub fn load_platform(name: &str) -> Result<Box<dyn Platform>> {
    match name {
        "local" => Ok(Box::new(LocalPlatform::new())),
        other => Err(LoadError::configuration_error(format!(
            "Invalid platform. Trying to load {other} but found local"
        ))),
    }
}

/// Properties every platform shares.
pub fn base_properties(options: &Options) -> Result<Properties> {
    let mut props = Properties::new();
    let mut set = |key: &str, value: String| {
        props.insert(key.to_string(), value);
    };

    set(properties::SPILL_THRESHOLD, options.tuple_spill_threshold.to_string());
    set(properties::CHILD_OPTS, options.child_vm_options.clone());
    set(properties::MAPPERS, options.num_default_mappers.to_string());
    set(properties::REDUCERS, options.num_default_reducers.to_string());
    set(properties::MAP_SPECULATIVE, options.map_spec_exec.to_string());
    set(properties::REDUCE_SPECULATIVE, options.reduce_spec_exec.to_string());
    set(
        properties::BLOCK_SIZE,
        (options.block_size_mb as i64 * 1024 * 1024).to_string(),
    );
    set(
        properties::MAX_CONCURRENT_FLOWS,
        options.max_concurrent_flows.to_string(),
    );
    set(
        properties::MAX_CONCURRENT_STEPS,
        options.max_concurrent_steps.to_string(),
    );
    set(properties::APP_FRAMEWORK, "load".to_string());
    set(
        properties::DEBUG_LEVEL,
        if options.debug_logging { "VERBOSE" } else { "NONE" }.to_string(),
    );
    if let Some(app_name) = &options.app_name {
        set(properties::APP_NAME, app_name.clone());
    }
    if let Some(tags) = &options.tags {
        set(properties::APP_TAGS, tags.clone());
    }

    for pair in &options.backend_properties {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            LoadError::configuration_error(format!(
                "engine property '{pair}' must be of the form key=value"
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(LoadError::configuration_error(format!(
                "engine property '{pair}' has an empty key"
            )));
        }
        props.insert(key.to_string(), value.to_string());
    }

    Ok(props)
}
