//! Command-line option framework.
//!
//! The pieces run in a fixed order, once per process:
//!
//! 1. [`OptionTable::standard`] declares every recognized flag as an
//!    [`OptionDescriptor`] bound to a setter on [`Options`].
//! 2. [`parse_args`] tokenizes the argument vector, dispatches matched flags
//!    and validates required flags and the work selection.
//! 3. [`derive`] expands meta selectors and resolves values that depend on
//!    other values or on platform capacity.
//!
//! [`render_usage`] and [`render_markdown`] turn the table into help text.

pub mod derive;
pub mod descriptor;
pub mod parser;
pub mod render;
pub mod standard;
pub mod table;

pub use derive::{derive, normalize_root};
pub use descriptor::{OptionDescriptor, Target, ValueKind};
pub use parser::{ParseOutcome, Parsed, parse_args};
pub use render::{render_markdown, render_usage};
pub use table::OptionTable;

use load_common::current_timestamp_millis;
use rand::Rng;
use serde::Serialize;
use tracing::Level;

/// Hash modulo used by the pipeline loads when none was given.
pub const DEFAULT_HASH_MODULO: i32 = 1_000_000;

/// Smallest accepted word-stddev modifier.
pub const MIN_DATA_STDDEV: f32 = f32::MIN_POSITIVE;

/// Largest accepted word-stddev modifier.
pub const MAX_DATA_STDDEV: f32 = 0.9999;

/// Every setting the harness recognizes.
///
/// Populated by [`parse_args`], refined by [`derive`], then owned by the
/// driver for the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Options {
    pub singleline_stats: bool,
    pub debug_logging: bool,

    // engine resources
    pub block_size_mb: i32,
    pub num_default_mappers: i32,
    pub num_default_reducers: i32,
    pub percent_max_mappers: f32,
    pub percent_max_reducers: f32,
    pub map_spec_exec: bool,
    pub reduce_spec_exec: bool,
    pub tuple_spill_threshold: i32,
    pub backend_properties: Vec<String>,
    pub num_mappers_per_block: i32,
    pub num_reducers_per_mapper: i32,
    pub child_vm_options: String,
    pub max_concurrent_flows: i32,
    pub max_concurrent_steps: i32,

    // paths
    pub input_root: String,
    pub output_root: String,
    pub working_root: String,
    pub stats_root: Option<String>,
    pub clean_work_files: bool,

    // meta selectors
    pub run_all_loads: bool,
    pub certify_tests: bool,
    pub comparison_tests: bool,
    pub run_to_destruction: bool,

    // data generation
    pub data_generate: bool,
    pub data_num_files: i32,
    pub data_file_size_mb: f32,
    pub data_max_words: i32,
    pub data_min_words: i32,
    pub data_word_delimiter: String,
    pub fill_blocks_per_file: i32,
    pub fill_files_per_avail_mapper: i32,
    pub data_mean_words: Option<f32>,
    pub data_stddev_words: Option<f32>,
    pub data_consume: bool,

    // topologies
    pub copy: bool,
    pub count_sort: bool,
    pub staggered_sort: bool,
    pub full_tuple_group: bool,
    pub multi_join: bool,
    pub self_multi_join: bool,
    pub inner_join: bool,
    pub outer_join: bool,
    pub left_join: bool,
    pub right_join: bool,
    pub pathological_inner_join: bool,
    pub pipeline: bool,
    pub chained_aggregate: bool,
    pub chained_function: bool,
    pub hash_modulo: i32,

    // deliberate failure
    pub crash_on_aggregation: bool,
    pub crash_on_buffer: bool,
    pub crash_on_filter: bool,
    pub crash_on_function: bool,
    pub break_after_events: i32,
    pub break_after_millis: i32,

    // output and metadata
    pub write_dot_file: bool,
    pub write_trace_files: bool,
    pub app_name: Option<String>,
    pub tags: Option<String>,
    pub platform_name: String,
}

impl Default for Options {
    fn default() -> Self {
        let salt: u32 = rand::thread_rng().gen_range(0..1000);
        Self {
            singleline_stats: false,
            debug_logging: false,
            block_size_mb: 64,
            num_default_mappers: -1,
            num_default_reducers: -1,
            percent_max_mappers: 0.0,
            percent_max_reducers: 0.0,
            map_spec_exec: false,
            reduce_spec_exec: false,
            tuple_spill_threshold: 100_000,
            backend_properties: Vec::new(),
            num_mappers_per_block: 1,
            num_reducers_per_mapper: -1,
            child_vm_options: "-Xmx1000m -XX:+UseParallelOldGC".to_string(),
            max_concurrent_flows: -1,
            max_concurrent_steps: -1,
            input_root: String::new(),
            output_root: String::new(),
            working_root: format!("working_{}_{}", current_timestamp_millis(), salt),
            stats_root: None,
            clean_work_files: false,
            run_all_loads: false,
            certify_tests: false,
            comparison_tests: false,
            run_to_destruction: false,
            data_generate: false,
            data_num_files: 100,
            data_file_size_mb: 100.0,
            data_max_words: 10,
            data_min_words: 10,
            data_word_delimiter: " ".to_string(),
            fill_blocks_per_file: -1,
            fill_files_per_avail_mapper: -1,
            data_mean_words: None,
            data_stddev_words: None,
            data_consume: false,
            copy: false,
            count_sort: false,
            staggered_sort: false,
            full_tuple_group: false,
            multi_join: false,
            self_multi_join: false,
            inner_join: false,
            outer_join: false,
            left_join: false,
            right_join: false,
            pathological_inner_join: false,
            pipeline: false,
            chained_aggregate: false,
            chained_function: false,
            hash_modulo: -1,
            crash_on_aggregation: false,
            crash_on_buffer: false,
            crash_on_filter: false,
            crash_on_function: false,
            break_after_events: 500,
            break_after_millis: 0,
            write_dot_file: false,
            write_trace_files: false,
            app_name: None,
            tags: None,
            platform_name: "local".to_string(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when at least one topology, generate/consume or meta selector is set.
    pub fn has_work_selected(&self) -> bool {
        self.run_all_loads
            || self.certify_tests
            || self.comparison_tests
            || self.run_to_destruction
            || self.data_generate
            || self.data_consume
            || self.copy
            || self.count_sort
            || self.staggered_sort
            || self.full_tuple_group
            || self.multi_join
            || self.self_multi_join
            || self.inner_join
            || self.outer_join
            || self.left_join
            || self.right_join
            || self.pathological_inner_join
            || self.pipeline
            || self.chained_aggregate
            || self.chained_function
    }

    /// True when any crash-testing load is selected.
    pub fn has_breaking_loads(&self) -> bool {
        self.crash_on_aggregation || self.crash_on_buffer || self.crash_on_filter || self.crash_on_function
    }

    /// Log level the driver should install. Parsing never touches the subscriber.
    pub fn log_level(&self) -> Level {
        if self.debug_logging {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// The hash modulo the pipeline loads use.
    pub fn effective_hash_modulo(&self) -> i64 {
        if self.hash_modulo > 0 {
            self.hash_modulo as i64
        } else {
            DEFAULT_HASH_MODULO as i64
        }
    }

    /// Negative values mean "engine default" and are stored as -1.
    pub fn set_max_concurrent_flows(&mut self, value: i32) {
        self.max_concurrent_flows = if value < 0 { -1 } else { value };
    }

    /// Negative values mean "engine default" and are stored as -1.
    pub fn set_max_concurrent_steps(&mut self, value: i32) {
        self.max_concurrent_steps = if value < 0 { -1 } else { value };
    }

    /// One JSON line describing the whole configuration.
    pub fn to_json_line(&self) -> load_common::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.block_size_mb, 64);
        assert_eq!(options.num_default_mappers, -1);
        assert_eq!(options.tuple_spill_threshold, 100_000);
        assert_eq!(options.data_num_files, 100);
        assert_eq!(options.data_word_delimiter, " ");
        assert_eq!(options.break_after_events, 500);
        assert!(options.working_root.starts_with("working_"));
        assert!(!options.has_work_selected());
        assert_eq!(options.platform_name, "local");
    }

    #[test]
    fn test_concurrency_setters_clamp_negative() {
        let mut options = Options::default();
        options.set_max_concurrent_flows(-7);
        options.set_max_concurrent_steps(3);
        assert_eq!(options.max_concurrent_flows, -1);
        assert_eq!(options.max_concurrent_steps, 3);
    }

    #[test]
    fn test_log_level_and_hash_modulo() {
        let mut options = Options::default();
        assert_eq!(options.log_level(), Level::INFO);
        assert_eq!(options.effective_hash_modulo(), 1_000_000);

        options.debug_logging = true;
        options.hash_modulo = 17;
        assert_eq!(options.log_level(), Level::DEBUG);
        assert_eq!(options.effective_hash_modulo(), 17);
    }

    #[test]
    fn test_json_line() {
        let options = Options::default();
        let line = options.to_json_line().unwrap();
        assert!(line.starts_with('{'));
        assert!(line.contains("\"block_size_mb\":64"));
        assert!(!line.contains('\n'));
    }
}
