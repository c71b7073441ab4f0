//! The harness's complete option table.

use super::descriptor::{OptionDescriptor, Target};
use super::table::OptionTable;
use load_common::Result;

impl OptionTable {
    /// Build the table of every flag the `load` binary accepts.
    ///
    /// Registration order is the order of help output and of the
    /// required-flag check.
    pub fn standard() -> Result<Self> {
        let mut table = OptionTable::new();

        for descriptor in standard_descriptors() {
            table.register(descriptor)?;
        }

        Ok(table)
    }
}

fn standard_descriptors() -> Vec<OptionDescriptor> {
    type D = OptionDescriptor;

    vec![
        D::new(&["-h", "--help"], Target::Help, "print this help text"),
        D::new(
            &["--markdown"],
            Target::Markdown,
            "generate help text as GitHub Flavored Markdown",
        ),
        D::flag(&["-SLS", "--single-line-stats"], |o| o.singleline_stats = true, "single-line stats"),
        D::flag(&["-X", "--debug"], |o| o.debug_logging = true, "debug logging"),
        // engine resources
        D::integer(&["-BS"], |o, v| o.block_size_mb = v, "default block size in MB"),
        D::integer(&["-NM"], |o, v| o.num_default_mappers = v, "default num mappers"),
        D::integer(&["-NR"], |o, v| o.num_default_reducers = v, "default num reducers"),
        D::float(&["-PM"], |o, v| o.percent_max_mappers = v, "percent of max mappers"),
        D::float(&["-PR"], |o, v| o.percent_max_reducers = v, "percent of max reducers"),
        D::flag(&["-EM"], |o| o.map_spec_exec = true, "enable map side speculative execution"),
        D::flag(&["-ER"], |o| o.reduce_spec_exec = true, "enable reduce side speculative execution"),
        D::integer(
            &["-TS"],
            |o, v| o.tuple_spill_threshold = v,
            "tuple spill threshold, default 100,000",
        ),
        D::text(
            &["-DH"],
            |o, v| o.backend_properties.push(v),
            "optional engine properties as key=value (can be used multiple times)",
        )
        .repeatable(),
        D::integer(&["-MB"], |o, v| o.num_mappers_per_block = v, "mappers per block (unused)"),
        D::integer(&["-RM"], |o, v| o.num_reducers_per_mapper = v, "reducers per mapper (unused)"),
        // paths
        D::text(
            &["-I"],
            |o, v| o.input_root = v,
            "load input data path (generated data arrives here)",
        )
        .required(),
        D::text(&["-O"], |o, v| o.output_root = v, "output path for load results").required(),
        D::text(&["-W"], |o, v| o.working_root = v, "input/output path for working files"),
        D::text(&["-S"], |o, v| o.stats_root = Some(v), "output path for job stats"),
        D::flag(&["-CWF"], |o| o.clean_work_files = true, "clean work files"),
        D::text(&["-CVMO"], |o, v| o.child_vm_options = v, "child process options"),
        D::integer(&["-MXCF"], |o, v| o.set_max_concurrent_flows(v), "maximum concurrent flows"),
        D::integer(&["-MXCS"], |o, v| o.set_max_concurrent_steps(v), "maximum concurrent steps"),
        D::flag(&["-ALL"], |o| o.run_all_loads = true, "run all available (non-discrete) loads"),
        // data generation
        D::flag(&["-g", "--generate"], |o| o.data_generate = true, "generate test data"),
        D::integer(
            &["-gf", "--generate-num-files"],
            |o, v| o.data_num_files = v,
            "num files to create",
        ),
        D::float(
            &["-gs", "--generate-file-size"],
            |o, v| o.data_file_size_mb = v,
            "size in MB of each file",
        ),
        D::integer(
            &["-gmax", "--generate-max-words"],
            |o, v| o.data_max_words = v,
            "max words per line, inclusive",
        ),
        D::integer(
            &["-gmin", "--generate-min-words"],
            |o, v| o.data_min_words = v,
            "min words per line, inclusive",
        ),
        D::text(
            &["-gd", "--generate-word-delimiter"],
            |o, v| o.data_word_delimiter = v,
            "delimiter for words",
        ),
        D::integer(
            &["-gbf", "--generate-blocks-per-file"],
            |o, v| o.fill_blocks_per_file = v,
            "fill num blocks per file",
        ),
        D::integer(
            &["-gfm", "--generate-files-per-mapper"],
            |o, v| o.fill_files_per_avail_mapper = v,
            "fill num files per available mapper",
        ),
        D::float(
            &["-gwm", "--generate-words-mean"],
            |o, v| o.data_mean_words = Some(v),
            "mean modifier [-1,1] of a normal distribution from dictionary",
        ),
        D::float(
            &["-gws", "--generate-words-stddev"],
            |o, v| o.data_stddev_words = Some(v),
            "standard-deviation modifier (0,1) of a normal distribution from dictionary",
        ),
        D::flag(&["-cd", "--consume"], |o| o.data_consume = true, "consume test data"),
        // meta selectors
        D::flag(&["-s", "--certify-tests"], |o| o.certify_tests = true, "run certification tests"),
        D::flag(
            &["-cmp", "--comparison-tests"],
            |o| o.comparison_tests = true,
            "run comparison tests",
        ),
        D::flag(
            &["-RTD", "--run-to-destruction"],
            |o| o.run_to_destruction = true,
            "run deliberately failing loads",
        ),
        // topologies
        D::flag(&["-cp", "--copy"], |o| o.copy = true, "run copy load"),
        D::flag(&["-c", "--count-sort"], |o| o.count_sort = true, "run count sort load"),
        D::flag(
            &["-ss", "--staggered-sort"],
            |o| o.staggered_sort = true,
            "run staggered compare sort load",
        ),
        D::flag(
            &["-fg", "--full-group"],
            |o| o.full_tuple_group = true,
            "run full tuple grouping load",
        ),
        D::flag(&["-m", "--multi-join"], |o| o.multi_join = true, "run multi join load"),
        D::flag(
            &["-sm", "--self-multi-join"],
            |o| o.self_multi_join = true,
            "run three way self join load",
        ),
        D::flag(&["-ij", "--inner-join"], |o| o.inner_join = true, "run inner join load"),
        D::flag(&["-oj", "--outer-join"], |o| o.outer_join = true, "run outer join load"),
        D::flag(&["-lj", "--left-join"], |o| o.left_join = true, "run left join load"),
        D::flag(&["-rj", "--right-join"], |o| o.right_join = true, "run right join load"),
        D::flag(
            &["-pij", "--pathological-inner-join"],
            |o| o.pathological_inner_join = true,
            "run inner join load on non-unique keys",
        ),
        D::flag(&["-p", "--pipeline"], |o| o.pipeline = true, "run pipeline load"),
        D::integer(
            &["-pm", "--pipeline-hash-modulo"],
            |o, v| o.hash_modulo = v,
            "hash modulo for managing key distribution",
        ),
        D::flag(
            &["-ca", "--chained-aggregate"],
            |o| o.chained_aggregate = true,
            "run chained aggregate load",
        ),
        D::flag(
            &["-cf", "--chained-function"],
            |o| o.chained_function = true,
            "run chained function load",
        ),
        // deliberate failure
        D::integer(
            &["-bae", "--break-after-events"],
            |o, v| o.break_after_events = v,
            "crashing operators fail after this many events, default 500",
        ),
        D::integer(
            &["-bat", "--break-after-time"],
            |o, v| o.break_after_millis = v,
            "crashing operators fail after this many milliseconds instead",
        ),
        // output and metadata
        D::flag(&["-wd", "--write-dot"], |o| o.write_dot_file = true, "write DOT file"),
        D::flag(
            &["-wt", "--write-trace"],
            |o| o.write_trace_files = true,
            "write planner trace files",
        ),
        D::text(&["-an", "--app-name"], |o, v| o.app_name = Some(v), "application name"),
        D::text(&["-tn", "--tags"], |o, v| o.tags = Some(v), "application tags, comma separated"),
        D::text(&["-pf", "--platform"], |o, v| o.platform_name = v, "set platform"),
        D::flag(&["-LM", "--local-mode"], |o| o.platform_name = "local".to_string(), "use the local platform"),
    ]
}
