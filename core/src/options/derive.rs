//! Derivation pass: meta-selector expansion, capacity-dependent values and clamps.

use super::{MAX_DATA_STDDEV, MIN_DATA_STDDEV, Options};
use crate::platform::CapacityProvider;
use load_common::{LoadError, Result};
use tracing::info;

/// Resolve dependent values in place.
///
/// Applying this twice gives the same result as applying it once. A fill rule
/// whose product does not fit the target field is a configuration error.
pub fn derive(options: &mut Options, capacity: &dyn CapacityProvider) -> Result<()> {
    expand_meta_selectors(options);

    if options.num_default_mappers == -1 && options.percent_max_mappers != 0.0 {
        options.num_default_mappers = scaled(capacity.max_concurrent_mappers(), options.percent_max_mappers);
        info!("using default mappers: {}", options.num_default_mappers);
    }

    if options.num_default_reducers == -1 && options.percent_max_reducers != 0.0 {
        options.num_default_reducers =
            scaled(capacity.max_concurrent_reducers(), options.percent_max_reducers);
        info!("using default reducers: {}", options.num_default_reducers);
    }

    if options.fill_blocks_per_file != -1 {
        let size_mb = options
            .block_size_mb
            .checked_mul(options.fill_blocks_per_file)
            .ok_or_else(|| {
                LoadError::configuration_error(format!(
                    "-BS {} times -gbf {} overflows the file size",
                    options.block_size_mb, options.fill_blocks_per_file
                ))
            })?;
        options.data_file_size_mb = size_mb as f32;
        info!("using file size (MB): {}", options.data_file_size_mb);
    }

    if options.fill_files_per_avail_mapper != -1 {
        let mappers = capacity.max_concurrent_mappers();
        options.data_num_files = mappers
            .checked_mul(options.fill_files_per_avail_mapper)
            .ok_or_else(|| {
                LoadError::configuration_error(format!(
                    "-gfm {} times {} available mappers overflows the file count",
                    options.fill_files_per_avail_mapper, mappers
                ))
            })?;
        info!("using num files: {}", options.data_num_files);
    }

    if options.data_max_words < options.data_min_words {
        options.data_max_words = options.data_min_words;
        info!("using max words: {}", options.data_max_words);
    }

    options.data_mean_words = options.data_mean_words.map(|mean| mean.clamp(-1.0, 1.0));
    options.data_stddev_words = options
        .data_stddev_words
        .map(|stddev| stddev.clamp(MIN_DATA_STDDEV, MAX_DATA_STDDEV));

    options.input_root = normalize_root(&options.input_root);
    options.output_root = normalize_root(&options.output_root);
    options.working_root = normalize_root(&options.working_root);
    options.stats_root = options.stats_root.as_deref().map(normalize_root);
    Ok(())
}

fn expand_meta_selectors(options: &mut Options) {
    if options.run_all_loads {
        options.data_generate = true;
        options.copy = true;
        options.count_sort = true;
        options.full_tuple_group = true;
        options.staggered_sort = true;
        options.outer_join = true;
        options.inner_join = true;
        options.left_join = true;
        options.right_join = true;
        options.multi_join = true;
        options.self_multi_join = true;
        options.chained_function = true;
        options.chained_aggregate = true;
        options.pipeline = true;
        options.data_consume = true;
    }

    if options.certify_tests {
        options.data_generate = true;
        options.count_sort = true;
        options.multi_join = true;
        options.pipeline = true;
    }

    if options.comparison_tests {
        options.data_generate = true;
        options.count_sort = true;
        options.staggered_sort = true;
        options.full_tuple_group = true;
        options.inner_join = true;
        options.outer_join = true;
        options.left_join = true;
        options.right_join = true;
        options.chained_function = true;
        options.chained_aggregate = true;
    }

    if options.run_to_destruction {
        options.data_generate = true;
        options.pathological_inner_join = true;
        options.crash_on_aggregation = true;
        options.crash_on_buffer = true;
        options.crash_on_filter = true;
        options.crash_on_function = true;
    }

    // the multi-join reads the copy's output
    if options.multi_join {
        options.copy = true;
    }
}

fn scaled(capacity: i32, fraction: f32) -> i32 {
    (capacity as f64 * fraction as f64).floor() as i32
}

/// Ensure exactly one trailing `/`; empty becomes the current directory.
pub fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_end_matches('/');

    if trimmed.is_empty() {
        return if root.is_empty() { "./" } else { "/" }.to_string();
    }

    format!("{trimmed}/")
}
