//! Common helpers for the load integration tests

use load_core::options::normalize_root;
use load_core::tap::{part_files, write_file};
use load_core::{Cascade, LocalPlatform, Options, Platform, RunSelection, derive};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Options rooted in a temp directory, with nothing selected.
pub fn options_in(dir: &TempDir) -> Options {
    let root = dir.path().display().to_string();
    let mut options = Options::default();
    options.input_root = normalize_root(&format!("{root}/in"));
    options.output_root = normalize_root(&format!("{root}/out"));
    options.working_root = normalize_root(&format!("{root}/work"));
    options
}

/// Write `lines` as the single input part file.
pub fn write_input(options: &Options, lines: &[&str]) {
    let path = Path::new(&options.input_root).join("part-00000");
    write_file(&path, lines.iter().copied()).unwrap();
}

/// Every line under `path`, sorted.
pub fn read_sorted(path: &str) -> Vec<String> {
    let mut lines = read_lines(path);
    lines.sort();
    lines
}

/// Every line under `path`, in part-file order.
pub fn read_lines(path: &str) -> Vec<String> {
    part_files(Path::new(path))
        .unwrap()
        .iter()
        .flat_map(|file| {
            fs::read_to_string(file)
                .unwrap()
                .lines()
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Derive the options and connect the selected loads on a two-slot local platform.
pub fn connect(options: &mut Options) -> Cascade {
    let platform = LocalPlatform::with_capacity(2);
    derive(options, &platform).unwrap();
    let properties = platform.build_properties(options).unwrap();
    let flows = RunSelection::from_options(options).build_all(options).unwrap();
    platform.new_cascade("load", flows, properties).unwrap()
}
