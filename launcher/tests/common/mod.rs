//! Common helpers for the launcher tests

use load_launcher::{Launch, Main};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Paths for one run inside a temp directory.
pub struct RunDirs {
    pub dir: TempDir,
}

impl RunDirs {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    /// `-I`, `-O`, `-W` and `-S` pointing into the temp directory.
    pub fn root_args(&self) -> Vec<String> {
        vec![
            "-I".to_string(),
            self.path("in"),
            "-O".to_string(),
            self.path("out"),
            "-W".to_string(),
            self.path("work"),
            "-S".to_string(),
            self.path("stats"),
        ]
    }

    /// Files written under the stats root.
    pub fn stats_files(&self) -> Vec<PathBuf> {
        let root = Path::new(&self.path("stats")).to_path_buf();
        let mut files: Vec<PathBuf> = fs::read_dir(root)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

/// Parse `args` and expect a runnable driver.
pub fn launch(args: Vec<String>) -> Box<Main> {
    match Main::from_args(args).unwrap() {
        Launch::Run(main) => main,
        Launch::Exit { status, message } => panic!("unexpected exit {status}: {message}"),
    }
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
