//! In-process platform backed by the local filesystem.

use super::{CapacityProvider, Platform};
use crate::stats::Stats;
use crate::tap::write_file;
use load_common::{ErrorContext, LoadError, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Runs everything in this process, one task slot per CPU.
#[derive(Debug, Clone)]
pub struct LocalPlatform {
    capacity: i32,
}

impl LocalPlatform {
    pub fn new() -> Self {
        Self {
            capacity: num_cpus::get() as i32,
        }
    }

    /// A platform reporting a fixed capacity.
    pub fn with_capacity(capacity: i32) -> Self {
        Self { capacity }
    }
}

impl Default for LocalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl CapacityProvider for LocalPlatform {
    fn max_concurrent_mappers(&self) -> i32 {
        self.capacity
    }

    fn max_concurrent_reducers(&self) -> i32 {
        self.capacity
    }
}

impl Platform for LocalPlatform {
    fn name(&self) -> &str {
        "local"
    }

    fn capacity(&self) -> &dyn CapacityProvider {
        self
    }

    fn children_of(&self, path: &str) -> Result<Vec<String>> {
        let entries = fs::read_dir(path).with_io_context(|| format!("listing {path}"))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.with_io_context(|| format!("listing {path}"))?;
            children.push(entry.file_name().to_string_lossy().to_string());
        }
        children.sort();
        Ok(children)
    }

    fn write_lines(&self, path: &str, lines: &[String]) -> Result<()> {
        write_file(Path::new(path), lines)?;
        Ok(())
    }

    fn clean_directories(&self, paths: &[&str]) -> Result<()> {
        let mut first_error: Option<LoadError> = None;

        for path in paths {
            let target = Path::new(path);
            let removed = if target.is_dir() {
                fs::remove_dir_all(target)
            } else if target.exists() {
                fs::remove_file(target)
            } else {
                debug!("nothing to clean at {}", path);
                continue;
            };

            if let Err(e) = removed {
                warn!("unable to remove {}: {}", path, e);
                if first_error.is_none() {
                    first_error = Some(LoadError::io_error_with_source(
                        format!("cleaning {path}"),
                        e,
                    ));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn cpu_millis(&self, _stats: &Stats) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_capacity() {
        let platform = LocalPlatform::with_capacity(6);
        assert_eq!(platform.max_concurrent_mappers(), 6);
        assert_eq!(platform.max_concurrent_reducers(), 6);
        assert!(LocalPlatform::new().max_concurrent_mappers() >= 1);
    }

    #[test]
    fn test_write_and_list() {
        let dir = tempdir().unwrap();
        let platform = LocalPlatform::new();
        let root = dir.path().to_string_lossy().to_string();

        let stats_file = format!("{root}/stats/local-1");
        platform
            .write_lines(&stats_file, &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(fs::read_to_string(&stats_file).unwrap(), "a\nb\n");
        assert_eq!(platform.children_of(&format!("{root}/stats")).unwrap(), vec!["local-1"]);
    }

    #[test]
    fn test_clean_directories() {
        let dir = tempdir().unwrap();
        let platform = LocalPlatform::new();
        let input = dir.path().join("input");
        let working = dir.path().join("working");
        fs::create_dir_all(input.join("nested")).unwrap();
        fs::create_dir_all(&working).unwrap();

        let input = input.to_string_lossy().to_string();
        let working = working.to_string_lossy().to_string();
        let missing = dir.path().join("missing").to_string_lossy().to_string();

        platform
            .clean_directories(&[&input, &working, &missing])
            .unwrap();
        assert!(!Path::new(&input).exists());
        assert!(!Path::new(&working).exists());
    }
}
