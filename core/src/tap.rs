//! Text taps on the local filesystem.
//!
//! A source path is either a single file or a directory of part files; each
//! file becomes one partition of single-field `[line]` tuples. Hidden and
//! bookkeeping files (names starting with `.` or `_`) are skipped. A sink
//! replaces its directory with one `part-NNNNN` file per partition.

use crate::tuple::{Tuple, Value, tuple_to_line};
use load_common::{ErrorContext, Result};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A text tap rooted at a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tap {
    path: String,
}

impl Tap {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read all partitions.
    pub fn read(&self) -> Result<Vec<Vec<Tuple>>> {
        part_files(Path::new(&self.path))?
            .iter()
            .map(|file| read_lines(file))
            .collect()
    }

    /// Replace the sink directory with one part file per partition.
    /// Returns the number of tuples written.
    pub fn write(&self, partitions: &[Vec<Tuple>]) -> Result<u64> {
        let root = Path::new(&self.path);
        if root.is_dir() {
            fs::remove_dir_all(root).with_io_context(|| format!("replacing {}", self.path))?;
        } else if root.is_file() {
            fs::remove_file(root).with_io_context(|| format!("replacing {}", self.path))?;
        }
        fs::create_dir_all(root).with_io_context(|| format!("creating {}", self.path))?;

        let mut written = 0;
        for (index, partition) in partitions.iter().enumerate() {
            let lines = partition.iter().map(|tuple| tuple_to_line(tuple));
            written += write_file(&root.join(part_name(index)), lines)?;
        }
        Ok(written)
    }
}

/// Name of the n-th part file.
pub fn part_name(index: usize) -> String {
    format!("part-{index:05}")
}

/// Data files under `path`, sorted by name.
pub fn part_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries =
        fs::read_dir(path).with_io_context(|| format!("listing {}", path.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_io_context(|| format!("listing {}", path.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Write lines to a single file, creating parent directories.
pub fn write_file<I, S>(path: &Path, lines: I) -> Result<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_io_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let file = fs::File::create(path).with_io_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for line in lines {
        writeln!(writer, "{}", line.as_ref())
            .with_io_context(|| format!("writing {}", path.display()))?;
        count += 1;
    }
    writer
        .flush()
        .with_io_context(|| format!("writing {}", path.display()))?;
    Ok(count)
}

fn read_lines(path: &Path) -> Result<Vec<Tuple>> {
    let file = fs::File::open(path).with_io_context(|| format!("opening {}", path.display()))?;
    BufReader::new(file)
        .lines()
        .map(|line| {
            line.map(|l| vec![Value::Str(l)])
                .with_io_context(|| format!("reading {}", path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_partitions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out");
        let tap = Tap::new(path.to_string_lossy().to_string());

        let partitions = vec![
            vec![vec![Value::from("a"), Value::Int(1)]],
            vec![vec![Value::from("b"), Value::Null], vec![Value::from("c"), Value::Int(3)]],
        ];
        assert_eq!(tap.write(&partitions).unwrap(), 3);
        assert!(path.join("part-00000").is_file());
        assert!(path.join("part-00001").is_file());

        let read = tap.read().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0], vec![vec![Value::from("a\t1")]]);
        assert_eq!(read[1][0], vec![Value::from("b\t")]);
    }

    #[test]
    fn test_sink_replaces_previous_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out");
        let tap = Tap::new(path.to_string_lossy().to_string());

        tap.write(&[vec![], vec![], vec![]]).unwrap();
        tap.write(&[vec![vec![Value::from("x")]]]).unwrap();
        assert_eq!(part_files(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_hidden_files_skipped() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("part-00000"), ["one"]).unwrap();
        write_file(&dir.path().join("_SUCCESS"), [""]).unwrap();
        write_file(&dir.path().join(".part-00000.crc"), [""]).unwrap();

        let files = part_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_single_file_source() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("words.txt");
        write_file(&file, ["a b", "c"]).unwrap();
        let read = Tap::new(file.to_string_lossy().to_string()).read().unwrap();
        assert_eq!(read, vec![vec![vec![Value::from("a b")], vec![Value::from("c")]]]);
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let err = Tap::new("/definitely/not/here").read().unwrap_err();
        assert!(matches!(err, load_common::LoadError::IoError { .. }));
    }
}
