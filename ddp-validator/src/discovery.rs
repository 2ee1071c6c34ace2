//! Locating the program under test and the suite that applies to it.

use std::path::{Path, PathBuf};

/// Extensions of source files recognized as programs.
pub const PROGRAM_EXTENSIONS: &[&str] = &["py", "java"];

/// Errors raised while locating the program or its suite.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The directory holds no recognized program.
    #[error("no program found in {}", .0.display())]
    NoProgram(PathBuf),

    /// The directory holds more than one candidate program.
    #[error("multiple programs found in {}; pass one of them instead:\n{candidates}", .dir.display())]
    AmbiguousProgram {
        /// The directory searched.
        dir: PathBuf,
        /// The candidates, one per line.
        candidates: String,
    },

    /// The classifier file is not valid.
    #[error("invalid classifier file {}: {source}", .path.display())]
    InvalidClassifier {
        /// The classifier file.
        path: PathBuf,
        /// The parse error.
        source: serde_json::Error,
    },

    /// No classifier entry matched the program.
    #[error("cannot decide which task {} is", .0.display())]
    Unclassified(PathBuf),
}

/// One entry of a classifier file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct Classification {
    /// Display name of the task.
    pub name: String,
    /// Text whose presence in a program's source identifies the task.
    pub identifier: String,
    /// Suite file for the task.
    pub path: PathBuf,
}

/// Resolves the program to test. A file is taken as is; a directory must contain
/// exactly one file with a recognized extension.
pub fn find_program(path: &Path) -> Result<PathBuf, DiscoveryError> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let io_error = |source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut candidates = vec![];
    for entry in std::fs::read_dir(path).map_err(io_error)? {
        let candidate = entry.map_err(io_error)?.path();
        let recognized = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PROGRAM_EXTENSIONS.contains(&ext));

        if recognized && candidate.is_file() {
            candidates.push(candidate);
        }
    }

    candidates.sort();

    match candidates.len() {
        0 => Err(DiscoveryError::NoProgram(path.to_path_buf())),
        1 => Ok(candidates.remove(0)),
        _ => Err(DiscoveryError::AmbiguousProgram {
            dir: path.to_path_buf(),
            candidates: candidates
                .iter()
                .map(|c| std::format!("  {}", c.display()))
                .collect::<Vec<_>>()
                .join("\n"),
        }),
    }
}

/// Reads a classifier file. Suite paths are resolved against the classifier file's
/// directory.
pub fn load_classifiers(path: &Path) -> Result<Vec<Classification>, DiscoveryError> {
    let content = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut classifiers: Vec<Classification> =
        serde_json::from_str(&content).map_err(|source| DiscoveryError::InvalidClassifier {
            path: path.to_path_buf(),
            source,
        })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    for classifier in &mut classifiers {
        classifier.path = base_dir.join(&classifier.path);
    }

    Ok(classifiers)
}

/// Returns the first classifier whose identifier occurs in `source`.
pub fn classify<'a>(source: &str, classifiers: &'a [Classification]) -> Option<&'a Classification> {
    classifiers.iter().find(|c| source.contains(&c.identifier))
}

/// Picks the classifier matching the program at `program`.
pub fn classify_program(
    program: &Path,
    classifiers: &[Classification],
) -> Result<Classification, DiscoveryError> {
    let source = std::fs::read_to_string(program).map_err(|source| DiscoveryError::Io {
        path: program.to_path_buf(),
        source,
    })?;

    classify(&source, classifiers)
        .cloned()
        .ok_or_else(|| DiscoveryError::Unclassified(program.to_path_buf()))
}
