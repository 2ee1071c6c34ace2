//! Comparison of program transcripts against expected output.

use crate::error::Error;
use crate::util;
use std::path::{Path, PathBuf};

/// Prefix marking an expected line as a pattern rather than literal text.
pub const REGEX_MARKER: &str = "regex|";

/// Why a test failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The transcript did not match the expected output.
    Mismatch,
    /// The transcript matched, but the program's output file did not match the expected file.
    FileMismatch(Option<String>),
    /// The program could not be run to completion; carries the error message.
    RunError(String),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch => write!(f, "output differs"),
            Self::FileMismatch(None) => write!(f, "output file differs"),
            Self::FileMismatch(Some(reason)) => write!(f, "output file differs: {reason}"),
            Self::RunError(message) => write!(f, "error: {message}"),
        }
    }
}

/// Outcome of checking one test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Why the test failed; `None` if it passed.
    pub failure: Option<FailureKind>,
    /// Diff artifact written for this test, if any.
    pub artifact: Option<PathBuf>,
}

impl ComparisonResult {
    /// A passing result.
    pub const fn passed() -> Self {
        Self {
            failure: None,
            artifact: None,
        }
    }

    /// A failing result.
    pub const fn failed(kind: FailureKind) -> Self {
        Self {
            failure: Some(kind),
            artifact: None,
        }
    }

    /// Returns whether this result indicates a failure.
    pub const fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Returns whether any line of `first` also appears in `second`.
fn has_shared_line(first: &[String], second: &[String]) -> bool {
    first.iter().any(|line| second.contains(line))
}

/// Compares program output lines against expected lines.
///
/// In subset mode the comparison passes as soon as one line is shared between the
/// two sides, in either direction. Otherwise the line counts must agree and every
/// line must match: exactly, or, for expected lines starting with [`REGEX_MARKER`],
/// by a pattern anchored at the start of the actual line.
pub fn compare_output(actual: &[String], expected: &[String], subset: bool) -> bool {
    if subset {
        return has_shared_line(actual, expected) || has_shared_line(expected, actual);
    }

    if actual.len() != expected.len() {
        return false;
    }

    actual
        .iter()
        .zip(expected)
        .all(|(actual_line, expected_line)| line_matches(actual_line, expected_line))
}

fn line_matches(actual: &str, expected: &str) -> bool {
    let Some(pattern) = expected.strip_prefix(REGEX_MARKER) else {
        return actual == expected;
    };

    match regex::Regex::new(&std::format!(r"\A(?:{pattern})")) {
        Ok(re) => re.is_match(actual),
        Err(e) => {
            tracing::warn!("invalid pattern in expected output '{pattern}': {e}");
            false
        }
    }
}

/// Compares the contents of the file the program wrote against the expected file,
/// line by line with line terminators included.
pub fn check_output_file(expected_path: &Path, output_path: &Path) -> Result<bool, Error> {
    let expected = util::normalize_file_contents(&std::fs::read_to_string(expected_path)?);
    let output = util::normalize_file_contents(&std::fs::read_to_string(output_path)?);

    tracing::debug!("expected file lines: {expected:?}");
    tracing::debug!("output file lines: {output:?}");

    Ok(expected == output)
}

/// Writes the HTML diff artifact for a failed test into `dir` and returns its path.
pub fn write_diff_artifact(
    dir: &Path,
    title: &str,
    expected: &[String],
    actual: &[String],
) -> Result<PathBuf, Error> {
    let path = dir.join(util::diff_artifact_name(title));
    tracing::debug!("writing HTML difference to {}", path.display());

    std::fs::write(&path, util::render_html_diff(title, expected, actual))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| String::from(*s)).collect()
    }

    #[test]
    fn exact_match_is_reflexive() {
        for sample in [vec![], lines(&["a"]), lines(&["x", "", "regex|\\d+", "y y"])] {
            assert!(compare_output(&sample, &sample, false));
        }
    }

    #[test]
    fn length_mismatch_always_fails() {
        assert!(!compare_output(&lines(&["a"]), &lines(&["a", "a"]), false));
        assert!(!compare_output(&lines(&["a", "b"]), &lines(&["a"]), false));
        assert!(!compare_output(&[], &lines(&["regex|.*"]), false));
    }

    #[test]
    fn any_line_difference_fails() {
        assert!(!compare_output(
            &lines(&["a", "b", "c"]),
            &lines(&["a", "B", "c"]),
            false
        ));
    }

    #[test]
    fn regex_lines_match_from_start() {
        assert!(compare_output(&lines(&["42"]), &lines(&["regex|\\d+"]), false));
        assert!(!compare_output(&lines(&["abc"]), &lines(&["regex|\\d+"]), false));

        // Anchored at the start only.
        assert!(compare_output(&lines(&["42 apples"]), &lines(&["regex|\\d+"]), false));
        assert!(!compare_output(&lines(&["apples 42"]), &lines(&["regex|\\d+"]), false));

        // Alternation stays anchored.
        assert!(!compare_output(&lines(&["xb"]), &lines(&["regex|a|b"]), false));
    }

    #[test]
    fn invalid_regex_is_a_mismatch() {
        assert!(!compare_output(&lines(&["("]), &lines(&["regex|("]), false));
    }

    #[test]
    fn subset_needs_one_shared_line() {
        assert!(compare_output(&lines(&["x", "y"]), &lines(&["y", "z"]), true));
        assert!(!compare_output(&lines(&["x"]), &lines(&["z"]), true));
        assert!(compare_output(&lines(&["only"]), &lines(&["a", "only", "b"]), true));
        assert!(!compare_output(&[], &lines(&["a"]), true));
    }

    #[test]
    fn output_file_check_is_exact() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let expected = dir.path().join("expected.txt");
        let same = dir.path().join("same.txt");
        let no_newline = dir.path().join("no_newline.txt");

        std::fs::write(&expected, "one\ntwo\n")?;
        std::fs::write(&same, "one\ntwo\n")?;
        std::fs::write(&no_newline, "one\ntwo")?;

        assert!(check_output_file(&expected, &same)?);
        assert!(!check_output_file(&expected, &no_newline)?);
        assert!(check_output_file(&expected, &dir.path().join("missing.txt")).is_err());

        Ok(())
    }

    #[test]
    fn diff_artifact_is_named_after_title() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;

        let path = write_diff_artifact(
            dir.path(),
            "case: 1/2",
            &lines(&["expected"]),
            &lines(&["actual"]),
        )?;

        assert_eq!(path, dir.path().join("difference-case 12.html"));
        let html = std::fs::read_to_string(&path)?;
        assert!(html.contains("expected"));
        assert!(html.contains("actual"));

        Ok(())
    }
}
