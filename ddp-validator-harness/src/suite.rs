//! Suite definitions and the TOML suite format.

use crate::comparison::REGEX_MARKER;
use crate::error::Error;
use crate::util;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The toolchain used to launch the program under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// A script run directly by an interpreter.
    Python,
    /// A single source file compiled ahead of time and run on a runtime by class name.
    Java,
    /// A project launched through its Gradle wrapper.
    Gradle,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Java => write!(f, "java"),
            Self::Gradle => write!(f, "gradle"),
        }
    }
}

/// A single test case.
#[derive(Clone, Debug)]
pub struct TestRecord {
    /// Title of the test; unique within its suite.
    pub title: String,
    /// Lines to feed to the program, in order.
    pub stdin: Vec<String>,
    /// The expected transcript.
    pub stdout: String,
    /// Whether to use the weak subset comparison.
    pub subset: bool,
    /// Whether any expected line is a pattern.
    pub has_regex: bool,
    /// File whose contents `output_file` must reproduce.
    pub expected_file: Option<PathBuf>,
    /// File the program is expected to write.
    pub output_file: Option<PathBuf>,
}

impl TestRecord {
    /// Creates a test from its raw input and expected output text.
    pub fn new(title: impl Into<String>, input: &str, output: &str) -> Self {
        let input = input.trim();
        let output = output.trim();

        Self {
            title: title.into(),
            stdin: input.lines().map(String::from).collect(),
            stdout: output.to_owned(),
            subset: false,
            has_regex: output.contains(REGEX_MARKER),
            expected_file: None,
            output_file: None,
        }
    }

    /// Selects subset comparison for this test.
    #[must_use]
    pub const fn with_subset(mut self, subset: bool) -> Self {
        self.subset = subset;
        self
    }

    /// Adds a secondary file comparison to this test.
    #[must_use]
    pub fn with_file_check(
        mut self,
        expected_file: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        self.expected_file = Some(expected_file.into());
        self.output_file = Some(output_file.into());
        self
    }

    /// Returns the expected transcript in comparable line form.
    pub fn expected_lines(&self) -> Vec<String> {
        util::normalize_text(&self.stdout)
    }

    /// Returns the expected and output file paths, if a file check is configured.
    pub fn file_check(&self) -> Option<(&Path, &Path)> {
        match (&self.expected_file, &self.output_file) {
            (Some(expected), Some(output)) => Some((expected.as_path(), output.as_path())),
            _ => None,
        }
    }

    fn from_entry(title: String, entry: TestEntry) -> Result<Self, Error> {
        let mut record = Self::new(title, &entry.input, &entry.output).with_subset(entry.subset);

        match (entry.expected_file, entry.output_file) {
            (Some(expected), Some(output)) => record = record.with_file_check(expected, output),
            (None, None) => (),
            _ => {
                return Err(Error::InvalidSuite(std::format!(
                    "test '{}' must set both expected_file and output_file, or neither",
                    record.title
                )));
            }
        }

        Ok(record)
    }
}

/// A test section as it appears in the suite file.
#[derive(Debug, Deserialize)]
struct TestEntry {
    input: String,
    output: String,
    #[serde(default)]
    subset: bool,
    #[serde(default)]
    expected_file: Option<PathBuf>,
    #[serde(default)]
    output_file: Option<PathBuf>,
}

/// A complete suite: settings shared by every test, plus the tests in declared order.
#[derive(Clone, Debug)]
pub struct SuiteConfig {
    /// How the program is launched.
    pub language: Language,
    /// Optional compile command template, with `{program}` standing for the program path.
    pub compile_command: Option<String>,
    /// Extra arguments passed to the build tool.
    pub cmd_args: Vec<String>,
    /// Whether to leave injected input out of the transcript.
    pub only_stdout: bool,
    /// The tests, in declared order.
    pub tests: Vec<TestRecord>,
}

impl SuiteConfig {
    /// Creates an empty suite for the given language.
    pub const fn new(language: Language) -> Self {
        Self {
            language,
            compile_command: None,
            cmd_args: vec![],
            only_stdout: false,
            tests: vec![],
        }
    }

    /// Sets the compile command template.
    #[must_use]
    pub fn with_compile_command(mut self, command: impl Into<String>) -> Self {
        self.compile_command = Some(command.into());
        self
    }

    /// Sets the extra build tool arguments.
    #[must_use]
    pub fn with_cmd_args(mut self, args: Vec<String>) -> Self {
        self.cmd_args = args;
        self
    }

    /// Sets whether injected input is left out of the transcript.
    #[must_use]
    pub const fn with_only_stdout(mut self, only_stdout: bool) -> Self {
        self.only_stdout = only_stdout;
        self
    }

    /// Appends a test, enforcing title uniqueness.
    pub fn add_test(&mut self, test: TestRecord) -> Result<(), Error> {
        let artifact_name = util::diff_artifact_name(&test.title);
        if self
            .tests
            .iter()
            .any(|t| t.title == test.title || util::diff_artifact_name(&t.title) == artifact_name)
        {
            return Err(Error::InvalidSuite(std::format!(
                "test title '{}' is not unique",
                test.title
            )));
        }

        self.tests.push(test);
        Ok(())
    }

    /// Parses a suite from its TOML text.
    ///
    /// Top-level keys `language`, `compile`, `cmd_args` and `only_stdout` hold suite
    /// settings; every other top-level table is a test whose key is its title.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let table: toml::Table = toml::from_str(text)?;

        let mut language = None;
        let mut compile_command = None;
        let mut cmd_args = vec![];
        let mut only_stdout = false;
        let mut entries = vec![];

        for (key, value) in table {
            match key.as_str() {
                "language" => language = Some(value.try_into::<Language>()?),
                "compile" => {
                    let command = value.try_into::<String>()?;
                    if !command.trim().is_empty() {
                        compile_command = Some(command);
                    }
                }
                "cmd_args" => cmd_args = value.try_into::<Vec<String>>()?,
                "only_stdout" => only_stdout = value.try_into::<bool>()?,
                _ if value.is_table() => {
                    entries.push((key, value.try_into::<TestEntry>()?));
                }
                _ => {
                    return Err(Error::InvalidSuite(std::format!(
                        "unexpected top-level key '{key}'"
                    )));
                }
            }
        }

        let language = language
            .ok_or_else(|| Error::InvalidSuite(String::from("missing 'language' setting")))?;

        let mut suite = Self::new(language)
            .with_cmd_args(cmd_args)
            .with_only_stdout(only_stdout);
        suite.compile_command = compile_command;

        for (title, entry) in entries {
            tracing::debug!("loaded test '{title}'");
            suite.add_test(TestRecord::from_entry(title, entry)?)?;
        }

        Ok(suite)
    }

    /// Reads and parses a suite file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        tracing::debug!("reading suite {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
