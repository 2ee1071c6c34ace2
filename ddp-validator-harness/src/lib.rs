//! Test harness for interactive console programs.
//!
//! This crate runs an unmodified program through a scripted interactive session,
//! feeding it input lines as if they were typed at a terminal, and compares the
//! resulting transcript against the expected one.
//!
//! # Matching modes
//!
//! 1. **Exact**: the transcript must have the same lines as the expected output.
//!
//! 2. **Pattern**: like exact, but expected lines starting with `regex|` are patterns
//!    matched against the start of the corresponding transcript line.
//!
//! 3. **Subset**: the test passes if the transcript and the expected output share at
//!    least one line.
//!
//! Exact mismatches leave an HTML side-by-side difference next to the program.

#![cfg(any(unix, windows))]

mod comparison;
mod config;
mod driver;
mod error;
mod reporting;
mod runner;
mod suite;
pub mod util;

pub use comparison::{
    ComparisonResult, FailureKind, REGEX_MARKER, check_output_file, compare_output,
    write_diff_artifact,
};
pub use config::{
    DEFAULT_INACTIVITY_CEILING, DEFAULT_READ_TIMEOUT, DEFAULT_WARMUP, DriverTimings,
    LaunchConfig, OutputFormat, RunnerConfig,
};
pub use driver::{LINE_TERMINATOR, LaunchCommand, TranscriptBuilder};
pub use error::Error;
pub use reporting::{ConsoleReporter, Reporter, SuiteResults, TestCaseResult};
pub use runner::{GRADLE_WRAPPER, SuiteRunner, find_gradle_wrapper};
pub use suite::{Language, SuiteConfig, TestRecord};
