//! Configuration types for the harness.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default delay between spawning the program and sending it anything.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(2);

/// Default length of a single read attempt; a read that times out is taken to mean
/// the program is waiting for input.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default longest silence tolerated from the program before it is declared hung.
pub const DEFAULT_INACTIVITY_CEILING: Duration = Duration::from_secs(5);

/// Timing parameters of the interactive driver.
///
/// The driver has no way to know when the program is ready for input, so it relies
/// on quiet periods. Raising these values makes runs slower but less sensitive to
/// load; lowering them does the opposite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverTimings {
    /// Grace period after spawning, before any input is sent.
    pub warmup: Duration,
    /// Length of one read attempt.
    pub read_timeout: Duration,
    /// Longest tolerated silence from the program's output stream.
    pub inactivity_ceiling: Duration,
}

impl Default for DriverTimings {
    fn default() -> Self {
        Self {
            warmup: DEFAULT_WARMUP,
            read_timeout: DEFAULT_READ_TIMEOUT,
            inactivity_ceiling: DEFAULT_INACTIVITY_CEILING,
        }
    }
}

impl DriverTimings {
    /// Sets the warm-up grace period.
    #[must_use]
    pub const fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Sets the per-attempt read timeout.
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets the inactivity ceiling.
    #[must_use]
    pub const fn with_inactivity_ceiling(mut self, inactivity_ceiling: Duration) -> Self {
        self.inactivity_ceiling = inactivity_ceiling;
        self
    }
}

/// Executables used to launch programs, by language.
#[derive(Clone, Debug)]
pub struct LaunchConfig {
    /// Interpreter for script programs.
    pub python: PathBuf,
    /// Runtime for compiled single-file programs.
    pub java: PathBuf,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        let python = if cfg!(windows) { "python" } else { "python3" };

        Self {
            python: PathBuf::from(python),
            java: PathBuf::from("java"),
        }
    }
}

/// Configuration for the suite runner.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Path to the program under test.
    pub program: PathBuf,
    /// Driver timing parameters.
    pub timings: DriverTimings,
    /// Launch executables.
    pub launch: LaunchConfig,
    /// Whether a test whose program fails to run is recorded as failed instead of
    /// aborting the suite.
    pub tolerate_run_errors: bool,
    /// Directory receiving diff artifacts; defaults to the program's directory.
    pub artifact_dir: Option<PathBuf>,
}

impl RunnerConfig {
    /// Creates a new runner config with default values.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timings: DriverTimings::default(),
            launch: LaunchConfig::default(),
            tolerate_run_errors: false,
            artifact_dir: None,
        }
    }

    /// Sets the driver timings.
    #[must_use]
    pub const fn with_timings(mut self, timings: DriverTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Sets the launch executables.
    #[must_use]
    pub fn with_launch(mut self, launch: LaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    /// Sets whether per-test run errors are tolerated.
    #[must_use]
    pub const fn with_tolerate_run_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_run_errors = tolerate;
        self
    }

    /// Sets the directory receiving diff artifacts.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Returns the directory containing the program; programs run from here.
    pub fn program_dir(&self) -> &Path {
        match self.program.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Returns the directory receiving diff artifacts.
    pub fn artifact_dir(&self) -> &Path {
        self.artifact_dir
            .as_deref()
            .unwrap_or_else(|| self.program_dir())
    }
}

/// Output format for test results.
#[derive(Clone, Copy, Default, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// `JUnit` XML format.
    Junit,
    /// Minimal output.
    Terse,
}
