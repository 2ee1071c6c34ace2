//! Error types for the harness.

/// Monolithic error type for the harness.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A child process (program under test, build tool, or compiler shell) could not be started.
    #[error("failed to start {command}: {source}")]
    SpawnError {
        /// Display form of the command that failed to start.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compile step exited with a non-zero status.
    #[error("compilation failed with exit code {}:\n{stderr}", .code.map_or_else(|| String::from("(none)"), |c| c.to_string()))]
    CompileError {
        /// Exit code of the compile command, if it exited normally.
        code: Option<i32>,
        /// Captured standard output of the compile command.
        stdout: String,
        /// Captured standard error of the compile command.
        stderr: String,
    },

    /// The program under test wrote to its error stream.
    #[error("program errored:\n{0}")]
    ProcessError(String),

    /// The program under test went silent for longer than the inactivity ceiling.
    #[error("program produced no output for {0:?}; it appears to be hung")]
    HangTimeout(std::time::Duration),

    /// The suite specification is structurally invalid.
    #[error("invalid suite: {0}")]
    InvalidSuite(String),

    /// The suite specification could not be parsed as TOML.
    #[error("failed to parse suite: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Results could not be written to the reporting sink.
    #[error("failed to report results: {0}")]
    ReportError(String),

    /// An I/O error occurred.
    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Returns whether this error comes from running one test's program, as opposed to
    /// a problem with the suite as a whole. Only these may be tolerated per test.
    pub const fn is_run_error(&self) -> bool {
        matches!(
            self,
            Self::SpawnError { .. }
                | Self::ProcessError(_)
                | Self::HangTimeout(_)
        )
    }
}
