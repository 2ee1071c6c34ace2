//! Command-line arguments.

use clap::{Parser, builder::styling};
use ddp_validator_harness::OutputFormat;
use std::path::PathBuf;

use crate::productinfo;

const SHORT_DESCRIPTION: &str = "Functional tester for interactive console programs";

const LONG_DESCRIPTION: &str = r"
ddp-validator runs a program through scripted interactive sessions, feeding it input
as if typed at a terminal, and checks what it prints against the expected output.

The suite to run is either given directly with --suite, or chosen from a classifier
file with --classifier by looking for a task identifier in the program's source.
";

/// Parsed command-line arguments.
#[derive(Parser)]
#[clap(name = productinfo::PRODUCT_NAME,
       version = productinfo::PRODUCT_VERSION,
       about = SHORT_DESCRIPTION,
       long_about = LONG_DESCRIPTION,
       styles = help_styles())]
#[allow(clippy::module_name_repetitions)]
pub struct CommandLineArgs {
    /// Program to test, or a directory containing exactly one program.
    #[clap(value_name = "PROGRAM")]
    pub program: PathBuf,

    /// Suite file to run.
    #[clap(
        short = 's',
        long = "suite",
        value_name = "FILE",
        required_unless_present = "classifier",
        conflicts_with = "classifier"
    )]
    pub suite: Option<PathBuf>,

    /// Classifier file used to pick the suite from the program's source.
    #[clap(short = 'c', long = "classifier", value_name = "FILE")]
    pub classifier: Option<PathBuf>,

    /// Record tests whose program fails to run as failed, instead of stopping.
    #[clap(long = "tolerate-errors")]
    pub tolerate_errors: bool,

    /// Output format for test results.
    #[clap(long = "format", default_value = "pretty")]
    pub format: OutputFormat,

    /// Directory receiving difference reports [default: the program's directory].
    #[clap(long = "artifact-dir", value_name = "DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Grace period after starting the program, in milliseconds.
    #[clap(long = "warmup-ms", value_name = "MS")]
    pub warmup_ms: Option<u64>,

    /// Quiet period taken to mean the program waits for input, in milliseconds.
    #[clap(long = "read-timeout-ms", value_name = "MS")]
    pub read_timeout_ms: Option<u64>,

    /// Longest tolerated silence from the program, in milliseconds.
    #[clap(long = "inactivity-ceiling-ms", value_name = "MS")]
    pub inactivity_ceiling_ms: Option<u64>,

    /// Interpreter used for script programs.
    #[clap(long = "python", value_name = "PATH")]
    pub python: Option<PathBuf>,

    /// Runtime used for compiled programs.
    #[clap(long = "java", value_name = "PATH")]
    pub java: Option<PathBuf>,

    /// Path to a configuration file [default: platform config directory].
    #[clap(long = "config", value_name = "FILE", conflicts_with = "no_config")]
    pub config_file: Option<PathBuf>,

    /// Don't load any configuration file.
    #[clap(long = "no-config")]
    pub no_config: bool,

    /// Enable debug logging.
    #[clap(short = 'd', long = "debug")]
    pub debug: bool,
}

fn help_styles() -> clap::builder::Styles {
    styling::Styles::styled()
        .header(
            styling::AnsiColor::Yellow.on_default()
                | styling::Effects::BOLD
                | styling::Effects::UNDERLINE,
        )
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Magenta.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_or_classifier_is_required() {
        assert!(CommandLineArgs::try_parse_from(["ddp-validator", "lab1"]).is_err());
        assert!(
            CommandLineArgs::try_parse_from([
                "ddp-validator",
                "lab1",
                "--suite",
                "a.toml",
                "--classifier",
                "c.json"
            ])
            .is_err()
        );
    }

    #[test]
    fn parses_overrides() -> anyhow::Result<()> {
        let args = CommandLineArgs::try_parse_from([
            "ddp-validator",
            "lab1/main.py",
            "-s",
            "suite.toml",
            "--format",
            "junit",
            "--warmup-ms",
            "500",
            "--python",
            "pypy3",
            "--tolerate-errors",
        ])?;

        assert_eq!(args.program, PathBuf::from("lab1/main.py"));
        assert_eq!(args.suite, Some(PathBuf::from("suite.toml")));
        assert_eq!(args.format, OutputFormat::Junit);
        assert_eq!(args.warmup_ms, Some(500));
        assert_eq!(args.read_timeout_ms, None);
        assert_eq!(args.python, Some(PathBuf::from("pypy3")));
        assert!(args.tolerate_errors);
        assert!(!args.debug);

        Ok(())
    }
}
