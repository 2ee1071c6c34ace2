//! Implements the command-line interface.

use crate::args::CommandLineArgs;
use crate::config;
use crate::discovery;
use crate::events;
use crate::productinfo;
use anyhow::Context;
use clap::Parser;
use ddp_validator_harness::{ConsoleReporter, Reporter, RunnerConfig, SuiteConfig, SuiteRunner};
use std::path::{Path, PathBuf};

/// Exit code when every test passed.
const EXIT_SUCCESS: u8 = 0;

/// Exit code when any test failed, the run was aborted, or it was interrupted.
const EXIT_FAILURE: u8 = 1;

/// Main entry point for the `ddp-validator` executable.
pub fn run() {
    //
    // Install panic handler. On release builds, it will capture panic details to a
    // temporary .toml file and report a human-readable message to the screen.
    //
    human_panic::setup_panic!(human_panic::Metadata::new(
        productinfo::PRODUCT_NAME,
        productinfo::PRODUCT_VERSION
    ));

    //
    // Parse args.
    //
    let parsed_args = match CommandLineArgs::try_parse() {
        Ok(parsed_args) => parsed_args,
        Err(e) => {
            let _ = e.print();

            // clap returns errors for `--help`, `--version`, etc.
            let exit_code = match e.kind() {
                clap::error::ErrorKind::DisplayVersion => 0,
                clap::error::ErrorKind::DisplayHelp => 0,
                _ => 1,
            };

            std::process::exit(exit_code);
        }
    };

    //
    // Run. Tests run one at a time, so a single-threaded runtime is enough.
    //
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
        .and_then(|runtime| runtime.block_on(run_async(parsed_args)));

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("error: {err:#}");
            EXIT_FAILURE
        }
    };

    std::process::exit(i32::from(exit_code));
}

/// Runs the selected suite against the selected program. Returns the exit code.
async fn run_async(args: CommandLineArgs) -> anyhow::Result<u8> {
    events::init(args.debug);
    tracing::debug!("{}", productinfo::get_product_display_str());

    // Load configuration.
    let config_result = config::load_config(args.no_config, args.config_file.as_deref());
    if let Some(error) = &config_result.error {
        let path = config_result
            .path
            .as_deref()
            .map_or_else(String::new, |p| p.display().to_string());

        if config_result.explicit_path {
            anyhow::bail!("{path}: {error}");
        }
        tracing::warn!("ignoring configuration file {path}: {error}");
    }
    let config = config_result.config;

    // Resolve the program and its suite.
    let program = discovery::find_program(&args.program)?;
    tracing::debug!("program: {}", program.display());

    let suite_path = resolve_suite_path(&args, &program)?;
    let suite = SuiteConfig::from_file(&suite_path)
        .with_context(|| std::format!("failed to load suite {}", suite_path.display()))?;

    let mut runner_config = RunnerConfig::new(program)
        .with_timings(config.to_timings(&args))
        .with_launch(config.to_launch(&args))
        .with_tolerate_run_errors(args.tolerate_errors);
    if let Some(dir) = &args.artifact_dir {
        runner_config = runner_config.with_artifact_dir(dir);
    }

    let suite_name = suite_path.file_stem().map_or_else(
        || String::from(productinfo::PRODUCT_NAME),
        |s| s.to_string_lossy().into_owned(),
    );
    let mut reporter = ConsoleReporter::stdout(args.format).with_suite_name(suite_name);
    let runner = SuiteRunner::new(suite, runner_config);

    // Run, unless stopped. Dropping the run kills the program under test.
    let mut shutdown = ShutdownSignals::listen().context("failed to install signal handlers")?;
    let outcome = tokio::select! {
        outcome = runner.run(&mut reporter) => Ok(outcome),
        signal = shutdown.recv() => Err(signal),
    };

    let exit_code = match outcome {
        Ok(Ok(results)) if results.success() => EXIT_SUCCESS,
        // Failures and fatal errors were already reported.
        Ok(_) => EXIT_FAILURE,
        Err(signal) => {
            tracing::warn!("{signal}; remaining tests were not run");
            if let Err(e) = runner.cleanup(&mut reporter) {
                tracing::warn!("cleanup failed: {e}");
            }
            reporter.flush()?;
            EXIT_FAILURE
        }
    };

    Ok(exit_code)
}

/// Signals that stop a run. Each one drops the running suite, which kills the
/// program under test before the process exits.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn listen() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Waits for the next stop request and describes it.
    async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => "interrupted",
                _ = self.terminate.recv() => "terminated",
                _ = self.hangup.recv() => "hung up",
            }
        }

        #[cfg(not(unix))]
        {
            match tokio::signal::ctrl_c().await {
                Ok(()) => "interrupted",
                Err(e) => {
                    tracing::warn!("failed to listen for interrupts: {e}");
                    std::future::pending().await
                }
            }
        }
    }
}

/// Returns the suite file to run: the one given on the command line, or the one the
/// classifier file assigns to the program.
fn resolve_suite_path(args: &CommandLineArgs, program: &Path) -> anyhow::Result<PathBuf> {
    if let Some(suite) = &args.suite {
        return Ok(suite.clone());
    }

    let classifier_path = args
        .classifier
        .as_deref()
        .context("either a suite or a classifier file is required")?;

    let classifiers = discovery::load_classifiers(classifier_path)?;
    let classification = discovery::classify_program(program, &classifiers)?;
    tracing::info!("Task: {}", classification.name);

    Ok(classification.path)
}
