//! Suite runner implementation.

use crate::comparison::{self, ComparisonResult, FailureKind};
use crate::config::RunnerConfig;
use crate::driver::{LaunchCommand, TranscriptBuilder};
use crate::error::Error;
use crate::reporting::{Reporter, SuiteResults, TestCaseResult};
use crate::suite::{Language, SuiteConfig, TestRecord};
use std::path::{Path, PathBuf};

/// File name of the Gradle wrapper script.
pub const GRADLE_WRAPPER: &str = if cfg!(windows) { "gradlew.bat" } else { "gradlew" };

/// Placeholder in compile command templates standing for the program path.
const PROGRAM_PLACEHOLDER: &str = "{program}";

/// Runs every test of a suite against one program.
pub struct SuiteRunner {
    suite: SuiteConfig,
    config: RunnerConfig,
}

impl SuiteRunner {
    /// Creates a new runner for the given suite and configuration.
    pub const fn new(suite: SuiteConfig, config: RunnerConfig) -> Self {
        Self { suite, config }
    }

    /// Compiles the program if the suite asks for it, then runs each test in order,
    /// reporting results as they become known. Cleanup runs whatever the outcome.
    ///
    /// Returns the aggregate results if every test could be run; a failing test is
    /// not an error. Returns an error if the run was aborted.
    pub async fn run(&self, reporter: &mut dyn Reporter) -> Result<SuiteResults, Error> {
        let outcome = self.run_tests(reporter).await;

        if let Err(e) = &outcome {
            if let Err(report_err) = reporter.fatal(e) {
                tracing::warn!("failed to report error: {report_err}");
            }
        }

        if let Err(e) = self.cleanup(reporter) {
            tracing::warn!("cleanup failed: {e}");
        }

        reporter.flush()?;

        outcome
    }

    async fn run_tests(&self, reporter: &mut dyn Reporter) -> Result<SuiteResults, Error> {
        self.compile(reporter).await?;

        let command = self.launch_command()?;
        tracing::debug!("launch command: {command}");

        let mut results = SuiteResults::default();
        for test in &self.suite.tests {
            let result = match self.run_test(&command, test).await {
                Ok(result) => result,
                Err(e) => {
                    if let Err(report_err) =
                        reporter.message(&std::format!("Test '{}' could not be run.", test.title))
                    {
                        tracing::warn!("failed to report error: {report_err}");
                    }
                    return Err(e);
                }
            };
            reporter.test_finished(&result)?;
            results.push(result);
        }

        reporter.suite_finished(&results)?;

        Ok(results)
    }

    async fn run_test(
        &self,
        command: &LaunchCommand,
        test: &TestRecord,
    ) -> Result<TestCaseResult, Error> {
        tracing::debug!("running test '{}'", test.title);
        let start_time = std::time::Instant::now();

        let driver = TranscriptBuilder::new(command, self.config.timings)
            .with_only_stdout(self.suite.only_stdout);

        let result = match driver.run(&test.stdin).await {
            Ok(actual) => self.check(test, &actual),
            Err(e) if e.is_run_error() && self.config.tolerate_run_errors => {
                tracing::debug!("tolerating error in test '{}': {e}", test.title);
                ComparisonResult::failed(FailureKind::RunError(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        Ok(TestCaseResult {
            title: test.title.clone(),
            result,
            duration: start_time.elapsed(),
        })
    }

    fn check(&self, test: &TestRecord, actual: &[String]) -> ComparisonResult {
        let expected = test.expected_lines();

        tracing::debug!("program lines: {actual:?}");
        tracing::debug!("expected lines: {expected:?}");

        if !comparison::compare_output(actual, &expected, test.subset) {
            tracing::debug!("output differs from expected");
            let mut result = ComparisonResult::failed(FailureKind::Mismatch);

            if !(test.has_regex || test.subset) {
                match comparison::write_diff_artifact(
                    self.config.artifact_dir(),
                    &test.title,
                    &expected,
                    actual,
                ) {
                    Ok(path) => result.artifact = Some(path),
                    Err(e) => tracing::warn!("failed to write difference for '{}': {e}", test.title),
                }
            }

            return result;
        }

        let Some((expected_file, output_file)) = test.file_check() else {
            return ComparisonResult::passed();
        };

        let dir = self.config.program_dir();
        match comparison::check_output_file(&dir.join(expected_file), &dir.join(output_file)) {
            Ok(true) => ComparisonResult::passed(),
            Ok(false) => ComparisonResult::failed(FailureKind::FileMismatch(None)),
            Err(e) => ComparisonResult::failed(FailureKind::FileMismatch(Some(e.to_string()))),
        }
    }

    /// Returns the compile command line with the program path substituted, if the
    /// suite has a compile step.
    fn compile_command_line(&self) -> Result<Option<String>, Error> {
        let Some(template) = &self.suite.compile_command else {
            return Ok(None);
        };

        let program = std::path::absolute(&self.config.program)?;
        let quoted = std::format!("\"{}\"", program.display());

        Ok(Some(template.replace(PROGRAM_PLACEHOLDER, quoted.as_str())))
    }

    async fn compile(&self, reporter: &mut dyn Reporter) -> Result<(), Error> {
        let Some(command_line) = self.compile_command_line()? else {
            return Ok(());
        };

        reporter.message("Compiling program...")?;
        tracing::debug!("compiling with command: {command_line}");

        let mut cmd = if cfg!(windows) {
            let mut cmd = tokio::process::Command::new("cmd");
            cmd.arg("/C");
            cmd
        } else {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c");
            cmd
        };

        let output = cmd
            .arg(&command_line)
            .current_dir(self.config.program_dir())
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| Error::SpawnError {
                command: command_line.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(Error::CompileError {
                code: output.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        reporter.message("Compiled.")?;
        if !stdout.trim().is_empty() {
            reporter.message("stdout:")?;
            reporter.message(stdout.trim_end())?;
        }

        Ok(())
    }

    /// Builds the command that launches the program under test.
    pub fn launch_command(&self) -> Result<LaunchCommand, Error> {
        let dir = self.config.program_dir();
        let launch = &self.config.launch;

        let command = match self.suite.language {
            Language::Python => {
                let file_name = self.program_component(self.config.program.file_name())?;
                LaunchCommand::new(&launch.python)
                    .arg(file_name)
                    .env("PYTHONUNBUFFERED", "1")
            }
            Language::Java => {
                let class_name = self.program_component(self.config.program.file_stem())?;
                LaunchCommand::new(&launch.java).arg(class_name)
            }
            Language::Gradle => {
                LaunchCommand::new(find_gradle_wrapper(dir)?).args(&self.suite.cmd_args)
            }
        };

        Ok(command.current_dir(dir))
    }

    fn program_component<'a>(
        &'a self,
        component: Option<&'a std::ffi::OsStr>,
    ) -> Result<&'a std::ffi::OsStr, Error> {
        component.ok_or_else(|| Error::SpawnError {
            command: self.config.program.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "program path does not name a file",
            ),
        })
    }

    /// Removes build products left next to the program. Only compiled single-file
    /// programs leave any.
    pub fn cleanup(&self, reporter: &mut dyn Reporter) -> Result<(), Error> {
        if self.suite.language != Language::Java {
            tracing::debug!("no cleanup needed for {} programs", self.suite.language);
            return Ok(());
        }

        reporter.message("Cleaning up...")?;

        let dir = self.config.program_dir();
        tracing::debug!("program directory: {}", dir.display());

        let pattern = std::format!("{}/*.class", glob::Pattern::escape(&dir.to_string_lossy()));
        for entry in glob::glob(&pattern).map_err(std::io::Error::other)? {
            let path = entry.map_err(std::io::Error::from)?;

            tracing::debug!("removing {}", path.display());
            match std::fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => (),
            }
        }

        reporter.message("Done.")?;

        Ok(())
    }
}

/// Searches `dir` and its ancestors for the Gradle wrapper script.
pub fn find_gradle_wrapper(dir: &Path) -> Result<PathBuf, Error> {
    let dir = std::path::absolute(dir)?;

    if let Some(wrapper) = dir
        .ancestors()
        .map(|ancestor| ancestor.join(GRADLE_WRAPPER))
        .find(|candidate| candidate.is_file())
    {
        tracing::debug!("found gradle wrapper: {}", wrapper.display());
        return Ok(wrapper);
    }

    Err(Error::SpawnError {
        command: GRADLE_WRAPPER.to_owned(),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            std::format!("no {GRADLE_WRAPPER} in {} or its parents", dir.display()),
        ),
    })
}
