//! Reporting of test results.

use crate::comparison::{ComparisonResult, FailureKind};
use crate::config::OutputFormat;
use crate::error::Error;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

/// Result of running a single test case.
#[derive(Clone, Debug)]
pub struct TestCaseResult {
    /// Title of the test case.
    pub title: String,
    /// The comparison result.
    pub result: ComparisonResult,
    /// Time taken to run and check the test.
    pub duration: Duration,
}

impl TestCaseResult {
    /// Returns whether the test passed.
    pub const fn passed(&self) -> bool {
        !self.result.is_failure()
    }

    /// Writes the one-line status of this result, followed by any failure details.
    pub fn write_details<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let Some(failure) = &self.result.failure else {
            return writeln!(writer, "{:<20} : {}", self.title, "✔️".green());
        };

        let mark = "❌".red();
        match failure {
            FailureKind::Mismatch => writeln!(writer, "{:<20} : {mark}", self.title)?,
            FailureKind::FileMismatch(reason) => {
                writeln!(writer, "{:<20} : {mark} (Output file)", self.title)?;
                if let Some(reason) = reason {
                    writeln!(writer, "{}", indent::indent_all_by(4, reason.as_str()))?;
                }
            }
            FailureKind::RunError(message) => {
                writeln!(writer, "{:<20} : {mark} ({})", self.title, "Error".bright_red())?;
                writeln!(writer, "{}", indent::indent_all_by(4, message.trim_end()))?;
            }
        }

        if let Some(artifact) = &self.result.artifact {
            writeln!(writer, "    difference written to {}", artifact.display().to_string().cyan())?;
        }

        Ok(())
    }
}

/// Aggregate results of a suite run.
#[derive(Clone, Debug, Default)]
pub struct SuiteResults {
    /// Individual results, in the order the tests ran.
    pub results: Vec<TestCaseResult>,
    /// Number of passing tests.
    pub passed: usize,
    /// Number of failing tests.
    pub failed: usize,
}

impl SuiteResults {
    /// Records one test result.
    pub fn push(&mut self, result: TestCaseResult) {
        if result.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Returns whether every test passed.
    pub const fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Sink receiving progress and results of a suite run. Created once per run and
/// flushed when the run ends.
pub trait Reporter {
    /// Reports a status message (compile progress, compiler output, cleanup).
    fn message(&mut self, text: &str) -> Result<(), Error>;

    /// Reports the result of one test, as soon as it is known.
    fn test_finished(&mut self, result: &TestCaseResult) -> Result<(), Error>;

    /// Reports an error that ends the run.
    fn fatal(&mut self, error: &Error) -> Result<(), Error>;

    /// Reports the aggregate outcome of a completed run.
    fn suite_finished(&mut self, results: &SuiteResults) -> Result<(), Error>;

    /// Flushes anything buffered.
    fn flush(&mut self) -> Result<(), Error>;
}

/// Reporter writing to a console stream in one of the supported output formats.
pub struct ConsoleReporter<W: Write> {
    format: OutputFormat,
    writer: W,
    suite_name: String,
    junit_cases: Vec<junit_report::TestCase>,
}

impl ConsoleReporter<std::io::Stdout> {
    /// Creates a reporter writing to standard output.
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Creates a reporter writing to `writer`.
    pub fn new(format: OutputFormat, writer: W) -> Self {
        Self {
            format,
            writer,
            suite_name: String::from("ddp-validator"),
            junit_cases: vec![],
        }
    }

    /// Sets the suite name used in `JUnit` output.
    #[must_use]
    pub fn with_suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Consumes the reporter, returning its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn junit_case(result: &TestCaseResult) -> Result<junit_report::TestCase, Error> {
        let duration: junit_report::Duration = result.duration.try_into().unwrap_or_default();

        let mut test_case = match &result.result.failure {
            None => junit_report::TestCase::success(&result.title, duration),
            Some(failure) => {
                let kind = match failure {
                    FailureKind::Mismatch => "mismatch",
                    FailureKind::FileMismatch(_) => "file mismatch",
                    FailureKind::RunError(_) => "run error",
                };
                junit_report::TestCase::failure(
                    &result.title,
                    duration,
                    kind,
                    failure.to_string().as_str(),
                )
            }
        };

        let mut output_buf: Vec<u8> = vec![];
        result.write_details(&mut output_buf)?;

        let output_as_string = String::from_utf8_lossy(&output_buf);
        test_case.set_system_out(strip_ansi_escapes::strip_str(output_as_string).as_str());

        Ok(test_case)
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn message(&mut self, text: &str) -> Result<(), Error> {
        match self.format {
            OutputFormat::Pretty => writeln!(self.writer, "{text}")?,
            OutputFormat::Junit | OutputFormat::Terse => tracing::info!("{text}"),
        }
        Ok(())
    }

    fn test_finished(&mut self, result: &TestCaseResult) -> Result<(), Error> {
        match self.format {
            OutputFormat::Pretty => result.write_details(&mut self.writer)?,
            OutputFormat::Terse => {
                if !result.passed() {
                    writeln!(self.writer, "FAILED: {}", result.title)?;
                }
            }
            OutputFormat::Junit => {
                let test_case = Self::junit_case(result)?;
                self.junit_cases.push(test_case);
            }
        }
        Ok(())
    }

    fn fatal(&mut self, error: &Error) -> Result<(), Error> {
        match self.format {
            OutputFormat::Pretty | OutputFormat::Terse => {
                writeln!(self.writer, "{}", "error:".bright_red().bold())?;
                writeln!(self.writer, "{}", indent::indent_all_by(4, error.to_string().trim_end()))?;
            }
            OutputFormat::Junit => tracing::error!("{error}"),
        }
        Ok(())
    }

    fn suite_finished(&mut self, results: &SuiteResults) -> Result<(), Error> {
        match self.format {
            OutputFormat::Pretty => {
                let formatted_failed = if results.failed > 0 {
                    results.failed.to_string().red()
                } else {
                    results.failed.to_string().green()
                };

                writeln!(
                    self.writer,
                    "{} test(s) ran: {} passed, {} failed.",
                    results.results.len(),
                    results.passed.to_string().green(),
                    formatted_failed,
                )?;
                if results.success() {
                    writeln!(self.writer, "{}", "All checks passed!".green())?;
                } else {
                    writeln!(self.writer, "{}", "Some checks have failed :(".red())?;
                }
            }
            OutputFormat::Terse => {
                writeln!(self.writer, "{}/{} passed", results.passed, results.results.len())?;
            }
            OutputFormat::Junit => (),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        if matches!(self.format, OutputFormat::Junit) {
            let mut suite = junit_report::TestSuite::new(self.suite_name.as_str());
            suite.add_testcases(std::mem::take(&mut self.junit_cases));

            let mut report = junit_report::Report::new();
            report.add_testsuite(suite);
            report
                .write_xml(&mut self.writer)
                .map_err(|e| Error::ReportError(e.to_string()))?;
            writeln!(self.writer)?;
        }

        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(title: &str, failure: Option<FailureKind>) -> TestCaseResult {
        TestCaseResult {
            title: title.to_owned(),
            result: ComparisonResult {
                failure,
                artifact: None,
            },
            duration: Duration::from_millis(10),
        }
    }

    fn plain(reporter: ConsoleReporter<Vec<u8>>) -> String {
        strip_ansi_escapes::strip_str(String::from_utf8_lossy(&reporter.into_inner()))
    }

    #[test]
    fn counts_results() {
        let mut results = SuiteResults::default();
        assert!(results.success());

        results.push(result("a", None));
        results.push(result("b", Some(FailureKind::Mismatch)));

        assert_eq!(results.passed, 1);
        assert_eq!(results.failed, 1);
        assert!(!results.success());
    }

    #[test]
    fn pretty_output_lists_each_test() -> anyhow::Result<()> {
        let mut reporter = ConsoleReporter::new(OutputFormat::Pretty, vec![]);
        let mut failed = result("second", Some(FailureKind::Mismatch));
        failed.result.artifact = Some(PathBuf::from("difference-second.html"));

        reporter.test_finished(&result("first", None))?;
        reporter.test_finished(&failed)?;
        reporter.test_finished(&result(
            "third",
            Some(FailureKind::RunError(String::from("boom"))),
        ))?;
        reporter.flush()?;

        let output = plain(reporter);
        assert!(output.contains(&std::format!("{:<20} : ✔️", "first")));
        assert!(output.contains(&std::format!("{:<20} : ❌", "second")));
        assert!(output.contains("difference-second.html"));
        assert!(output.contains("(Error)"));
        assert!(output.contains("    boom"));

        Ok(())
    }

    #[test]
    fn pretty_summary_reflects_outcome() -> anyhow::Result<()> {
        let mut results = SuiteResults::default();
        results.push(result("a", None));

        let mut reporter = ConsoleReporter::new(OutputFormat::Pretty, vec![]);
        reporter.suite_finished(&results)?;
        assert!(plain(reporter).contains("All checks passed!"));

        results.push(result("b", Some(FailureKind::FileMismatch(None))));

        let mut reporter = ConsoleReporter::new(OutputFormat::Pretty, vec![]);
        reporter.suite_finished(&results)?;
        assert!(plain(reporter).contains("Some checks have failed"));

        Ok(())
    }

    #[test]
    fn junit_output_is_written_on_flush() -> anyhow::Result<()> {
        let mut reporter =
            ConsoleReporter::new(OutputFormat::Junit, vec![]).with_suite_name("lab1");

        reporter.message("Compiling program...")?;
        reporter.test_finished(&result("ok-case", None))?;
        reporter.test_finished(&result("bad-case", Some(FailureKind::Mismatch)))?;
        assert!(reporter.writer.is_empty());

        reporter.flush()?;

        let output = plain(reporter);
        assert!(output.contains("<testsuite"));
        assert!(output.contains("lab1"));
        assert!(output.contains("ok-case"));
        assert!(output.contains("bad-case"));
        assert!(output.contains("<failure"));
        assert!(!output.contains("Compiling program..."));

        Ok(())
    }

    #[test]
    fn terse_output_names_failures_only() -> anyhow::Result<()> {
        let mut reporter = ConsoleReporter::new(OutputFormat::Terse, vec![]);
        reporter.test_finished(&result("good", None))?;
        reporter.test_finished(&result("bad", Some(FailureKind::Mismatch)))?;

        let output = plain(reporter);
        assert!(!output.contains("good"));
        assert!(output.contains("FAILED: bad"));

        Ok(())
    }
}
