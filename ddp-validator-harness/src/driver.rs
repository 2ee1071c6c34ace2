//! Interactive driver: runs one program under test through a scripted session and
//! records what an interactive terminal would have shown.
//!
//! The program gives no signal when it is ready for input, so the driver treats a
//! short quiet period on the output stream as "waiting for input". A session moves
//! through these phases:
//!
//! 1. **Warm-up**: spawn the program and wait a grace period before sending anything.
//! 2. **Pumping**: for each input line, read output until it goes quiet, make sure the
//!    program has not been silent past the inactivity ceiling, then write the line.
//! 3. **Draining**: read whatever the program still writes until both of its output
//!    streams close. Anything on the error stream fails the run.
//! 4. **Done**: terminate the program if it is still alive and split the transcript
//!    into normalized lines.
//!
//! The child is killed on every exit path, including when the driver's future is
//! dropped before completion.

use crate::config::DriverTimings;
use crate::error::Error;
use crate::util;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::time::Instant;

/// Terminator written after each input line.
pub const LINE_TERMINATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

const READ_CHUNK_SIZE: usize = 4096;

/// A fully resolved command used to launch a program.
#[derive(Clone, Debug)]
pub struct LaunchCommand {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments to the executable.
    pub args: Vec<OsString>,
    /// Working directory of the child.
    pub working_dir: PathBuf,
    /// Extra environment variables for the child.
    pub env: Vec<(OsString, OsString)>,
}

impl LaunchCommand {
    /// Creates a command that runs `program` in the current directory.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            working_dir: PathBuf::from("."),
            env: vec![],
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Give the program its own process group so that anything it spawns can be
        // killed along with it.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl std::fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Builds the transcript of one interactive session with a program.
pub struct TranscriptBuilder<'a> {
    command: &'a LaunchCommand,
    timings: DriverTimings,
    only_stdout: bool,
}

impl<'a> TranscriptBuilder<'a> {
    /// Creates a builder for sessions with the given program.
    pub const fn new(command: &'a LaunchCommand, timings: DriverTimings) -> Self {
        Self {
            command,
            timings,
            only_stdout: false,
        }
    }

    /// Sets whether injected input is left out of the transcript.
    #[must_use]
    pub const fn with_only_stdout(mut self, only_stdout: bool) -> Self {
        self.only_stdout = only_stdout;
        self
    }

    /// Runs the program once, feeding it `input`, and returns the normalized lines
    /// of the session.
    pub async fn run(&self, input: &[String]) -> Result<Vec<String>, Error> {
        tracing::debug!("running command: {}", self.command);
        tracing::debug!("stdin: {input:?}");

        let mut session = Session::spawn(self.command)?;
        let result = session.interact(input, &self.timings, self.only_stdout).await;

        if let Err(e) = session.terminate().await {
            tracing::warn!("failed to terminate {}: {e}", self.command);
        }

        result?;

        Ok(session.into_lines())
    }
}

/// What a single wait on the program's output streams observed.
#[derive(Debug, PartialEq, Eq)]
enum Activity {
    Output,
    ErrorOutput,
    Closed,
    Quiet,
}

/// A running program and everything captured from it so far.
struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
    stderr: ChildStderr,
    stdout_open: bool,
    stderr_open: bool,
    transcript: Vec<u8>,
    errors: Vec<u8>,
    last_output: Instant,
}

impl Session {
    fn spawn(command: &LaunchCommand) -> Result<Self, Error> {
        let mut child = command
            .to_command()
            .spawn()
            .map_err(|source| Error::SpawnError {
                command: command.to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;

        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
            stdout_open: true,
            stderr_open: true,
            transcript: vec![],
            errors: vec![],
            last_output: Instant::now(),
        })
    }

    async fn interact(
        &mut self,
        input: &[String],
        timings: &DriverTimings,
        only_stdout: bool,
    ) -> Result<(), Error> {
        tokio::time::sleep(timings.warmup).await;
        self.last_output = Instant::now();

        for line in input {
            self.read_until_quiet(timings.read_timeout).await?;

            let silence = self.last_output.elapsed();
            if self.stdout_open && silence > timings.inactivity_ceiling {
                return Err(self.hang_error(silence));
            }

            tracing::debug!("writing line: {line}");
            if !self.send_line(line, timings.inactivity_ceiling).await? {
                break;
            }

            if !only_stdout {
                self.transcript.extend_from_slice(line.as_bytes());
                self.transcript.push(b'\n');
            }
        }

        self.drain(timings.inactivity_ceiling).await?;

        if !self.errors.is_empty() {
            return Err(Error::ProcessError(
                String::from_utf8_lossy(&self.errors).into_owned(),
            ));
        }

        tracing::debug!("program finished");
        Ok(())
    }

    /// Reads output until a whole `wait` period passes without any, or until both
    /// output streams are closed.
    async fn read_until_quiet(&mut self, wait: std::time::Duration) -> Result<(), Error> {
        loop {
            match self.next_activity(wait).await? {
                Activity::Quiet => return Ok(()),
                Activity::Closed if !self.stdout_open && !self.stderr_open => return Ok(()),
                _ => (),
            }
        }
    }

    /// Reads everything left on both output streams. Any silence longer than
    /// `ceiling` is a hang.
    async fn drain(&mut self, ceiling: std::time::Duration) -> Result<(), Error> {
        while self.stdout_open || self.stderr_open {
            if self.next_activity(ceiling).await? == Activity::Quiet {
                return Err(self.hang_error(ceiling));
            }
        }

        Ok(())
    }

    /// Waits up to `wait` for one chunk from either output stream.
    async fn next_activity(&mut self, wait: std::time::Duration) -> Result<Activity, Error> {
        enum Event {
            Stdout(std::io::Result<usize>),
            Stderr(std::io::Result<usize>),
            Quiet,
        }

        let stdout_open = self.stdout_open;
        let stderr_open = self.stderr_open;
        if !stdout_open && !stderr_open {
            return Ok(Activity::Closed);
        }

        let mut out_buf = [0u8; READ_CHUNK_SIZE];
        let mut err_buf = [0u8; READ_CHUNK_SIZE];

        let event = tokio::select! {
            result = self.stdout.read(&mut out_buf), if stdout_open => Event::Stdout(result),
            result = self.stderr.read(&mut err_buf), if stderr_open => Event::Stderr(result),
            () = tokio::time::sleep(wait) => Event::Quiet,
        };

        let activity = match event {
            Event::Stdout(result) => match result? {
                0 => {
                    self.stdout_open = false;
                    Activity::Closed
                }
                n => {
                    self.transcript.extend_from_slice(&out_buf[..n]);
                    self.last_output = Instant::now();
                    Activity::Output
                }
            },
            Event::Stderr(result) => match result? {
                0 => {
                    self.stderr_open = false;
                    Activity::Closed
                }
                n => {
                    self.errors.extend_from_slice(&err_buf[..n]);
                    Activity::ErrorOutput
                }
            },
            Event::Quiet => Activity::Quiet,
        };

        Ok(activity)
    }

    /// Writes one input line. Returns `false` if the program no longer accepts input.
    async fn send_line(&mut self, line: &str, ceiling: std::time::Duration) -> Result<bool, Error> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(false);
        };

        let mut data = Vec::with_capacity(line.len() + LINE_TERMINATOR.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(LINE_TERMINATOR.as_bytes());

        let write = async {
            stdin.write_all(&data).await?;
            stdin.flush().await
        };

        match tokio::time::timeout(ceiling, write).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("program closed its input; remaining lines are not sent");
                self.stdin = None;
                Ok(false)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(self.hang_error(ceiling)),
        }
    }

    fn hang_error(&self, silence: std::time::Duration) -> Error {
        if self.errors.is_empty() {
            Error::HangTimeout(silence)
        } else {
            Error::ProcessError(String::from_utf8_lossy(&self.errors).into_owned())
        }
    }

    /// Kills the program if it is still running and reaps it. Safe to call any number
    /// of times, and on a program that already exited.
    async fn terminate(&mut self) -> std::io::Result<()> {
        self.stdin = None;

        // Already reaped.
        if self.child.id().is_none() {
            return Ok(());
        }

        self.kill()?;
        self.child.wait().await?;

        Ok(())
    }

    /// Sends a kill signal to the program and to anything it started.
    #[cfg(unix)]
    fn kill(&mut self) -> std::io::Result<()> {
        use nix::{errno::Errno, sys::signal, unistd::Pid};

        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        // The child leads its own process group; its pid stays reserved until it is
        // reaped, so the group id cannot have been recycled.
        let pgid = Pid::from_raw(i32::try_from(pid).map_err(std::io::Error::other)?);
        match signal::killpg(pgid, signal::Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH | Errno::EPERM) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sends a kill signal to the program.
    #[cfg(not(unix))]
    fn kill(&mut self) -> std::io::Result<()> {
        match self.child.start_kill() {
            Err(e) if e.kind() != std::io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }

    fn into_lines(self) -> Vec<String> {
        util::normalize_text(&String::from_utf8_lossy(&self.transcript))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            tracing::warn!("failed to kill program: {e}");
        }
    }
}
