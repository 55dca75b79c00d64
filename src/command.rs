//! External tool invocation with watchdog timeout and diagnostics capture.
//!
//! [`MagickCommand`] builds one argv-style invocation of a Magick tool
//! (program, sub-command, ordered arguments, optional working directory)
//! and runs it to completion or watchdog expiry. No shell is involved:
//! arguments are passed as discrete strings, so nothing gets re-tokenized
//! or glob-expanded.
//!
//! Standard error is always drained into an in-memory buffer. On any
//! failure (non-zero exit, launch error, watchdog kill) the buffer is
//! folded into [`ExecuteError::ExecutionFailed`] together with the fully
//! rendered command line, in the fixed format operators grep logs for:
//!
//! ```text
//! <trimmed stderr> <command line>. <cause>
//! ```
//!
//! A command is built once and consumed by [`MagickCommand::execute`];
//! there is no instance reuse across invocations.

use crate::dimension::DimensionError;
use log::debug;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default watchdog timeout, matching the tools' expected sub-second runs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Interval at which the watchdog polls for process exit.
const WATCHDOG_POLL: Duration = Duration::from_millis(10);

/// Initial capacity of the stderr capture buffer; grows unbounded.
const STDERR_CAPACITY: usize = 512;

#[derive(Error, Debug)]
pub enum ExecuteError {
    /// Immediate caller error, never retriable: a blank command argument
    /// or a missing resize dimension.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Tool output that should have been a `WxH` dimension was not.
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    /// The external process exited non-zero, failed to launch, or was
    /// terminated by the watchdog. `message` carries the captured stderr
    /// and the rendered command line.
    #[error("{message}")]
    ExecutionFailed {
        message: String,
        exit_code: Option<i32>,
        #[source]
        cause: Option<io::Error>,
    },

    /// Local IO failure around the invocation (e.g. writing captured
    /// stdout into the caller's sink).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A pipe-drain thread died while the process was being waited on.
    /// The invocation ends without a result and is not retried.
    #[error("interrupted while waiting for the process to exit")]
    Interrupted,
}

/// How a tool family maps the sub-command onto the OS command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCommandStyle {
    /// One multi-tool binary; the sub-command is the first argument
    /// (`gm convert ...`).
    Argument,
    /// One binary per sub-command; the sub-command doubles as the program
    /// name when no executable was resolved (`convert ...`).
    Executable,
}

/// A single, one-shot invocation of an external Magick tool.
#[derive(Debug)]
pub struct MagickCommand {
    executable: String,
    sub_command: String,
    style: SubCommandStyle,
    working_directory: Option<PathBuf>,
    arguments: Vec<String>,
    timeout: Option<Duration>,
}

impl MagickCommand {
    /// Creates a command for `executable` running `sub_command`.
    ///
    /// With [`SubCommandStyle::Executable`], a blank `executable` falls
    /// back to the sub-command name itself, resolved via `PATH` at launch.
    pub fn new(
        executable: impl Into<String>,
        sub_command: impl Into<String>,
        style: SubCommandStyle,
    ) -> Self {
        Self {
            executable: executable.into(),
            sub_command: sub_command.into(),
            style,
            working_directory: None,
            arguments: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn sub_command(&self) -> &str {
        &self.sub_command
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn set_working_directory(&mut self, dir: impl Into<PathBuf>) {
        self.working_directory = Some(dir.into());
    }

    /// Bounds wall-clock execution time. `None` disables the watchdog and
    /// defers to the OS for process lifetime.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Appends a command line argument. Blank arguments are rejected:
    /// they are always a bug in the caller, not a valid tool flag.
    pub fn add_argument(&mut self, argument: impl Into<String>) -> Result<(), ExecuteError> {
        let argument = argument.into();

        if argument.trim().is_empty() {
            return Err(ExecuteError::InvalidArgument("blank argument".into()));
        }

        self.arguments.push(argument);
        Ok(())
    }

    /// The program actually launched, after sub-command-style resolution.
    fn program(&self) -> &str {
        if self.executable.trim().is_empty() {
            // Executable style only; Argument-style callers always resolve
            // a concrete program name first.
            &self.sub_command
        } else {
            &self.executable
        }
    }

    fn argv(&self) -> Vec<&str> {
        let mut argv = Vec::with_capacity(self.arguments.len() + 1);

        if self.style == SubCommandStyle::Argument {
            argv.push(self.sub_command.as_str());
        }
        argv.extend(self.arguments.iter().map(String::as_str));

        argv
    }

    /// The full command line as launched, for diagnostics.
    pub fn rendered(&self) -> String {
        let mut line = String::with_capacity(128);
        line.push_str(self.program());

        for arg in self.argv() {
            line.push(' ');
            line.push_str(arg);
        }

        line
    }

    /// Runs the command to completion or watchdog expiry.
    ///
    /// If `stdout_sink` is given, the process's standard output is
    /// captured and written there after a successful exit; otherwise
    /// stdout is inherited. Standard error is always captured for
    /// diagnostics.
    ///
    /// Returns `Ok(())` only for exit code 0 within the time limit.
    pub fn execute(self, stdout_sink: Option<&mut dyn Write>) -> Result<(), ExecuteError> {
        let rendered = self.rendered();

        let mut command = Command::new(self.program());
        command.args(self.argv());

        if let Some(dir) = &self.working_directory {
            command.current_dir(dir);
        }

        command.stdin(Stdio::null()).stderr(Stdio::piped());
        command.stdout(if stdout_sink.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });

        debug!("executing: {rendered}");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return Err(failure(&[], &rendered, None, e)),
        };

        // Drain both pipes on their own threads so a full pipe can never
        // block the child while the watchdog waits on it.
        let stderr_thread = child.stderr.take().map(|p| drain(p, STDERR_CAPACITY));
        let stdout_thread = child.stdout.take().map(|p| drain(p, 8192));

        let wait_result = wait_with_watchdog(&mut child, self.timeout);

        let stderr = join_drained(stderr_thread)?;
        let stdout = join_drained(stdout_thread)?;

        let (status, timed_out) = match wait_result {
            Ok(outcome) => outcome,
            Err(e) => return Err(failure(&stderr, &rendered, None, e)),
        };

        if timed_out {
            // The killed process still owns its exit code; report it
            // together with whatever stderr it managed to produce.
            let limit = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
            let cause = io::Error::new(
                io::ErrorKind::TimedOut,
                format!("watchdog terminated the process after {} ms", limit.as_millis()),
            );
            return Err(failure(&stderr, &rendered, status.code(), cause));
        }

        if !status.success() {
            let cause = io::Error::other(format!("process exited with an error ({status})"));
            return Err(failure(&stderr, &rendered, status.code(), cause));
        }

        if let Some(sink) = stdout_sink {
            sink.write_all(&stdout)?;
        }

        Ok(())
    }
}

/// Waits for exit, killing the child once the deadline passes.
///
/// Returns the exit status and whether the watchdog fired. `None` timeout
/// means wait indefinitely.
fn wait_with_watchdog(
    child: &mut Child,
    timeout: Option<Duration>,
) -> io::Result<(ExitStatus, bool)> {
    let Some(limit) = timeout else {
        return child.wait().map(|status| (status, false));
    };

    let deadline = Instant::now() + limit;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }

        if Instant::now() >= deadline {
            // The child may win the race and exit between try_wait and
            // kill; reaping below yields the real status either way.
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }

        thread::sleep(WATCHDOG_POLL);
    }
}

fn drain(mut pipe: impl Read + Send + 'static, capacity: usize) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::with_capacity(capacity);
        // A broken pipe after a watchdog kill still yields what was read.
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_drained(handle: Option<JoinHandle<Vec<u8>>>) -> Result<Vec<u8>, ExecuteError> {
    match handle {
        Some(handle) => handle.join().map_err(|_| ExecuteError::Interrupted),
        None => Ok(Vec::new()),
    }
}

/// Builds the `ExecutionFailed` error with the fixed diagnostic format:
/// trimmed stderr, a space, the rendered command line, `". "`, the cause.
fn failure(stderr: &[u8], rendered: &str, exit_code: Option<i32>, cause: io::Error) -> ExecuteError {
    let mut message = String::with_capacity(256);
    message.push_str(String::from_utf8_lossy(stderr).trim());
    message.push(' ');
    message.push_str(rendered);
    message.push_str(". ");
    message.push_str(&cause.to_string());

    ExecuteError::ExecutionFailed {
        message,
        exit_code,
        cause: Some(cause),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(program: &str) -> MagickCommand {
        MagickCommand::new(program, "convert", SubCommandStyle::Argument)
    }

    #[test]
    fn rejects_blank_arguments() {
        let mut cmd = command("gm");
        assert!(matches!(
            cmd.add_argument(""),
            Err(ExecuteError::InvalidArgument(_))
        ));
        assert!(matches!(
            cmd.add_argument("   "),
            Err(ExecuteError::InvalidArgument(_))
        ));
        assert!(cmd.add_argument("-resize").is_ok());
        assert_eq!(cmd.arguments(), ["-resize"]);
    }

    #[test]
    fn argument_style_prepends_sub_command() {
        let mut cmd = command("gm");
        cmd.add_argument("a.jpg").unwrap();
        assert_eq!(cmd.rendered(), "gm convert a.jpg");
    }

    #[test]
    fn executable_style_omits_sub_command_from_argv() {
        let mut cmd = MagickCommand::new("/opt/im/convert", "convert", SubCommandStyle::Executable);
        cmd.add_argument("a.jpg").unwrap();
        assert_eq!(cmd.rendered(), "/opt/im/convert a.jpg");
    }

    #[test]
    fn executable_style_blank_executable_falls_back_to_sub_command() {
        let cmd = MagickCommand::new("", "identify", SubCommandStyle::Executable);
        assert_eq!(cmd.rendered(), "identify");
    }

    #[test]
    fn nonexistent_program_fails_with_rendered_command_line() {
        let mut cmd = MagickCommand::new(
            "/no/such/tool-83aa01",
            "convert",
            SubCommandStyle::Argument,
        );
        cmd.add_argument("a.jpg").unwrap();

        match cmd.execute(None) {
            Err(ExecuteError::ExecutionFailed {
                message,
                exit_code,
                cause,
            }) => {
                // Empty stderr still leads the message per the fixed format.
                assert!(message.starts_with(" /no/such/tool-83aa01 convert a.jpg. "));
                assert_eq!(exit_code, None);
                assert!(cause.is_some());
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn successful_command_writes_stdout_to_sink() {
        // `true` as a stand-in external tool: exit 0, no output.
        let cmd = MagickCommand::new("true", "true", SubCommandStyle::Executable);
        let mut sink = Vec::new();
        cmd.execute(Some(&mut sink)).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn nonzero_exit_carries_exit_code() {
        let cmd = MagickCommand::new("false", "false", SubCommandStyle::Executable);
        match cmd.execute(None) {
            Err(ExecuteError::ExecutionFailed { exit_code, .. }) => {
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn watchdog_kills_slow_process() {
        let mut cmd = MagickCommand::new("sleep", "sleep", SubCommandStyle::Executable);
        cmd.add_argument("5").unwrap();
        cmd.set_timeout(Some(Duration::from_millis(50)));

        let started = Instant::now();
        match cmd.execute(None) {
            Err(ExecuteError::ExecutionFailed { message, .. }) => {
                assert!(message.contains("watchdog terminated the process"));
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn disabled_watchdog_waits_for_exit() {
        let mut cmd = MagickCommand::new("sleep", "sleep", SubCommandStyle::Executable);
        cmd.add_argument("0.05").unwrap();
        cmd.set_timeout(None);
        cmd.execute(None).unwrap();
    }
}
