//! External command execution behind a fakeable runner abstraction.
//!
//! Local collaborators (`df`, `findmnt`, `resize2fs`) are invoked through
//! [`CommandRunner`] so the space inspector and filesystem grower can be
//! driven by scripted outputs in tests.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use shell_escape::unix::escape;
use thiserror::Error;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Human readable representation of the exit status.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Errors raised while starting or supervising an external command.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// Raised when a command cannot be spawned, usually because the binary
    /// is not installed.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the process started but its pipes or exit status could
    /// not be collected.
    #[error("failed to collect output from {program}: {message}")]
    Io {
        /// Command being supervised.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError>;

    /// Runs `program` and hands every output line to `on_line` as it is
    /// produced. The full output is still captured and returned.
    ///
    /// The default implementation replays captured stdout then stderr once
    /// the command has finished.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command cannot be started or
    /// supervised.
    fn run_streaming(
        &self,
        program: &str,
        args: &[OsString],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, CommandError> {
        let output = self.run(program, args)?;
        for line in output.stdout.lines().chain(output.stderr.lines()) {
            on_line(line);
        }
        Ok(output)
    }
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

#[derive(Clone, Copy, Debug)]
enum Stream {
    Stdout,
    Stderr,
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        let output = Command::new(program).args(args).output().map_err(|err| CommandError::Spawn {
            program: program.to_owned(),
            message: err.to_string(),
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_streaming(
        &self,
        program: &str,
        args: &[OsString],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, CommandError> {
        let io_error = |message: String| CommandError::Io {
            program: program.to_owned(),
            message,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| CommandError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        let child_stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(String::from("stdout pipe unavailable")))?;
        let child_stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(String::from("stderr pipe unavailable")))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            let stdout_tx = tx.clone();
            scope.spawn(move || forward_lines(child_stdout, Stream::Stdout, &stdout_tx));
            scope.spawn(move || forward_lines(child_stderr, Stream::Stderr, &tx));

            for (stream, line) in rx {
                on_line(&line);
                let buffer = match stream {
                    Stream::Stdout => &mut stdout,
                    Stream::Stderr => &mut stderr,
                };
                buffer.push_str(&line);
                buffer.push('\n');
            }
        });

        let status = child.wait().map_err(|err| io_error(err.to_string()))?;
        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

fn forward_lines(reader: impl Read, stream: Stream, tx: &mpsc::Sender<(Stream, String)>) {
    for line in BufReader::new(reader).lines().map_while(Result::ok) {
        if tx.send((stream, line)).is_err() {
            break;
        }
    }
}

/// Renders a program and its arguments as a shell-escaped command line for
/// log output.
#[must_use]
pub fn render_command_line(program: &str, args: &[OsString]) -> String {
    let mut rendered = escape(program.into()).into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&escape(arg.to_string_lossy()));
    }
    rendered
}
