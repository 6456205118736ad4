//! Free-space inspection for the local device or mountpoint.
//!
//! The watched path must itself be a mountpoint or a mounted block device;
//! `findmnt` confirms this before anything is measured, so a directory whose
//! volume failed to mount is never mistaken for the volume. Readings come
//! from `df` on the mountpoint in KiB and are floored to whole GiB.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::command::{CommandError, CommandRunner, render_command_line};

/// Default `df` binary.
pub const DEFAULT_DF_BIN: &str = "df";

/// Default `findmnt` binary.
pub const DEFAULT_FINDMNT_BIN: &str = "findmnt";

const KIB_PER_GIB: u64 = 1024 * 1024;
const DEVICE_PREFIX: &str = "/dev/";
/// `findmnt` exit status when no filesystem matches the selector.
const FINDMNT_NO_MATCH: i32 = 1;

/// Capability for reading free space and resolving backing devices.
pub trait FreeSpaceProvider {
    /// Returns available space at `path` in whole gigabytes, rounded down.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::NotMounted`] when `path` is neither a mountpoint
    /// nor a mounted device, and other [`SpaceError`] variants when the query
    /// tools fail.
    fn free_space_gb(&self, path: &Utf8Path) -> Result<u64, SpaceError>;

    /// Resolves `path` to the block device mounted there. Paths under `/dev/`
    /// are returned unchanged once they are confirmed to be mounted.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::NotMounted`] when `path` is not a mountpoint or
    /// a mounted device.
    fn resolve_device(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SpaceError>;
}

/// Errors raised while inspecting local filesystems.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpaceError {
    /// Raised when the query tool cannot be started.
    #[error("free-space query tool unavailable: {0}")]
    Unavailable(#[from] CommandError),
    /// Raised when the query tool exits with a non-zero status.
    #[error("{program} failed for {path} (status {status_text}): {stderr}")]
    QueryFailed {
        /// Tool that failed.
        program: String,
        /// Path being inspected.
        path: Utf8PathBuf,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the tool.
        stderr: String,
    },
    /// Raised when the tool output cannot be interpreted.
    #[error("unexpected {program} output for {path}: {output:?}")]
    UnexpectedOutput {
        /// Tool whose output was rejected.
        program: String,
        /// Path being inspected.
        path: Utf8PathBuf,
        /// Raw stdout.
        output: String,
    },
    /// Raised when the path is neither a mountpoint nor a mounted device.
    #[error("{path} is not a mounted filesystem")]
    NotMounted {
        /// Path being inspected.
        path: Utf8PathBuf,
    },
}

/// Space inspector backed by `df` and `findmnt`.
#[derive(Clone, Debug)]
pub struct DfSpaceInspector<R: CommandRunner> {
    runner: R,
    df_bin: String,
    findmnt_bin: String,
}

impl<R: CommandRunner> DfSpaceInspector<R> {
    /// Creates an inspector using the given runner and tool binaries.
    #[must_use]
    pub fn new(runner: R, df_bin: impl Into<String>, findmnt_bin: impl Into<String>) -> Self {
        Self {
            runner,
            df_bin: df_bin.into(),
            findmnt_bin: findmnt_bin.into(),
        }
    }

    fn query(
        &self,
        program: &str,
        args: &[OsString],
        path: &Utf8Path,
    ) -> Result<String, SpaceError> {
        debug!(command = %render_command_line(program, args), "querying filesystem");
        let output = self.runner.run(program, args)?;
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(SpaceError::QueryFailed {
            program: program.to_owned(),
            path: path.to_path_buf(),
            status_text: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }

    /// Asks `findmnt` for `column` of the filesystem selected by `selector`.
    /// An empty answer means nothing is mounted there.
    fn findmnt(&self, selector: &str, column: &str, path: &Utf8Path) -> Result<String, SpaceError> {
        let args = [
            OsString::from("--noheadings"),
            OsString::from("--output"),
            OsString::from(column),
            OsString::from(selector),
            OsString::from(path.as_str()),
        ];
        debug!(command = %render_command_line(&self.findmnt_bin, &args), "querying mounts");
        let output = self.runner.run(&self.findmnt_bin, &args)?;
        let not_mounted = || SpaceError::NotMounted {
            path: path.to_path_buf(),
        };

        if output.code == Some(FINDMNT_NO_MATCH) && output.stderr.trim().is_empty() {
            return Err(not_mounted());
        }
        if !output.is_success() {
            return Err(SpaceError::QueryFailed {
                program: self.findmnt_bin.clone(),
                path: path.to_path_buf(),
                status_text: output.status_text(),
                stderr: output.stderr.trim().to_owned(),
            });
        }
        output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_owned)
            .ok_or_else(not_mounted)
    }

    /// Returns the mountpoint named by `path`: the path itself when it is a
    /// mountpoint, or where the device is mounted when it is a device.
    fn mount_target(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SpaceError> {
        let selector = if is_device(path) {
            "--source"
        } else {
            "--mountpoint"
        };
        self.findmnt(selector, "TARGET", path).map(Utf8PathBuf::from)
    }
}

impl<R: CommandRunner> FreeSpaceProvider for DfSpaceInspector<R> {
    fn free_space_gb(&self, path: &Utf8Path) -> Result<u64, SpaceError> {
        let target = self.mount_target(path)?;
        let args = [
            OsString::from("-k"),
            OsString::from("--output=avail"),
            OsString::from(target.as_str()),
        ];
        let stdout = self.query(&self.df_bin, &args, path)?;
        let kib = parse_available_kib(&stdout).ok_or_else(|| SpaceError::UnexpectedOutput {
            program: self.df_bin.clone(),
            path: path.to_path_buf(),
            output: stdout.clone(),
        })?;
        Ok(kib_to_gib(kib))
    }

    fn resolve_device(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SpaceError> {
        if is_device(path) {
            self.mount_target(path)?;
            return Ok(path.to_path_buf());
        }

        let source = self.findmnt("--mountpoint", "SOURCE", path)?;
        if !source.starts_with(DEVICE_PREFIX) {
            return Err(SpaceError::UnexpectedOutput {
                program: self.findmnt_bin.clone(),
                path: path.to_path_buf(),
                output: source,
            });
        }
        Ok(Utf8PathBuf::from(source))
    }
}

fn is_device(path: &Utf8Path) -> bool {
    path.as_str().starts_with(DEVICE_PREFIX)
}

/// Parses the data row of `df --output=avail`, skipping the header.
fn parse_available_kib(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse().ok())
}

const fn kib_to_gib(kib: u64) -> u64 {
    kib.div_euclid(KIB_PER_GIB)
}
