//! Online filesystem growth via `resize2fs`.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::info;

use crate::command::{CommandError, CommandRunner, render_command_line};

/// Default online resize tool.
pub const DEFAULT_RESIZE2FS_BIN: &str = "resize2fs";

/// Capability for growing a mounted filesystem to fill its block device.
pub trait FilesystemResizer {
    /// Grows the filesystem on `device` to the device's current size.
    ///
    /// # Errors
    ///
    /// Returns [`GrowError`] when the resize tool is unavailable or reports
    /// a failure.
    fn grow_filesystem(&self, device: &Utf8Path) -> Result<(), GrowError>;
}

/// Errors raised while growing a filesystem.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GrowError {
    /// Raised when the resize tool cannot be started.
    #[error("filesystem resize tool unavailable: {0}")]
    Unavailable(#[from] CommandError),
    /// Raised when the resize tool exits with a non-zero status.
    #[error("{program} failed on {device} (status {status_text}): {stderr}")]
    Failed {
        /// Tool that failed.
        program: String,
        /// Device being grown.
        device: Utf8PathBuf,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the tool.
        stderr: String,
    },
}

/// Grows ext2/3/4 filesystems online with `resize2fs`, streaming its output
/// into the log.
#[derive(Clone, Debug)]
pub struct Resize2fsGrower<R: CommandRunner> {
    runner: R,
    resize2fs_bin: String,
}

impl<R: CommandRunner> Resize2fsGrower<R> {
    /// Creates a grower invoking `resize2fs_bin` through `runner`.
    #[must_use]
    pub fn new(runner: R, resize2fs_bin: impl Into<String>) -> Self {
        Self {
            runner,
            resize2fs_bin: resize2fs_bin.into(),
        }
    }
}

impl<R: CommandRunner> FilesystemResizer for Resize2fsGrower<R> {
    fn grow_filesystem(&self, device: &Utf8Path) -> Result<(), GrowError> {
        let args = [OsString::from(device.as_str())];
        info!(
            command = %render_command_line(&self.resize2fs_bin, &args),
            "growing filesystem"
        );

        let output = self
            .runner
            .run_streaming(&self.resize2fs_bin, &args, &mut |line| {
                if !line.trim().is_empty() {
                    info!("{}: {}", self.resize2fs_bin, line.trim_end());
                }
            })?;

        if output.is_success() {
            return Ok(());
        }

        Err(GrowError::Failed {
            program: self.resize2fs_bin.clone(),
            device: device.to_path_buf(),
            status_text: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }
}
