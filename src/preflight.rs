//! Start-up checks run before any remote call.

use nix::unistd::geteuid;
use thiserror::Error;
use tracing::debug;

use crate::config::ResizeConfig;

/// Environment problems detected before the workflow starts.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PreflightError {
    /// The process does not run with root privileges.
    #[error("volgrow must run as root to resize filesystems; re-run with sudo")]
    NotRoot,
    /// One or more external tools could not be found on `PATH`.
    #[error("required tools not found on PATH: {}", .tools.join(", "))]
    MissingTools {
        /// Names of the missing tools.
        tools: Vec<String>,
    },
}

/// Runs all preflight checks for `config`.
///
/// Dry runs never touch the filesystem, so they skip the privilege check and
/// do not require `resize2fs`.
///
/// # Errors
///
/// Returns [`PreflightError`] when a check fails.
pub fn check(config: &ResizeConfig) -> Result<(), PreflightError> {
    check_with(
        config,
        || geteuid().is_root(),
        |tool| which::which(tool).is_ok(),
    )
}

/// Fails unless the effective user is root.
///
/// # Errors
///
/// Returns [`PreflightError::NotRoot`] for unprivileged processes.
pub fn check_privilege() -> Result<(), PreflightError> {
    require_root(geteuid().is_root())
}

/// Fails when any of `tools` is not resolvable on `PATH`.
///
/// # Errors
///
/// Returns [`PreflightError::MissingTools`] listing every absent tool.
pub fn check_tools(tools: &[&str]) -> Result<(), PreflightError> {
    require_tools(tools, |tool| which::which(tool).is_ok())
}

fn check_with(
    config: &ResizeConfig,
    is_root: impl Fn() -> bool,
    is_available: impl Fn(&str) -> bool,
) -> Result<(), PreflightError> {
    if !config.dry_run {
        require_root(is_root())?;
    }
    require_tools(&required_tools(config), is_available)
}

const fn require_root(is_root: bool) -> Result<(), PreflightError> {
    if is_root {
        Ok(())
    } else {
        Err(PreflightError::NotRoot)
    }
}

fn require_tools(
    tools: &[&str],
    is_available: impl Fn(&str) -> bool,
) -> Result<(), PreflightError> {
    let missing = missing_tools(tools, is_available);
    if missing.is_empty() {
        debug!(?tools, "external tools found");
        Ok(())
    } else {
        Err(PreflightError::MissingTools { tools: missing })
    }
}

fn required_tools(config: &ResizeConfig) -> Vec<&str> {
    let mut tools = vec![config.df_bin.as_str(), config.findmnt_bin.as_str()];
    if !config.dry_run {
        tools.push(config.resize2fs_bin.as_str());
    }
    tools
}

fn missing_tools(tools: &[&str], is_available: impl Fn(&str) -> bool) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| !is_available(tool))
        .map(|tool| (*tool).to_owned())
        .collect()
}
