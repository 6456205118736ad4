//! Command-line interface definitions for the `volgrow` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.
//!
//! Every option is optional at the parser level: required values may also
//! come from `VOLGROW_*` environment variables or `volgrow.toml`, and are
//! checked after the layers are merged.

use clap::Parser;

/// Top-level CLI for the `volgrow` binary.
#[derive(Debug, Default, Parser)]
#[command(
    name = "volgrow",
    version,
    about = "Grow a DigitalOcean block-storage volume and its filesystem when free space runs low",
    long_about = None
)]
pub(crate) struct Cli {
    /// DigitalOcean API token.
    #[arg(short = 't', long = "token", value_name = "TOKEN")]
    pub(crate) token: Option<String>,
    /// Mountpoint or block device to watch.
    #[arg(short = 'd', long, value_name = "PATH")]
    pub(crate) device: Option<String>,
    /// Name of the block-storage volume backing the device.
    #[arg(short = 'n', long, value_name = "NAME")]
    pub(crate) volume_name: Option<String>,
    /// Region slug of the volume, for example `nyc1`.
    #[arg(short = 'r', long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Free space to keep, in GB; the volume grows by this much [default: 10].
    #[arg(short = 'b', long = "buffer", value_name = "GB")]
    pub(crate) buffer: Option<u64>,
    /// Prefix progress lines with a timestamp.
    #[arg(short = 'l', long)]
    pub(crate) timestamps: bool,
    /// Seconds between resize action status checks [default: 1].
    #[arg(long, value_name = "SECS")]
    pub(crate) poll_interval: Option<u64>,
    /// Seconds to wait for the resize action before giving up [default: 600].
    #[arg(long, value_name = "SECS")]
    pub(crate) poll_timeout: Option<u64>,
    /// Maximum number of resize action status checks.
    #[arg(long, value_name = "N")]
    pub(crate) max_poll_attempts: Option<u32>,
    /// Base URL of the DigitalOcean API.
    #[arg(long, value_name = "URL")]
    pub(crate) api_url: Option<String>,
    /// Report the planned resize without changing anything.
    #[arg(long)]
    pub(crate) dry_run: bool,
}
