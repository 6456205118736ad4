//! Core library for the volgrow volume auto-resizer.
//!
//! The crate checks free space on a mounted block-storage volume and, when
//! it drops below a buffer, grows the DigitalOcean volume through the `/v2`
//! API and then grows the filesystem online with `resize2fs`.

pub mod command;
pub mod config;
pub mod digitalocean;
pub mod grow;
pub mod logging;
pub mod poll;
pub mod preflight;
pub mod resize;
pub mod space;
pub mod test_support;
pub mod volume;

pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{ConfigError, ConfigOverrides, ResizeConfig};
pub use digitalocean::{CloudError, DigitalOceanClient};
pub use grow::{FilesystemResizer, GrowError, Resize2fsGrower};
pub use poll::{PollError, PollPolicy, PollStep, Polled, poll_until};
pub use preflight::PreflightError;
pub use resize::{
    ResizeError, ResizeOrchestrator, ResizeOutcome, ResizeReport, ResizeRequest, ResizeStage,
};
pub use space::{DfSpaceInspector, FreeSpaceProvider, SpaceError};
pub use volume::{ActionId, ActionStatus, Volume, VolumeApi, VolumeFuture};
