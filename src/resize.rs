//! Grows a cloud volume and its filesystem when free space runs low.
//!
//! The workflow is strictly linear with a single branch point: when the
//! watched path already has at least the configured buffer free, nothing
//! else happens. Otherwise the backing volume is looked up, grown by the
//! buffer, polled until the provider reports completion, and the filesystem
//! is grown online to match. Every failure aborts the run; re-running on
//! the next schedule is the recovery path.

use std::fmt;
use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::grow::{FilesystemResizer, GrowError};
use crate::poll::{PollError, PollPolicy, PollStep, poll_until};
use crate::space::{FreeSpaceProvider, SpaceError};
use crate::volume::{ActionId, ActionStatus, VolumeApi};

/// Inputs for a single resize run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResizeRequest {
    /// Mountpoint or block device whose free space is watched.
    pub path: Utf8PathBuf,
    /// Name of the backing volume.
    pub volume_name: String,
    /// Region slug of the backing volume.
    pub region: String,
    /// Minimum free space, in GB, and the amount the volume grows by.
    pub buffer_gb: u64,
    /// Stop before any write call when set.
    pub dry_run: bool,
}

/// Stage of the resize workflow, used for progress logging.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResizeStage {
    /// Measuring free space on the watched path.
    CheckingSpace,
    /// Finding the backing volume by name and region.
    LookingUpVolume,
    /// Requesting the provider to grow the volume.
    ResizingVolume,
    /// Waiting for the provider action to finish.
    Polling,
    /// Growing the filesystem on the device.
    ResizingFilesystem,
    /// Workflow finished.
    Done,
}

impl fmt::Display for ResizeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CheckingSpace => "checking free space",
            Self::LookingUpVolume => "looking up volume",
            Self::ResizingVolume => "resizing volume",
            Self::Polling => "waiting for resize action",
            Self::ResizingFilesystem => "resizing filesystem",
            Self::Done => "done",
        })
    }
}

/// Summary of a completed resize.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResizeReport {
    /// Provider identifier of the grown volume.
    pub volume_id: String,
    /// Volume size before the resize.
    pub previous_size_gb: u64,
    /// Volume size requested from the provider.
    pub new_size_gb: u64,
    /// Free space measured before the resize.
    pub free_before_gb: u64,
    /// Free space measured after the filesystem was grown.
    pub free_after_gb: u64,
    /// Action status checks performed.
    pub poll_attempts: u32,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// Result of a resize run that did not fail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResizeOutcome {
    /// Free space already meets the buffer; no remote call was made.
    NotNeeded {
        /// Measured free space.
        free_gb: u64,
        /// Configured buffer.
        buffer_gb: u64,
    },
    /// Dry run: the resize that would have been requested.
    DryRun {
        /// Provider identifier of the volume.
        volume_id: String,
        /// Current volume size.
        current_size_gb: u64,
        /// Size that would have been requested.
        planned_size_gb: u64,
        /// Measured free space.
        free_gb: u64,
    },
    /// The volume and filesystem were grown.
    Resized(ResizeReport),
}

/// Errors surfaced while resizing. Each variant names the failed stage.
#[derive(Debug, Error)]
pub enum ResizeError<ApiError>
where
    ApiError: std::error::Error + 'static,
{
    /// Raised when free space cannot be measured.
    #[error("failed to measure free space: {0}")]
    FreeSpace(#[source] SpaceError),
    /// Raised when the backing device cannot be resolved.
    #[error("failed to resolve the underlying device: {0}")]
    DeviceResolution(#[source] SpaceError),
    /// Raised when the volume lookup fails.
    #[error("volume lookup failed: {0}")]
    Lookup(#[source] ApiError),
    /// Raised when the new size does not fit in a `u64`.
    #[error("volume size {current_gb} GB plus buffer {buffer_gb} GB overflows")]
    SizeOverflow {
        /// Current volume size.
        current_gb: u64,
        /// Configured buffer.
        buffer_gb: u64,
    },
    /// Raised when the resize request is rejected.
    #[error("resize request failed: {0}")]
    Resize(#[source] ApiError),
    /// Raised when checking the action status fails.
    #[error("checking resize action {action_id} failed: {source}")]
    Poll {
        /// Action being polled.
        action_id: ActionId,
        /// Provider error.
        #[source]
        source: ApiError,
    },
    /// Raised when the provider reports the action as errored.
    #[error("resize action {action_id} errored on the provider side")]
    ActionErrored {
        /// Action that failed.
        action_id: ActionId,
    },
    /// Raised when the action does not complete within the polling budget.
    #[error(
        "resize action {action_id} did not complete after {attempts} checks in {}s (last status: {last_status})",
        .elapsed.as_secs()
    )]
    PollTimeout {
        /// Action being polled.
        action_id: ActionId,
        /// Status checks performed.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
        /// Last status observed.
        last_status: String,
    },
    /// Raised when the filesystem cannot be grown.
    #[error("filesystem resize failed: {0}")]
    Grow(#[source] GrowError),
}

#[derive(Debug, Error)]
enum PollFailure<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Api(E),
    #[error("action errored")]
    Errored,
}

/// Executes the resize workflow against a volume API and local tools.
#[derive(Debug)]
pub struct ResizeOrchestrator<A, S, G> {
    api: A,
    space: S,
    grower: G,
    poll_policy: PollPolicy,
}

impl<A, S, G> ResizeOrchestrator<A, S, G>
where
    A: VolumeApi,
    S: FreeSpaceProvider,
    G: FilesystemResizer,
{
    /// Creates an orchestrator with the default polling policy.
    #[must_use]
    pub fn new(api: A, space: S, grower: G) -> Self {
        Self {
            api,
            space,
            grower,
            poll_policy: PollPolicy::default(),
        }
    }

    /// Overrides the polling policy used while waiting for the action.
    #[must_use]
    pub const fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Returns the volume API, mainly for test inspection.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Runs the workflow once.
    ///
    /// # Errors
    ///
    /// Returns [`ResizeError`] naming the stage that failed. Nothing is
    /// rolled back.
    pub async fn execute(
        &self,
        request: &ResizeRequest,
    ) -> Result<ResizeOutcome, ResizeError<A::Error>> {
        let started = Instant::now();

        enter(ResizeStage::CheckingSpace);
        let free_before_gb = self
            .space
            .free_space_gb(&request.path)
            .map_err(ResizeError::FreeSpace)?;
        if free_before_gb >= request.buffer_gb {
            info!(
                free_gb = free_before_gb,
                buffer_gb = request.buffer_gb,
                "{} GB free meets the {} GB buffer; no action needed",
                free_before_gb,
                request.buffer_gb
            );
            return Ok(ResizeOutcome::NotNeeded {
                free_gb: free_before_gb,
                buffer_gb: request.buffer_gb,
            });
        }
        info!(
            free_gb = free_before_gb,
            buffer_gb = request.buffer_gb,
            "{} GB free is below the {} GB buffer",
            free_before_gb,
            request.buffer_gb
        );
        let device = self
            .space
            .resolve_device(&request.path)
            .map_err(ResizeError::DeviceResolution)?;
        info!(device = %device, "resolved underlying device");

        enter(ResizeStage::LookingUpVolume);
        let volume = self
            .api
            .find_volume(&request.region, &request.volume_name)
            .await
            .map_err(ResizeError::Lookup)?;
        info!(
            volume_id = %volume.id,
            size_gb = volume.size_gb,
            "found volume {} in {}",
            volume.name,
            volume.region
        );

        let new_size_gb = volume
            .size_gb
            .checked_add(request.buffer_gb)
            .ok_or(ResizeError::SizeOverflow {
                current_gb: volume.size_gb,
                buffer_gb: request.buffer_gb,
            })?;

        if request.dry_run {
            info!(
                volume_id = %volume.id,
                "dry run: would resize from {} GB to {} GB and grow {}",
                volume.size_gb,
                new_size_gb,
                device
            );
            return Ok(ResizeOutcome::DryRun {
                volume_id: volume.id,
                current_size_gb: volume.size_gb,
                planned_size_gb: new_size_gb,
                free_gb: free_before_gb,
            });
        }

        enter(ResizeStage::ResizingVolume);
        let action_id = self
            .api
            .resize_volume(&volume, new_size_gb)
            .await
            .map_err(ResizeError::Resize)?;
        info!(
            action_id = %action_id,
            "requested resize from {} GB to {} GB",
            volume.size_gb,
            new_size_gb
        );

        enter(ResizeStage::Polling);
        let poll_attempts = self.wait_for_action(action_id).await?;

        enter(ResizeStage::ResizingFilesystem);
        self.grower
            .grow_filesystem(&device)
            .map_err(ResizeError::Grow)?;

        let free_after_gb = self
            .space
            .free_space_gb(&request.path)
            .map_err(ResizeError::FreeSpace)?;
        let elapsed = started.elapsed();
        enter(ResizeStage::Done);
        info!(
            free_gb = free_after_gb,
            elapsed_secs = elapsed.as_secs(),
            "{} GB free after resize; finished in {:.1}s",
            free_after_gb,
            elapsed.as_secs_f64()
        );

        Ok(ResizeOutcome::Resized(ResizeReport {
            volume_id: volume.id,
            previous_size_gb: volume.size_gb,
            new_size_gb,
            free_before_gb,
            free_after_gb,
            poll_attempts,
            elapsed,
        }))
    }

    async fn wait_for_action(&self, action_id: ActionId) -> Result<u32, ResizeError<A::Error>> {
        let api = &self.api;
        let result = poll_until(&self.poll_policy, move |attempt| async move {
            let status = api
                .action_status(&action_id)
                .await
                .map_err(PollFailure::Api)?;
            info!(action_id = %action_id, attempt, "action status: {}", status);
            match status {
                ActionStatus::Completed => Ok(PollStep::Ready(())),
                ActionStatus::Errored => Err(PollFailure::Errored),
                other => Ok(PollStep::Pending(other.to_string())),
            }
        })
        .await;

        match result {
            Ok(polled) => Ok(polled.attempts),
            Err(PollError::Probe(PollFailure::Api(source))) => {
                Err(ResizeError::Poll { action_id, source })
            }
            Err(PollError::Probe(PollFailure::Errored)) => {
                Err(ResizeError::ActionErrored { action_id })
            }
            Err(PollError::Exhausted {
                attempts,
                elapsed,
                last_observation,
            }) => {
                warn!(
                    action_id = %action_id,
                    attempts,
                    "gave up waiting for the resize action"
                );
                Err(ResizeError::PollTimeout {
                    action_id,
                    attempts,
                    elapsed,
                    last_status: last_observation.unwrap_or_else(|| String::from("unknown")),
                })
            }
        }
    }
}

fn enter(stage: ResizeStage) {
    info!(stage = ?stage, "{stage}");
}
