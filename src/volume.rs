//! Cloud volume abstractions used by the resize workflow.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Largest volume size, in GB, the provider accepts.
pub const MAX_VOLUME_SIZE_GB: u64 = 16_384;

/// Block-storage volume as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Provider specific identifier.
    pub id: String,
    /// Human-friendly volume name, unique per region.
    pub name: String,
    /// Region slug the volume lives in (for example `nyc1`).
    pub region: String,
    /// Current size in gigabytes.
    pub size_gb: u64,
}

impl Volume {
    /// Checks that `new_size_gb` is a size the provider can grow this volume
    /// to. Shrinking is unsupported, so the target must be strictly larger.
    ///
    /// # Errors
    ///
    /// Returns [`ResizeTargetError`] when the target is not larger than the
    /// current size or exceeds [`MAX_VOLUME_SIZE_GB`].
    pub const fn check_resize_target(&self, new_size_gb: u64) -> Result<(), ResizeTargetError> {
        if new_size_gb <= self.size_gb {
            return Err(ResizeTargetError::NotLarger {
                current_gb: self.size_gb,
                requested_gb: new_size_gb,
            });
        }
        if new_size_gb > MAX_VOLUME_SIZE_GB {
            return Err(ResizeTargetError::AboveMaximum {
                requested_gb: new_size_gb,
                maximum_gb: MAX_VOLUME_SIZE_GB,
            });
        }
        Ok(())
    }
}

/// Reasons a resize target is rejected before contacting the provider.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResizeTargetError {
    /// The requested size would shrink or keep the volume size.
    #[error("requested size {requested_gb} GB must exceed current size {current_gb} GB")]
    NotLarger {
        /// Current volume size.
        current_gb: u64,
        /// Requested volume size.
        requested_gb: u64,
    },
    /// The requested size exceeds the provider limit.
    #[error("requested size {requested_gb} GB exceeds the provider maximum of {maximum_gb} GB")]
    AboveMaximum {
        /// Requested volume size.
        requested_gb: u64,
        /// Provider limit.
        maximum_gb: u64,
    },
}

/// Identifier of an asynchronous provider action.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a provider action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActionStatus {
    /// The provider is still working on the action.
    InProgress,
    /// The action finished successfully.
    Completed,
    /// The action failed on the provider side.
    Errored,
    /// Any status string this client does not model.
    Other(String),
}

impl ActionStatus {
    /// Returns the provider's wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Other(status) => status.as_str(),
        }
    }
}

impl From<&str> for ActionStatus {
    fn from(value: &str) -> Self {
        match value {
            "in-progress" => Self::InProgress,
            "completed" => Self::Completed,
            "errored" => Self::Errored,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Future returned by volume API operations.
pub type VolumeFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Remote operations the resize workflow needs from a cloud provider.
pub trait VolumeApi {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Finds the single volume called `name` in `region`.
    fn find_volume<'a>(
        &'a self,
        region: &'a str,
        name: &'a str,
    ) -> VolumeFuture<'a, Volume, Self::Error>;

    /// Requests that `volume` be grown to `new_size_gb` and returns the
    /// identifier of the resulting action.
    fn resize_volume<'a>(
        &'a self,
        volume: &'a Volume,
        new_size_gb: u64,
    ) -> VolumeFuture<'a, ActionId, Self::Error>;

    /// Fetches the current status of a previously created action.
    fn action_status<'a>(
        &'a self,
        action: &'a ActionId,
    ) -> VolumeFuture<'a, ActionStatus, Self::Error>;
}
