//! Shared fixtures for resize BDD scenarios.

use std::time::Duration;

use camino::Utf8PathBuf;
use rstest::fixture;
use volgrow::test_support::{RecordingGrower, ScriptedSpace};
use volgrow::{CloudError, PollPolicy, ResizeError, ResizeOutcome, ResizeRequest};

use super::test_doubles::ScriptedVolumeApi;

pub const WATCHED_MOUNT: &str = "/mnt/data";
pub const BACKING_DEVICE: &str = "/dev/sda";

#[derive(Clone, Debug)]
pub struct ResizeContext {
    pub api: ScriptedVolumeApi,
    pub space: ScriptedSpace,
    pub grower: RecordingGrower,
    pub request: ResizeRequest,
    pub policy: PollPolicy,
    pub results: Vec<RunResult>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureKind {
    FreeSpace,
    Device,
    Lookup,
    Resize,
    Poll,
    ActionErrored,
    PollTimeout,
    Grow,
    Overflow,
}

#[derive(Clone, Debug)]
pub enum RunResult {
    Outcome(ResizeOutcome),
    Failure { kind: FailureKind, message: String },
}

impl RunResult {
    pub fn from_result(result: Result<ResizeOutcome, ResizeError<CloudError>>) -> Self {
        match result {
            Ok(outcome) => Self::Outcome(outcome),
            Err(err) => Self::Failure {
                kind: failure_kind(&err),
                message: err.to_string(),
            },
        }
    }
}

const fn failure_kind(err: &ResizeError<CloudError>) -> FailureKind {
    match err {
        ResizeError::FreeSpace(_) => FailureKind::FreeSpace,
        ResizeError::DeviceResolution(_) => FailureKind::Device,
        ResizeError::Lookup(_) => FailureKind::Lookup,
        ResizeError::SizeOverflow { .. } => FailureKind::Overflow,
        ResizeError::Resize(_) => FailureKind::Resize,
        ResizeError::Poll { .. } => FailureKind::Poll,
        ResizeError::ActionErrored { .. } => FailureKind::ActionErrored,
        ResizeError::PollTimeout { .. } => FailureKind::PollTimeout,
        ResizeError::Grow(_) => FailureKind::Grow,
    }
}

pub fn parse_failure_kind(kind: &str) -> Option<FailureKind> {
    match kind {
        "free space" => Some(FailureKind::FreeSpace),
        "device" => Some(FailureKind::Device),
        "lookup" => Some(FailureKind::Lookup),
        "resize" => Some(FailureKind::Resize),
        "poll" => Some(FailureKind::Poll),
        "action errored" => Some(FailureKind::ActionErrored),
        "poll timeout" => Some(FailureKind::PollTimeout),
        "grow" => Some(FailureKind::Grow),
        "overflow" => Some(FailureKind::Overflow),
        _ => None,
    }
}

#[fixture]
pub fn resize_context() -> ResizeContext {
    ResizeContext {
        api: ScriptedVolumeApi::new(),
        space: ScriptedSpace::new(BACKING_DEVICE),
        grower: RecordingGrower::new(),
        request: ResizeRequest {
            path: Utf8PathBuf::from(WATCHED_MOUNT),
            volume_name: String::from("data"),
            region: String::from("nyc1"),
            buffer_gb: 10,
            dry_run: false,
        },
        policy: PollPolicy {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            max_attempts: None,
        },
        results: Vec::new(),
    }
}
