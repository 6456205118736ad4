//! BDD scenarios for the resize workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ResizeContext, resize_context};

#[scenario(
    path = "tests/features/resize.feature",
    name = "Leave the volume alone when free space meets the buffer"
)]
fn scenario_sufficient_space(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "Grow the volume by the buffer and resize the filesystem"
)]
fn scenario_grow_volume(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "A second run after a successful resize makes no remote calls"
)]
fn scenario_idempotent_rerun(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "Abort when the provider reports the action as errored"
)]
fn scenario_action_errored(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "Give up when the action never completes"
)]
fn scenario_poll_timeout(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "Stop when the volume cannot be found"
)]
fn scenario_volume_not_found(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "Surface filesystem resize failures"
)]
fn scenario_grow_failure(resize_context: ResizeContext) {
    drop(resize_context);
}

#[scenario(
    path = "tests/features/resize.feature",
    name = "Plan the resize without changing anything in dry-run mode"
)]
fn scenario_dry_run(resize_context: ResizeContext) {
    drop(resize_context);
}
