//! BDD step definitions for the resize workflow.

use camino::Utf8PathBuf;
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;
use volgrow::{ActionStatus, GrowError, ResizeOrchestrator, ResizeOutcome};

use super::test_helpers::{ResizeContext, RunResult, parse_failure_kind};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a watched mount with {free} GB free and a {buffer} GB buffer")]
fn watched_mount(mut resize_context: ResizeContext, free: u64, buffer: u64) -> ResizeContext {
    resize_context.space.push_reading(free);
    resize_context.request.buffer_gb = buffer;
    resize_context
}

#[given("the volume \"{id}\" has {size} GB")]
fn volume_exists(resize_context: ResizeContext, id: String, size: u64) -> ResizeContext {
    resize_context.api.set_volume(&id, size);
    resize_context
}

#[given("the resize action reports \"{statuses}\"")]
fn action_reports(resize_context: ResizeContext, statuses: String) -> ResizeContext {
    resize_context.api.push_statuses(
        statuses
            .split(',')
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .map(ActionStatus::from),
    );
    resize_context
}

#[given("free space after the resize is {free} GB")]
fn free_after(resize_context: ResizeContext, free: u64) -> ResizeContext {
    resize_context.space.push_reading(free);
    resize_context
}

#[given("status checks are capped at {attempts}")]
fn status_checks_capped(mut resize_context: ResizeContext, attempts: u32) -> ResizeContext {
    resize_context.policy.max_attempts = Some(attempts);
    resize_context
}

#[given("the filesystem resize fails")]
fn filesystem_resize_fails(resize_context: ResizeContext) -> ResizeContext {
    resize_context.grower.fail_with(GrowError::Failed {
        program: String::from("resize2fs"),
        device: Utf8PathBuf::from(super::test_helpers::BACKING_DEVICE),
        status_text: String::from("exit status 1"),
        stderr: String::from("resize2fs: Bad magic number in super-block"),
    });
    resize_context
}

#[given("dry-run mode is enabled")]
fn dry_run_enabled(mut resize_context: ResizeContext) -> ResizeContext {
    resize_context.request.dry_run = true;
    resize_context
}

fn run_once(mut resize_context: ResizeContext) -> Result<ResizeContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    let orchestrator = ResizeOrchestrator::new(
        resize_context.api.clone(),
        resize_context.space.clone(),
        resize_context.grower.clone(),
    )
    .with_poll_policy(resize_context.policy);

    let request = resize_context.request.clone();
    let result = runtime.block_on(async move { orchestrator.execute(&request).await });
    resize_context.results.push(RunResult::from_result(result));
    Ok(resize_context)
}

#[when("I run the resize workflow")]
fn run_workflow(resize_context: ResizeContext) -> Result<ResizeContext, StepError> {
    run_once(resize_context)
}

#[when("I run the resize workflow again")]
fn run_workflow_again(resize_context: ResizeContext) -> Result<ResizeContext, StepError> {
    run_once(resize_context)
}

fn last_result(resize_context: &ResizeContext) -> Result<&RunResult, StepError> {
    resize_context
        .results
        .last()
        .ok_or_else(|| StepError::Assertion(String::from("the workflow has not run")))
}

#[then("the workflow reports no action needed")]
fn no_action_needed(resize_context: &ResizeContext) -> Result<(), StepError> {
    match last_result(resize_context)? {
        RunResult::Outcome(ResizeOutcome::NotNeeded { .. }) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected no action, got {other:?}"
        ))),
    }
}

#[then("no remote calls are made")]
fn no_remote_calls(resize_context: &ResizeContext) -> Result<(), StepError> {
    let counts = resize_context.api.counts();
    if counts.total() == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no remote calls, got {counts:?}"
        )))
    }
}

#[then("free space was read {count} times")]
fn free_space_reads(resize_context: &ResizeContext, count: u32) -> Result<(), StepError> {
    let queries = resize_context.space.queries();
    if queries == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} free-space reads, got {queries}"
        )))
    }
}

#[then("the volume is resized to {size} GB")]
fn volume_resized(resize_context: &ResizeContext, size: u64) -> Result<(), StepError> {
    let RunResult::Outcome(ResizeOutcome::Resized(report)) = last_result(resize_context)? else {
        return Err(StepError::Assertion(String::from(
            "expected a completed resize",
        )));
    };
    let requests = resize_context.api.resize_requests();
    if report.new_size_gb == size && requests == vec![size] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected one resize to {size} GB, report says {} and requests were {requests:?}",
            report.new_size_gb
        )))
    }
}

#[then("the reported free space is {free} GB")]
fn reported_free_space(resize_context: &ResizeContext, free: u64) -> Result<(), StepError> {
    match last_result(resize_context)? {
        RunResult::Outcome(ResizeOutcome::Resized(report)) if report.free_after_gb == free => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected {free} GB free after resize, got {other:?}"
        ))),
    }
}

#[then("the filesystem on \"{device}\" is grown")]
fn filesystem_grown(resize_context: &ResizeContext, device: String) -> Result<(), StepError> {
    let grown = resize_context.grower.grown();
    if grown == vec![Utf8PathBuf::from(&device)] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {device} to be grown once, got {grown:?}"
        )))
    }
}

#[then("the filesystem is not grown")]
fn filesystem_not_grown(resize_context: &ResizeContext) -> Result<(), StepError> {
    let grown = resize_context.grower.grown();
    if grown.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "filesystem should not be grown, got {grown:?}"
        )))
    }
}

#[then("the API received {lookups} lookup, {resizes} resize, and {checks} status calls")]
fn api_call_counts(
    resize_context: &ResizeContext,
    lookups: u32,
    resizes: u32,
    checks: u32,
) -> Result<(), StepError> {
    let counts = resize_context.api.counts();
    if (counts.lookups, counts.resizes, counts.status_checks) == (lookups, resizes, checks) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {lookups}/{resizes}/{checks} calls, got {counts:?}"
        )))
    }
}

#[then("the workflow fails with \"{kind}\"")]
fn workflow_fails(resize_context: &ResizeContext, kind: String) -> Result<(), StepError> {
    let expected = parse_failure_kind(&kind)
        .ok_or_else(|| StepError::Assertion(format!("unknown failure kind: {kind}")))?;
    match last_result(resize_context)? {
        RunResult::Failure { kind: actual, .. } if *actual == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {expected:?} failure, got {other:?}"
        ))),
    }
}

#[then("the failure message mentions \"{text}\"")]
fn failure_mentions(resize_context: &ResizeContext, text: String) -> Result<(), StepError> {
    match last_result(resize_context)? {
        RunResult::Failure { message, .. } if message.contains(&text) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure mentioning {text:?}, got {other:?}"
        ))),
    }
}

#[then("the dry run plans a resize from {current} GB to {planned} GB")]
fn dry_run_plan(
    resize_context: &ResizeContext,
    current: u64,
    planned: u64,
) -> Result<(), StepError> {
    match last_result(resize_context)? {
        RunResult::Outcome(ResizeOutcome::DryRun {
            current_size_gb,
            planned_size_gb,
            ..
        }) if (*current_size_gb, *planned_size_gb) == (current, planned) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected dry run {current} -> {planned}, got {other:?}"
        ))),
    }
}
