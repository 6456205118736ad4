//! Binary entry point for the volgrow CLI.

mod cli;

use std::io::{self, Write};
use std::process;

use clap::{CommandFactory, Parser};
use thiserror::Error;
use tracing::{info, warn};

use cli::Cli;
use volgrow::{
    CloudError, ConfigError, ConfigOverrides, DfSpaceInspector, DigitalOceanClient,
    PreflightError, ProcessCommandRunner, Resize2fsGrower, ResizeConfig, ResizeError,
    ResizeOrchestrator, ResizeOutcome, logging, preflight,
};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error("failed to create API client: {0}")]
    Client(#[source] CloudError),
    #[error(transparent)]
    Resize(#[from] ResizeError<CloudError>),
    #[error(
        "interrupted; the resize action may still be in progress and the filesystem may not be resized"
    )]
    Interrupted,
}

impl CliError {
    const fn wants_usage(&self) -> bool {
        matches!(
            self,
            Self::Config(ConfigError::MissingField(_) | ConfigError::Invalid { .. })
        )
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ResizeConfig::load_without_cli_args()?.with_overrides(overrides(cli));
    let request = config.as_request()?;
    logging::init(config.log_timestamps);
    preflight::check(&config)?;

    let client = DigitalOceanClient::new(&config).map_err(CliError::Client)?;
    let runner = ProcessCommandRunner;
    let space = DfSpaceInspector::new(runner, &config.df_bin, &config.findmnt_bin);
    let grower = Resize2fsGrower::new(runner, &config.resize2fs_bin);
    let orchestrator =
        ResizeOrchestrator::new(client, space, grower).with_poll_policy(config.poll_policy());

    let workflow = orchestrator.execute(&request);
    tokio::pin!(workflow);
    let outcome = tokio::select! {
        result = &mut workflow => result?,
        signal = tokio::signal::ctrl_c() => {
            if signal.is_ok() {
                warn!("received interrupt; stopping");
                return Err(CliError::Interrupted);
            }
            warn!("cannot listen for interrupts; continuing without a handler");
            workflow.await?
        }
    };
    report_outcome(&outcome);
    Ok(())
}

fn overrides(cli: Cli) -> ConfigOverrides {
    ConfigOverrides {
        api_token: cli.token,
        device: cli.device,
        volume_name: cli.volume_name,
        region: cli.region,
        buffer_gb: cli.buffer,
        log_timestamps: cli.timestamps,
        api_url: cli.api_url,
        poll_interval_secs: cli.poll_interval,
        poll_timeout_secs: cli.poll_timeout,
        max_poll_attempts: cli.max_poll_attempts,
        dry_run: cli.dry_run,
    }
}

fn report_outcome(outcome: &ResizeOutcome) {
    match outcome {
        ResizeOutcome::NotNeeded { .. } => info!("no resize needed"),
        ResizeOutcome::DryRun {
            planned_size_gb, ..
        } => info!("dry run complete; would grow the volume to {planned_size_gb} GB"),
        ResizeOutcome::Resized(report) => info!(
            volume_id = %report.volume_id,
            "volume grown from {} GB to {} GB",
            report.previous_size_gb,
            report.new_size_gb
        ),
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "error: {err}").ok();
    if err.wants_usage() {
        writeln!(target, "\n{}", Cli::command().render_usage()).ok();
        writeln!(target, "For more information, try '--help'.").ok();
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
