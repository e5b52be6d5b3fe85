mod aggregate;
mod cli;
mod kubectl;
mod scheduler;
mod types;
mod utils;

use anyhow::Context;
use clap::Parser;
use regex::Regex;
use std::path::Path;
use tracing::{info, warn};

use aggregate::concatenate_logs;
use cli::Cli;
use kubectl::{Kubectl, fetch_resource, list_resources};
use scheduler::fan_out;
use types::DumpReport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let name_filter = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .with_context(|| format!("Invalid regex pattern '{}'", cli.filter.as_deref().unwrap_or_default()))?;

    let kubectl = kubectl_from_cli(&cli);

    let report = dump_resources(
        &kubectl,
        &cli.output,
        usize::from(cli.max_channels),
        name_filter.as_ref(),
    )
    .await?;

    log_summary(&report);

    Ok(())
}

fn kubectl_from_cli(cli: &Cli) -> Kubectl {
    if cli.context.is_none() {
        info!("Using default context");
    }
    let mut kubectl = Kubectl::new(cli.kubectl.clone());
    if let Some(path) = &cli.kubeconfig {
        kubectl = kubectl.with_kubeconfig(path);
    }
    kubectl.with_context(cli.context.clone())
}

fn log_summary(report: &DumpReport) {
    let failed = report.failed();
    if failed > 0 {
        warn!(
            "{} of {} resources failed, see {}",
            failed,
            report.outputs.len(),
            report.combined_log.display()
        );
    } else {
        info!("Fetched {} resources", report.outputs.len());
    }
}

/// List resource types, fetch each one into its own log file, then combine
/// them into `log.txt`.
async fn dump_resources(
    kubectl: &Kubectl,
    output_dir: &Path,
    max_concurrent: usize,
    name_filter: Option<&Regex>,
) -> anyhow::Result<DumpReport> {
    let mut resources = list_resources(kubectl)
        .await
        .context("Error listing API resources")?;
    if let Some(re) = name_filter {
        resources.retain(|r| re.is_match(&r.name));
    }
    info!(
        "Parsed {} resources, fetching with up to {} concurrent kubectl calls",
        resources.len(),
        max_concurrent
    );

    let fetcher = kubectl.clone();
    let dir = output_dir.to_path_buf();
    let outputs = fan_out(resources, max_concurrent, move |resource| {
        let kubectl = fetcher.clone();
        let dir = dir.clone();
        async move { fetch_resource(&kubectl, &resource, &dir).await }
    })
    .await
    .context("Error processing resources")?;

    // Nothing may have been fetched, the combined log still needs a home.
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Error creating output directory {}", output_dir.display()))?;
    let dir = output_dir.to_path_buf();
    let combined_log = tokio::task::spawn_blocking(move || concatenate_logs(&dir))
        .await
        .context("log aggregation task did not complete")?
        .context("Error concatenating logs")?;

    Ok(DumpReport {
        outputs,
        combined_log,
    })
}
