//! CLI entry point for the citegraph tool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use citegraph_core::{
    ArxivSearch, CrossrefLookup, Pipeline, ProgressCallback, RunConfig, RunSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

mod app_config;
mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_config_for(&args)?;
    if let Some(path) = &loaded.path
        && loaded.config.is_some()
    {
        info!(path = %path.display(), "Loaded config file");
    }
    let config = app_config::build_run_config(&args, loaded.config.as_ref())?;

    info!(
        query = %config.query,
        seed_limit = config.seed_limit,
        max_nodes = config.crawl.max_nodes,
        delay_ms = config.crawl.request_delay.as_millis(),
        "Citegraph starting"
    );

    let seeds = ArxivSearch::with_base_url(config.arxiv_url.clone(), &config.http)
        .context("Failed to create arXiv client")?;
    let lookup = CrossrefLookup::with_base_url(
        config.mailto.clone(),
        config.crossref_url.clone(),
        &config.http,
    )
    .context("Failed to create Crossref client")?;

    let progress = (!args.quiet).then(|| progress_bar(&config));
    let mut pipeline = Pipeline::new(config, Arc::new(seeds), Arc::new(lookup));
    if let Some(bar) = &progress {
        let bar = bar.clone();
        let callback: ProgressCallback = Arc::new(move |nodes: usize| {
            bar.set_position(nodes as u64);
        });
        pipeline = pipeline.with_progress_callback(callback);
    }

    let result = pipeline.run().await;
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    let summary = result.context("Citation crawl failed")?;

    report(&summary);
    Ok(())
}

fn progress_bar(config: &RunConfig) -> ProgressBar {
    let bar = ProgressBar::new(config.crawl.max_nodes as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} nodes")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn report(summary: &RunSummary) {
    info!(
        seeds_found = summary.seeds_found,
        seeds_ingested = summary.seeds_ingested,
        nodes = summary.export.nodes_written,
        edges = summary.export.edges_written,
        resolved = summary.crawl.resolved,
        failed = summary.crawl.failed,
        stop_reason = %summary.crawl.stop_reason,
        "Crawl complete"
    );
    if let Some(artifacts) = &summary.artifacts {
        info!(
            fetched = artifacts.fetched,
            skipped = artifacts.skipped,
            failed = artifacts.failed,
            "Artifacts complete"
        );
    }
}
