mod cli;
mod config;

use std::process::ExitCode;

use anyhow::Context;
use channel_engine::{run_pipeline, LoggingProgressSink, ReqwestFetcher, RunSummary};
use channel_logging::{channel_error, channel_info, channel_warn};
use clap::Parser;
use log::LevelFilter;

use crate::cli::Cli;
use crate::config::AppConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    channel_logging::initialize(cli.log.into(), level, &cli.log_file);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            channel_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli);
    if cli.print_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    let (pipeline, fetch) = config.into_parts();
    let fetcher = ReqwestFetcher::new(fetch);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let summary = runtime.block_on(run_pipeline(&pipeline, &fetcher, &LoggingProgressSink))?;
    report(&summary);
    Ok(())
}

fn report(summary: &RunSummary) {
    for source in &summary.failed_sources {
        channel_warn!("Source {} contributed nothing this run", source);
    }
    if summary.pruned > 0 {
        channel_info!("Pruned {} invalid entries from the output", summary.pruned);
    }
    channel_info!(
        "Done: {} + {} accepted, {} already known, {} new; {} entries written to {:?} ({:?}{})",
        summary.playlist_entries,
        summary.list_entries,
        summary.existing_urls,
        summary.new_entries,
        summary.write.entries_written,
        summary.write.path,
        summary.write.mode,
        if summary.write.touched { "" } else { ", unchanged" }
    );
}
