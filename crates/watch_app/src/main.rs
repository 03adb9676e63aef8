mod cli;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use watch_engine::{
    DigestDispatcher, DispatchOutcome, FileDispatcher, FileStateStore, LogDispatcher,
    ReqwestPageSource, WatchRunner,
};
use watch_logging::{watch_info, watch_warn};

use crate::cli::Cli;
use crate::config::AppSettings;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let settings = AppSettings::from_cli(cli)?;
    let source = ReqwestPageSource::new(settings.listing.clone())
        .context("failed to set up listing client")?;
    let store = FileStateStore::new(&settings.state_file, settings.watch.delivered_capacity)
        .context("invalid state file path")?;
    let dispatcher: Box<dyn DigestDispatcher> = match &settings.digest_dir {
        Some(dir) => Box::new(FileDispatcher::new(dir.clone())),
        None => Box::new(LogDispatcher),
    };

    let runner = WatchRunner::new(
        settings.watch,
        settings.fields,
        Arc::new(source),
        store,
        dispatcher,
    );
    let report = runner
        .run_blocking()
        .context("failed to start async runtime")?;

    watch_info!(
        "Run done: {:?} batch of {} ({} pages, {:?}), watermark {:?}",
        report.kind,
        report.batch.len(),
        report.pages_fetched,
        report.stop_reason,
        report.watermark_after
    );
    if !report.state_saved {
        watch_warn!("State was not saved; the next run repeats this window");
    }
    if let DispatchOutcome::Failed(reason) = &report.dispatch {
        watch_warn!("Digest was not delivered: {}", reason);
    }
    Ok(())
}
