mod config;
mod errors;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::loader::{load_snapshot, load_text_dump};
use crate::pipeline::{build_snapshot, publish, Pipeline, RunOutcome};
use crate::scraper::{ChromeReportSource, NoDelay};
use crate::storage::{SnapshotStore, WriteOutcome};

#[derive(Parser)]
#[command(name = "sheep-index", about = "Weekly sheep market index scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Snapshot file (overrides storage.output_path)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape the report and update the snapshot if it changed
    Run {
        /// Report page URL (overrides scraper.url)
        #[arg(long)]
        url: Option<String>,

        /// Seconds to wait for the embedded report to render
        #[arg(long)]
        render_wait: Option<u64>,

        /// Skip the render wait entirely (report may be incomplete)
        #[arg(long, conflicts_with = "render_wait")]
        no_render_wait: bool,

        /// Also write the raw frame text to this file
        #[arg(long)]
        dump_text: Option<PathBuf>,
    },

    /// Parse a saved frame-text dump instead of launching a browser
    Parse {
        file: PathBuf,

        /// Print the snapshot without touching the snapshot file
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the stored snapshot
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "sheep_index=info,warn",
        1 => "sheep_index=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(output) = cli.output {
        config.storage.output_path = output;
    }

    match cli.command {
        Command::Run {
            url,
            render_wait,
            no_render_wait,
            dump_text,
        } => {
            if let Some(url) = url {
                config.scraper.url = url;
            }
            if let Some(secs) = render_wait {
                config.scraper.render_wait_secs = secs;
            }
            if dump_text.is_some() {
                config.pipeline.dump_raw_text = dump_text;
            }

            let _t = utils::Timer::start("Sheep index scrape");
            let mut source = ChromeReportSource::new(&config.scraper)?;
            if no_render_wait {
                source = source.with_waiter(NoDelay);
            }

            let outcome = Pipeline::new(config, source).run().await?;
            report_outcome(&outcome);
        }

        Command::Parse { file, dry_run } => {
            let text = load_text_dump(&file)?;

            if dry_run {
                let (snapshot, _) = build_snapshot(&config.pipeline, &text, Utc::now())?;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            let store = SnapshotStore::new(&config.storage.output_path);
            let previous = load_snapshot(store.path())?;
            let outcome = publish(&config.pipeline, &store, &text, previous.as_ref(), Utc::now())?;
            report_outcome(&outcome);
        }

        Command::Show => {
            let path = &config.storage.output_path;
            let Some(snapshot) = load_snapshot(path)? else {
                println!("No snapshot at {:?} — run `sheep-index run` first.", path);
                return Ok(());
            };

            println!("─────────────────────────────────────────────────────────────");
            println!("  Sheep Index — updated {}", snapshot.updated_at);
            println!("─────────────────────────────────────────────────────────────");
            for (label, row) in snapshot.slots() {
                match row {
                    Some(row) => println!("  {:<16}: {}", label, utils::row_preview(row)),
                    None => println!("  {:<16}: —", label),
                }
            }
            println!("─────────────────────────────────────────────────────────────");
        }
    }

    Ok(())
}

fn report_outcome(outcome: &RunOutcome) {
    if let Some(msg) = &outcome.warning {
        warn!("Finished with warning: {}", msg);
    }
    let filled = outcome.snapshot.filled_slots();
    match &outcome.write {
        WriteOutcome::Written(path) => info!(
            "Done: {} rows parsed, {}/4 slots filled, snapshot written to {:?}",
            outcome.rows_parsed, filled, path
        ),
        WriteOutcome::Unchanged => info!(
            "Done: {} rows parsed, {}/4 slots filled, no changes",
            outcome.rows_parsed, filled
        ),
    }
}
