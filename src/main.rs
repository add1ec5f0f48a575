//! Binary entrypoint: attach carousels to an in-memory document and drive
//! them from stdin.
//!
//! Delegates all logic to the library crate.

use std::path::PathBuf;

use anyhow::{Context, Result};
use carousel::config::Configuration;
use carousel::events::{READY, SLIDE_AFTER};
use carousel::gesture::Capabilities;
use carousel::surface::{DisplaySurface, MemoryDocument};
use carousel::tasks::{console, driver};
use clap::{ArgAction, Parser};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "carousel", version, about = "Headless carousel driven from stdin")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "carousel.yaml")]
    config: PathBuf,

    /// Override the attach selector
    #[arg(long, value_name = "SELECTOR")]
    selector: Option<String>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("carousel={level}")
            .parse()
            .context("building log filter")?,
    );
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("validating configuration")?;
    let selector = cli.selector.as_deref().unwrap_or(&cfg.selector);

    let document = MemoryDocument::from_elements(&cfg.carousels);
    let capabilities = Capabilities {
        passive_listeners: cfg.passive_listeners,
    };
    let carousels = carousel::attach_all(&document, selector, &cfg.options, capabilities)
        .context("attaching carousels")?;
    if carousels.is_empty() {
        warn!(selector, "no carousel matched; nothing to drive");
        return Ok(());
    }
    info!(count = carousels.len(), selector, "attached carousels");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();
    let mut drivers = Vec::with_capacity(carousels.len());
    for (idx, mut carousel) in carousels.into_iter().enumerate() {
        carousel.events_mut().on(READY, move |n| {
            info!(carousel = idx, slide = %n.data.slide, "ready");
            Ok(())
        });
        carousel.events_mut().on(SLIDE_AFTER, move |n| {
            info!(carousel = idx, slide = %n.data.slide, index = n.data.index, "now showing");
            Ok(())
        });
        carousel
            .initialize(tokio::time::Instant::now().into_std())
            .with_context(|| format!("initializing carousel {idx}"))?;

        let (tx, rx) = mpsc::channel(16);
        drivers.push(tx);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let finished = driver::run(carousel, rx, cancel)
                .await
                .with_context(|| format!("carousel {idx} driver failed"))?;
            info!(
                carousel = idx,
                phase = ?finished.phase(),
                order = ?finished.surface().labels_by_order(),
                slides = finished.surface().slides().len(),
                "driver finished"
            );
            anyhow::Ok(())
        });
    }

    let input = BufReader::new(tokio::io::stdin());
    console::run(input, drivers, cancel.clone()).await?;
    cancel.cancel();

    while let Some(joined) = tasks.join_next().await {
        joined.context("driver task panicked")??;
    }
    Ok(())
}
