#![forbid(unsafe_code)]

mod cli;
mod config;
mod logging;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{debug, error};

use statbar_display::ActiveDisplay;
use statbar_items::Registry;
use statbar_process::{RunContext, SIGKILL, SIGTERM};

use crate::cli::Cli;
use crate::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    let log = cli.log.or(config.log);
    let suppress = cli.suppress || config.suppress;
    let kill_delay = cli.kill_delay.or(config.kill_delay).unwrap_or(5);
    logging::init(log.as_deref(), suppress)?;

    let stop = statbar_process::signal::install().context("installing signal handlers")?;
    let mut run = RunContext::new(stop);

    let mut display = ActiveDisplay::default();
    if let Some((name, line)) = &config.display
        && let Err(err) = display.select(name, line, &mut run)
    {
        // Bad display directives are not fatal; keep the standard driver.
        error!(display = %name, %err, "failed to set display");
    }

    let mut items = Registry::new();
    for item in &config.items {
        match statbar_items::create(&item.name, &item.line, item.block.as_deref(), &mut run) {
            Ok(item) => items.add(item),
            Err(err) => error!(item = %item.name, %err, "failed to create item"),
        }
    }
    if items.is_empty() {
        bail!("no items configured");
    }

    display.start(&mut run).context("starting display")?;
    debug!(items = items.items().len(), "running");
    let outcome = statbar_runtime::run(&mut run, &mut items, &mut display);

    display.finish(&mut run);
    items.finish_all(&mut run);
    if kill_delay > 0 {
        run.procs.signal_all_and_wait(SIGTERM, kill_delay);
    }
    run.procs.signal_all_and_wait(SIGKILL, 0);

    outcome?;
    Ok(())
}
