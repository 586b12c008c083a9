//! Clean command

use crate::cli::CleanArgs;
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use keystone_update::cleaner;

pub async fn run(args: CleanArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config_for(config, args.bundle_dir.as_deref())?;
    let layout = super::resolve_layout(&config)?;

    let spinner = output::spinner(&format!("Cleaning {}", layout.root.display()));
    let result = cleaner::clean(&layout).await;
    spinner.finish_and_clear();

    result.context("Failed to clean bundle directory")?;
    output::success("Stale bundle artifacts removed; configuration and torrents kept");
    Ok(())
}
