//! Status command

use crate::cli::StatusArgs;
use crate::output;
use anyhow::Result;
use camino::Utf8Path;
use keystone_core::BundleState;
use keystone_update::{probe, BUNDLE_VERSION};
use serde_json::json;

pub fn run(args: StatusArgs, config: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config_for(config, args.bundle_dir.as_deref())?;
    let layout = super::resolve_layout(&config)?;
    let state = probe::inspect(&layout, BUNDLE_VERSION);

    if args.json {
        let report = json!({
            "root": layout.root,
            "expected_version": BUNDLE_VERSION,
            "status": state,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header("Bundle status");
    output::kv("Directory", &layout.root.display().to_string());
    output::kv("Expected version", BUNDLE_VERSION);
    output::kv("State", &state.to_string());

    match state {
        BundleState::Current => output::success("Bundle is installed and current"),
        BundleState::Absent => output::info("Bundle is not installed; run `keystone install`"),
        _ => output::warning("Bundle needs to be reinstalled; run `keystone install`"),
    }

    Ok(())
}
