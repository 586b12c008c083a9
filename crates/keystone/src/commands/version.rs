//! Version command

use crate::cli::VersionArgs;
use crate::version::VersionInfo;
use anyhow::Result;

pub fn run(args: VersionArgs) -> Result<()> {
    let info = VersionInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info.display());
        println!("Bundle:     {}", info.bundle_version);
    }

    Ok(())
}
