//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keystone - install and update the Keystone runtime bundle
#[derive(Parser, Debug)]
#[command(name = "keystone")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to installer.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the bundle unless it is already current
    Install(InstallArgs),

    /// Show the state of the installed bundle
    Status(StatusArgs),

    /// Remove stale bundle artifacts, keeping user data
    Clean(CleanArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show version information
    Version(VersionArgs),
}

// Install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Bundle directory (overrides configuration)
    #[arg(long)]
    pub bundle_dir: Option<PathBuf>,

    /// Skip TLS certificate validation for the download
    #[arg(long)]
    pub insecure: bool,

    /// Print events as JSON lines instead of a progress bar
    #[arg(long)]
    pub json: bool,
}

// Status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Bundle directory (overrides configuration)
    #[arg(long)]
    pub bundle_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Bundle directory (overrides configuration)
    #[arg(long)]
    pub bundle_dir: Option<PathBuf>,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_install_flags() {
        let cli = Cli::try_parse_from([
            "keystone",
            "-vv",
            "install",
            "--bundle-dir",
            "/opt/keystone/core",
            "--insecure",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.bundle_dir, Some(PathBuf::from("/opt/keystone/core")));
                assert!(args.insecure);
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["keystone", "status", "--config", "/etc/keystone.yaml"]).unwrap();
        assert_eq!(cli.config, Some(Utf8PathBuf::from("/etc/keystone.yaml")));
    }

    #[test]
    fn test_config_requires_subcommand() {
        assert!(Cli::try_parse_from(["keystone", "config"]).is_err());
        assert!(Cli::try_parse_from(["keystone", "config", "show", "--json"]).is_ok());
    }
}
