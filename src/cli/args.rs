//! Command-line argument parsing for Jellyfin Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Without a
//! subcommand the interactive browser starts.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::session::Setting;

/// Jellyfin Fetcher - browse a Jellyfin catalog and download from it
#[derive(Parser, Debug)]
#[command(
    name = "jellyfin_fetcher",
    version,
    about = "Browse a Jellyfin media catalog and download selected items",
    long_about = "A terminal browser for Jellyfin servers. Mark folders or items for download,
then fetch them one at a time with progress tracking. The selection and the list of
downloaded files survive restarts."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands (default: browse)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Session file path (selection, downloads and credentials)
    #[arg(long, global = true, value_name = "FILE")]
    pub session: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Browse the catalog interactively (default)
    Browse(BrowseArgs),

    /// Download the current selection without the interactive browser
    Download,

    /// Show or change stored settings
    Config(ConfigArgs),
}

/// Arguments for the browse command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseArgs {
    /// Open the download list immediately
    #[arg(short, long)]
    pub download: bool,

    /// Ask for the API key on start
    #[arg(short = 'k', long)]
    pub ask_api_key: bool,

    /// Ask for the user id on start
    #[arg(short = 'u', long)]
    pub ask_user_id: bool,

    /// Ask for the API endpoint on start
    #[arg(short = 'e', long)]
    pub ask_endpoint: bool,
}

impl BrowseArgs {
    /// Settings to prompt for on start, in prompt order
    pub fn requested_prompts(&self) -> Vec<Setting> {
        let mut prompts = Vec::new();
        if self.ask_endpoint {
            prompts.push(Setting::Endpoint);
        }
        if self.ask_api_key {
            prompts.push(Setting::ApiKey);
        }
        if self.ask_user_id {
            prompts.push(Setting::UserId);
        }
        prompts
    }
}

/// Arguments for settings management
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Settings actions
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show stored settings and where they come from
    Show,

    /// Change one setting
    Set {
        /// Setting name: endpoint, api-key, user-id, download-location
        key: String,

        /// New value
        value: String,
    },

    /// Prompt for every setting
    Setup,

    /// Print the locations of the session and config files
    Path,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, `browse` when none was given
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Browse(BrowseArgs::default()))
    }

    /// Whether the terminal UI will own the screen
    pub fn is_interactive(&self) -> bool {
        matches!(self.command(), Commands::Browse(_))
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_browse() {
        let cli = Cli::try_parse_from(["jellyfin_fetcher"]).unwrap();
        assert!(matches!(cli.command(), Commands::Browse(args) if args == BrowseArgs::default()));
        assert!(cli.is_interactive());
    }

    #[test]
    fn test_browse_flags() {
        let cli = Cli::try_parse_from([
            "jellyfin_fetcher",
            "browse",
            "--download",
            "--ask-api-key",
            "--ask-endpoint",
        ])
        .unwrap();

        let Commands::Browse(args) = cli.command() else {
            panic!("expected browse");
        };
        assert!(args.download);
        assert_eq!(
            args.requested_prompts(),
            vec![Setting::Endpoint, Setting::ApiKey]
        );
    }

    #[test]
    fn test_config_set_parses() {
        let cli =
            Cli::try_parse_from(["jellyfin_fetcher", "config", "set", "endpoint", "http://h"])
                .unwrap();
        match cli.command() {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Set { key, value },
            }) => {
                assert_eq!(key, "endpoint");
                assert_eq!(value, "http://h");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(!cli.is_interactive());
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli {
            global: GlobalArgs {
                quiet: true,
                ..Default::default()
            },
            command: Some(Commands::Download),
        };

        let cli_verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                ..Default::default()
            },
            command: Some(Commands::Download),
        };

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
    }
}
