//! Command-line interface components
//!
//! This module contains CLI-specific code for the Jellyfin Fetcher
//! application: argument parsing, the terminal browser, headless progress
//! display and settings management.

pub mod args;
pub mod commands;
pub mod progress;
pub mod tui;

pub use args::{BrowseArgs, Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs};
pub use commands::{handle_browse, handle_config, handle_download, open_session};
pub use progress::{progress_line, ProgressConfig, ProgressDisplay};
pub use tui::map_key;
