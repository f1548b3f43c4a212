//! Jellyfin Fetcher CLI application
//!
//! Terminal browser and sequential downloader for Jellyfin media catalogs.
//! Without a subcommand the interactive browser starts.

use std::fs::{self, OpenOptions};
use std::process;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use jellyfin_fetcher::cli::{handle_browse, handle_config, handle_download, Cli, Commands};
use jellyfin_fetcher::config::AppConfig;
use jellyfin_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let created = AppConfig::initialize_first_run().await?;
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("Jellyfin Fetcher v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = created {
        info!("Created default configuration at {}", path.display());
    }

    match cli.command() {
        Commands::Browse(args) => {
            info!("Executing browse command");
            handle_browse(args, &cli.global, &config).await
        }
        Commands::Download => {
            info!("Executing download command");
            handle_download(&cli.global, &config).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, &cli.global).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the config level
///
/// The terminal UI owns the screen, so the browser logs to a file.
fn init_logging(cli: &Cli, config: &AppConfig) {
    let global = &cli.global;
    let level = if global.quiet || global.verbose || global.very_verbose {
        cli.log_level().to_string()
    } else {
        config.logging.level.clone()
    };

    let mut filter = EnvFilter::from_default_env();
    match format!("jellyfin_fetcher={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring log level '{}': {}", level, e),
    }

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(global.very_verbose);

    if !cli.is_interactive() {
        builder.with_writer(std::io::stderr).init();
        return;
    }

    let log_file = config.logging.resolved_log_file().ok().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(&path).ok()
    });

    match log_file {
        Some(file) => builder
            .with_ansi(false)
            .with_level(true)
            .with_writer(Mutex::new(file))
            .init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}
