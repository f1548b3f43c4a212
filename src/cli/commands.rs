//! Command handlers for Jellyfin Fetcher CLI
//!
//! This module implements the command handlers that connect the CLI
//! arguments to the session, the Jellyfin client and the coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::app::coordinator::{spawn_signal_forwarder, spawn_ticker};
use crate::app::events::{AppEvent, EventReceiver};
use crate::app::session::{resolve_download_root, JsonFileStore, Session, Setting};
use crate::app::{inbox, Coordinator, Flow, JellyfinClient};
use crate::auth::{mask, prompt_setting, EnvOverrides};
use crate::cli::{tui, BrowseArgs, ConfigAction, ConfigArgs, GlobalArgs, ProgressConfig, ProgressDisplay};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// How long a cancelled transfer gets to clean up after quitting
const TRANSFER_CLEANUP_GRACE: Duration = Duration::from_secs(2);

/// Load the session from `--session` or the default location
///
/// Credentials from the environment are applied on top of the stored ones.
pub fn open_session(global: &GlobalArgs) -> Result<Session> {
    let store = match &global.session {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::default_location()?,
    };
    let session = Session::load(Box::new(store))?.with_overrides(EnvOverrides::from_env());
    info!("Using session {}", session.location());
    Ok(session)
}

/// Build a coordinator wired to a real Jellyfin client
fn build_coordinator(
    session: Session,
    config: &AppConfig,
) -> Result<(Coordinator, EventReceiver)> {
    let (client_config, navigator_config, queue_config) = config.to_runtime_config();
    let client = Arc::new(JellyfinClient::with_config(
        session.credentials(),
        client_config,
    )?);
    let (events, inbox) = inbox();

    let coordinator = Coordinator::new(
        session,
        client.clone(),
        client,
        navigator_config,
        queue_config,
        events,
    );
    Ok((coordinator, inbox))
}

/// Give a cancelled transfer time to remove its partial file
///
/// Returns as soon as the transfer reports back, or after the grace period.
pub(crate) async fn await_transfer_cleanup(inbox: &mut EventReceiver, had_transfer: bool) {
    if !had_transfer {
        return;
    }

    let deadline = tokio::time::Instant::now() + TRANSFER_CLEANUP_GRACE;
    loop {
        match tokio::time::timeout_at(deadline, inbox.recv()).await {
            Ok(Some(AppEvent::TransferFinished { item_id, .. })) => {
                debug!("Transfer of {} wound down", item_id);
                return;
            }
            Ok(Some(_)) => continue,
            Ok(None) => return,
            Err(_) => {
                warn!("Transfer did not stop within {:?}", TRANSFER_CLEANUP_GRACE);
                return;
            }
        }
    }
}

/// Handle the browse command
///
/// Runs the terminal UI until the user quits.
pub async fn handle_browse(args: BrowseArgs, global: &GlobalArgs, config: &AppConfig) -> Result<()> {
    let session = open_session(global)?;
    let (mut coordinator, inbox) = build_coordinator(session, config)?;

    for setting in args.requested_prompts() {
        coordinator.open_prompt(setting);
    }
    coordinator.start();
    if args.download {
        coordinator.open_downloads();
    }

    let tick_interval = config.queue.tick_interval;
    tui::run(coordinator, inbox, tick_interval).await
}

/// Handle the download command
///
/// Downloads the whole selection without the terminal UI, with progress
/// on stderr. Stops when nothing is left to do or on Ctrl-C.
pub async fn handle_download(global: &GlobalArgs, config: &AppConfig) -> Result<()> {
    let start_time = Instant::now();
    let session = open_session(global)?;

    if !session.credentials().is_complete() {
        return Err(AppError::generic(
            "Endpoint and API key are not configured. Run 'jellyfin_fetcher config setup' first.",
        ));
    }
    if session.selection().is_empty() {
        println!("Nothing is selected. Run 'jellyfin_fetcher browse' to pick items.");
        return Ok(());
    }

    info!(
        "Downloading {} selected items to {}",
        session.selection().len(),
        session.download_root().display()
    );

    let (mut coordinator, mut inbox) = build_coordinator(session, config)?;
    let events = coordinator.events().clone();
    let signals = spawn_signal_forwarder(events.clone());
    let ticker = spawn_ticker(events, config.queue.tick_interval);

    coordinator.open_downloads();

    let mut progress = ProgressDisplay::new(ProgressConfig {
        enable_progress_bars: !global.quiet,
        ..Default::default()
    });
    let mut progress_started = false;

    let outcome: Result<()> = loop {
        let Some(event) = inbox.recv().await else {
            break Ok(());
        };
        let had_transfer = coordinator
            .queue()
            .and_then(|queue| queue.active_item())
            .is_some();

        let flow = match coordinator.handle(event) {
            Ok(flow) => flow,
            Err(e) => break Err(e),
        };

        if let Some(error) = coordinator.take_catalog_error() {
            let hint = Setting::for_error(&error)
                .map(|setting| {
                    format!(
                        " Run 'jellyfin_fetcher config set {} <value>' to fix it.",
                        setting.key()
                    )
                })
                .unwrap_or_default();
            break Err(AppError::generic(format!("{}.{}", error, hint)));
        }

        if flow == Flow::Quit {
            await_transfer_cleanup(&mut inbox, had_transfer).await;
            println!("Interrupted.");
            break Ok(());
        }

        let Some(queue) = coordinator.queue() else {
            continue;
        };
        if !queue.is_loaded() {
            continue;
        }
        if !progress_started {
            progress.start(queue)?;
            progress_started = true;
        }
        progress.update(queue);
        if queue.is_settled() {
            break Ok(());
        }
    };

    ticker.abort();
    signals.abort();

    if progress_started {
        if let Some(queue) = coordinator.queue() {
            progress.finish(queue);
        }
    }
    info!("Download command finished in {:?}", start_time.elapsed());
    outcome
}

/// Handle settings management
pub async fn handle_config(args: ConfigArgs, global: &GlobalArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let session = open_session(global)?;
            show_settings(&session);
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let setting: Setting = key.parse()?;
            let mut session = open_session(global)?;
            session.set_setting(setting, &value)?;
            println!("{} saved.", setting.label());
            if let Some(variable) = session.overrides().overridden_by(setting) {
                println!("Note: {} is set and takes precedence.", variable);
            }
            Ok(())
        }
        ConfigAction::Setup => {
            let mut session = open_session(global)?;
            println!("Jellyfin Fetcher setup. Press Enter to keep the current value.");
            for setting in Setting::ALL {
                let current = if setting.is_secret() {
                    String::new()
                } else {
                    session.record().setting(setting).to_string()
                };
                let value = prompt_setting(setting, &current)?;
                if setting.is_secret() && value.is_empty() {
                    continue;
                }
                session.set_setting(setting, &value)?;
            }
            println!("Settings saved to {}", session.location());
            Ok(())
        }
        ConfigAction::Path => {
            let session_path = match &global.session {
                Some(path) => path.clone(),
                None => JsonFileStore::default_location()?.path().to_path_buf(),
            };
            println!("Session: {}", session_path.display());
            match &global.config {
                Some(path) => println!("Config:  {}", path.display()),
                None => println!("Config:  {}", AppConfig::default_config_path()?.display()),
            }
            let config = AppConfig::load(global.config.clone()).await?;
            println!("Log:     {}", config.logging.resolved_log_file()?.display());
            Ok(())
        }
    }
}

fn show_settings(session: &Session) {
    let record = session.record();
    let credentials = session.credentials();

    println!("Session file: {}", session.location());
    println!();
    println!("Endpoint:          {}", display_or_unset(&credentials.endpoint));
    println!("API key:           {}", display_or_unset(&mask(&credentials.api_key)));
    println!("User id:           {}", display_or_unset(&credentials.user_id));
    println!(
        "Download location: {} ({})",
        display_or_unset(&record.download_location),
        resolve_download_root(&record.download_location).display()
    );
    println!();
    println!("Selected items:    {}", session.selection().len());
    println!("Downloaded items:  {}", session.downloaded().len());

    let overridden: Vec<String> = Setting::ALL
        .iter()
        .filter_map(|setting| {
            session
                .overrides()
                .overridden_by(*setting)
                .map(|variable| format!("{} ({})", setting.label(), variable))
        })
        .collect();
    if !overridden.is_empty() {
        println!();
        println!("Set by environment: {}", overridden.join(", "));
    }
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
