//! Event loop state and command dispatch
//!
//! The [`Coordinator`] owns the [`Session`], the [`HierarchicalNavigator`]
//! and, while the download screen is open, the [`DownloadQueue`]. The
//! front end (terminal UI or headless command) feeds every [`AppEvent`]
//! from the inbox into [`Coordinator::handle`], one at a time, and renders
//! from the accessors in between.
//!
//! Catalog classification errors open the prompt for the setting that
//! fixes them. Session write failures are returned and end the loop.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jellyfin_fetcher::app::coordinator::{Coordinator, Flow};
//! use jellyfin_fetcher::app::events::inbox;
//! use jellyfin_fetcher::app::navigator::NavigatorConfig;
//! use jellyfin_fetcher::app::queue::QueueConfig;
//! use jellyfin_fetcher::app::session::{JsonFileStore, Session};
//! use jellyfin_fetcher::app::JellyfinClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::load(Box::new(JsonFileStore::default_location()?))?;
//! let client = Arc::new(JellyfinClient::new(session.credentials())?);
//! let (events, mut inbox) = inbox();
//!
//! let mut coordinator = Coordinator::new(
//!     session,
//!     client.clone(),
//!     client,
//!     NavigatorConfig::default(),
//!     QueueConfig::default(),
//!     events,
//! );
//! coordinator.start();
//!
//! while let Some(event) = inbox.recv().await {
//!     if coordinator.handle(event)? == Flow::Quit {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod signals;

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::catalog::{CatalogCache, CatalogSource};
use crate::app::events::{AppEvent, Command, EventSender};
use crate::app::navigator::{HierarchicalNavigator, NavigatorConfig, ToggleOutcome};
use crate::app::queue::{DownloadQueue, DownloadTask, QueueConfig, Transferer};
use crate::app::session::{Session, Setting};
use crate::errors::{AppError, CatalogError, Result};

pub use signals::{spawn_signal_forwarder, spawn_ticker};

/// Which list has the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Browser,
    Downloads,
}

/// Whether the loop keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// An open settings prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub setting: Setting,
    pub buffer: String,
}

impl Prompt {
    /// Text to render for the buffer; secrets are masked
    pub fn display_value(&self) -> String {
        if self.setting.is_secret() {
            "*".repeat(self.buffer.chars().count())
        } else {
            self.buffer.clone()
        }
    }
}

/// Owner of all loop-side state
pub struct Coordinator {
    session: Session,
    navigator: HierarchicalNavigator,
    queue: Option<DownloadQueue>,
    screen: Screen,
    prompt: Option<Prompt>,
    prompt_backlog: VecDeque<Setting>,
    info: String,
    task_cursor: usize,
    last_catalog_error: Option<CatalogError>,
    source: Arc<dyn CatalogSource>,
    transferer: Arc<dyn Transferer>,
    queue_config: QueueConfig,
    events: EventSender,
}

impl Coordinator {
    pub fn new(
        session: Session,
        source: Arc<dyn CatalogSource>,
        transferer: Arc<dyn Transferer>,
        navigator_config: NavigatorConfig,
        queue_config: QueueConfig,
        events: EventSender,
    ) -> Self {
        let navigator =
            HierarchicalNavigator::new(CatalogCache::new(Arc::clone(&source)), navigator_config);

        Self {
            session,
            navigator,
            queue: None,
            screen: Screen::Browser,
            prompt: None,
            prompt_backlog: VecDeque::new(),
            info: String::new(),
            task_cursor: 0,
            last_catalog_error: None,
            source,
            transferer,
            queue_config,
            events,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn navigator(&self) -> &HierarchicalNavigator {
        &self.navigator
    }

    /// The download list, while the download screen is open
    pub fn queue(&self) -> Option<&DownloadQueue> {
        self.queue.as_ref()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    /// One-line status message for the bottom bar
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Cursor row in the download list
    pub fn task_cursor(&self) -> usize {
        self.task_cursor
    }

    /// Task under the download list cursor
    pub fn focused_task(&self) -> Option<&DownloadTask> {
        self.queue
            .as_ref()
            .and_then(|queue| queue.tasks().get(self.task_cursor))
    }

    /// Sender for the inbox this coordinator reports into
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Take the most recent catalog failure, if any
    pub fn take_catalog_error(&mut self) -> Option<CatalogError> {
        self.last_catalog_error.take()
    }

    /// Load the first columns, or ask for whatever is missing to do so
    pub fn start(&mut self) {
        let credentials = self.session.credentials();
        if credentials.endpoint.is_empty() {
            self.open_prompt(Setting::Endpoint);
        } else if credentials.api_key.is_empty() {
            self.open_prompt(Setting::ApiKey);
        } else {
            self.navigator.refresh(&self.events);
        }
    }

    /// Open the prompt for `setting`, prefilled with its stored value
    ///
    /// While another prompt is open the request waits its turn.
    pub fn open_prompt(&mut self, setting: Setting) {
        if let Some(open) = &self.prompt {
            if open.setting != setting && !self.prompt_backlog.contains(&setting) {
                self.prompt_backlog.push_back(setting);
            }
            return;
        }
        if let Some(variable) = self.session.overrides().overridden_by(setting) {
            self.info = format!("{} is set by {}", setting.label(), variable);
        }
        let buffer = if setting.is_secret() {
            String::new()
        } else {
            self.session.record().setting(setting).to_string()
        };
        self.prompt = Some(Prompt { setting, buffer });
    }

    /// Switch to the download list and build it from the session
    pub fn open_downloads(&mut self) {
        if let Some(mut previous) = self.queue.take() {
            previous.cancel_all();
        }

        let mut queue = DownloadQueue::new(
            Arc::clone(&self.source),
            Arc::clone(&self.transferer),
            self.queue_config.clone(),
            self.events.clone(),
        );
        queue.activate(&self.session);

        self.queue = Some(queue);
        self.screen = Screen::Downloads;
        self.task_cursor = 0;
        self.info = "Loading download list".to_string();
    }

    /// Tear down the download list and return to the browser
    pub fn close_downloads(&mut self) {
        if let Some(mut queue) = self.queue.take() {
            queue.cancel_all();
        }
        self.screen = Screen::Browser;
        self.info.clear();
        // Downloaded markers may have changed
        self.navigator.refresh(&self.events);
    }

    /// Apply one event
    ///
    /// # Errors
    ///
    /// Returns an error only for failures the session cannot survive, such
    /// as a session write that kept failing.
    pub fn handle(&mut self, event: AppEvent) -> Result<Flow> {
        match event {
            AppEvent::Input(command) => return self.handle_command(command),
            AppEvent::ColumnsDerived { request_id, result } => {
                if let Err(e) = self.navigator.apply_derived(request_id, result) {
                    self.report_catalog_error(e);
                }
            }
            AppEvent::SelectionPropagated {
                job_id,
                item_id,
                add,
                result,
            } => {
                debug!("Descendants of {} collected", item_id);
                let outcome = self.navigator.apply_propagation(
                    job_id,
                    add,
                    result,
                    &mut self.session,
                    &self.events,
                );
                self.recover(outcome)?;
            }
            AppEvent::QueueLoaded { generation, result } => {
                if let Some(queue) = self.queue.as_mut() {
                    match queue.load(generation, result, &self.session) {
                        Ok(()) => {
                            let summary = queue.summary();
                            self.info = format!(
                                "{} items, {} downloaded",
                                summary.total, summary.completed
                            );
                        }
                        Err(e) => self.report_catalog_error(e),
                    }
                }
            }
            AppEvent::TransferFinished {
                item_id,
                attempt,
                outcome,
            } => {
                if let Some(queue) = self.queue.as_mut() {
                    queue.handle_finished(&item_id, attempt, outcome, &mut self.session)?;
                }
            }
            AppEvent::Tick => {
                if let Some(queue) = self.queue.as_mut() {
                    queue.tick(&self.session);
                }
            }
            AppEvent::Shutdown => {
                self.shutdown();
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_command(&mut self, command: Command) -> Result<Flow> {
        if self.prompt.is_some() {
            return self.handle_prompt_command(command);
        }

        match command {
            Command::MoveFocus(delta) => {
                if self.screen == Screen::Browser {
                    self.navigator.move_focus(delta);
                }
            }
            Command::MoveCursor(delta) => match self.screen {
                Screen::Browser => {
                    let column = self.navigator.focused_column();
                    self.navigator.move_cursor(column, delta, &self.events);
                }
                Screen::Downloads => self.move_task_cursor(delta),
            },
            Command::ToggleSelection => self.toggle_focused()?,
            Command::DeleteDownloaded => self.delete_focused()?,
            Command::OpenDownloads => self.open_downloads(),
            Command::CloseDownloads => self.close_downloads(),
            Command::StartOrCancel => self.start_or_cancel_focused(),
            Command::EditSetting(setting) => self.open_prompt(setting),
            Command::PromptInput(_)
            | Command::PromptBackspace
            | Command::PromptSubmit
            | Command::PromptCancel => {}
            Command::Quit => {
                self.shutdown();
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_prompt_command(&mut self, command: Command) -> Result<Flow> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(Flow::Continue);
        };

        match command {
            Command::PromptInput(c) => prompt.buffer.push(c),
            Command::PromptBackspace => {
                prompt.buffer.pop();
            }
            Command::PromptCancel => {
                self.prompt = None;
                self.open_next_prompt();
            }
            Command::PromptSubmit => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_setting(prompt.setting, &prompt.buffer)?;
                }
                self.open_next_prompt();
            }
            Command::Quit => {
                self.shutdown();
                return Ok(Flow::Quit);
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn open_next_prompt(&mut self) {
        if let Some(setting) = self.prompt_backlog.pop_front() {
            self.open_prompt(setting);
        }
    }

    fn submit_setting(&mut self, setting: Setting, value: &str) -> Result<()> {
        self.session.set_setting(setting, value)?;
        info!("{} updated", setting.label());

        self.info = match self.session.overrides().overridden_by(setting) {
            Some(variable) => format!("Saved, but {} applies for this run", variable),
            None => format!("{} saved", setting.label()),
        };

        if setting.requires_reload() {
            self.source.update_credentials(&self.session.credentials());
            if let Some(mut queue) = self.queue.take() {
                queue.cancel_all();
                self.screen = Screen::Browser;
            }
            self.navigator.reload(&self.events);
        }
        Ok(())
    }

    fn toggle_focused(&mut self) -> Result<()> {
        if self.screen != Screen::Browser {
            return Ok(());
        }
        let Some(item) = self.navigator.focused_item() else {
            return Ok(());
        };
        let (id, is_folder, title) = (item.id.clone(), item.is_folder, item.name.clone());

        let outcome =
            self.navigator
                .toggle_selection(&id, is_folder, &mut self.session, &self.events)?;
        self.info = match outcome {
            ToggleOutcome::Applied { selected: true } => format!("Selected {}", title),
            ToggleOutcome::Applied { selected: false } => format!("Deselected {}", title),
            ToggleOutcome::Propagating { selected: true } => {
                format!("Selecting everything in {}", title)
            }
            ToggleOutcome::Propagating { selected: false } => {
                format!("Deselecting everything in {}", title)
            }
            ToggleOutcome::Queued => format!(
                "{} waits for {} earlier selection(s)",
                title,
                self.navigator.pending_toggles()
            ),
        };
        Ok(())
    }

    fn delete_focused(&mut self) -> Result<()> {
        match self.screen {
            Screen::Browser => {
                let Some(item) = self.navigator.focused_item() else {
                    return Ok(());
                };
                let id = item.id.clone();
                let outcome = self
                    .navigator
                    .delete_downloaded(&id, &mut self.session, &self.events)
                    .map_err(AppError::from);
                if let Some(Some(path)) = self.recover(outcome)? {
                    self.info = format!("Deleted {}", path.display());
                }
            }
            Screen::Downloads => {
                let Some(id) = self.focused_task().map(|task| task.item_id().to_string()) else {
                    return Ok(());
                };
                let Some(queue) = self.queue.as_mut() else {
                    return Ok(());
                };
                let outcome = queue.retry_or_delete(&id, &mut self.session);
                if self.recover(outcome)? == Some(true) {
                    self.info = "Local file deleted".to_string();
                }
            }
        }
        Ok(())
    }

    fn start_or_cancel_focused(&mut self) {
        if self.screen != Screen::Downloads {
            return;
        }
        let Some(task) = self.focused_task() else {
            return;
        };
        let id = task.item_id().to_string();
        let downloading = task.status.is_downloading();
        let Some(queue) = self.queue.as_mut() else {
            return;
        };

        let result = if downloading {
            queue.cancel(&id)
        } else {
            queue.start(&id, &self.session)
        };
        if let Err(e) = result {
            self.info = e.to_string();
        }
    }

    fn move_task_cursor(&mut self, delta: i32) {
        let count = self.queue.as_ref().map_or(0, |queue| queue.tasks().len());
        if count == 0 {
            self.task_cursor = 0;
            return;
        }
        let target = self.task_cursor as i64 + delta as i64;
        self.task_cursor = target.clamp(0, count as i64 - 1) as usize;
    }

    /// Turn recoverable failures into status messages; keep fatal ones
    fn recover<T>(&mut self, outcome: Result<T>) -> Result<Option<T>> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(AppError::Catalog(e)) => {
                self.report_catalog_error(e);
                Ok(None)
            }
            Err(e) if e.is_recoverable() => {
                warn!("{} error: {}", e.category(), e);
                self.info = e.to_string();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn report_catalog_error(&mut self, error: CatalogError) {
        warn!("Catalog request failed: {}", error);
        self.info = error.to_string();
        if let Some(setting) = Setting::for_error(&error) {
            self.open_prompt(setting);
        }
        self.last_catalog_error = Some(error);
    }

    fn shutdown(&mut self) {
        if let Some(queue) = self.queue.as_mut() {
            info!("Cancelling downloads before exit");
            queue.cancel_all();
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("screen", &self.screen)
            .field("prompt", &self.prompt.as_ref().map(|p| p.setting))
            .field("navigator", &self.navigator)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{inbox, EventReceiver};
    use crate::app::models::CatalogItem;
    use crate::app::queue::{ConfigPresets, TransferHandle};
    use crate::app::session::{MemoryStore, SessionRecord};
    use crate::auth::Credentials;
    use crate::errors::CatalogResult;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct StubCatalog {
        failure: Mutex<Option<CatalogError>>,
        credentials: Mutex<Option<Credentials>>,
    }

    #[async_trait]
    impl CatalogSource for StubCatalog {
        async fn fetch_children(&self, parent_id: &str) -> CatalogResult<Vec<CatalogItem>> {
            if let Some(e) = self.failure.lock().unwrap().clone() {
                return Err(e);
            }
            Ok(match parent_id {
                "" => vec![
                    CatalogItem::film("m1", "Alien"),
                    CatalogItem::film("m2", "Heat"),
                ],
                _ => Vec::new(),
            })
        }

        async fn fetch_metadata(&self, ids: &[String]) -> CatalogResult<Vec<CatalogItem>> {
            Ok(ids.iter().map(|id| CatalogItem::film(id, id)).collect())
        }

        fn update_credentials(&self, credentials: &Credentials) {
            *self.credentials.lock().unwrap() = Some(credentials.clone());
        }
    }

    struct NeverTransfer;

    impl Transferer for NeverTransfer {
        fn begin_transfer(&self, _item: &CatalogItem, _destination: &Path) -> TransferHandle {
            let (handle, reporter) = TransferHandle::channel();
            tokio::spawn(async move {
                let mut reporter = reporter;
                reporter.cancelled().await;
                reporter.finish(Err(crate::errors::TransferError::Cancelled));
            });
            handle
        }
    }

    fn record() -> SessionRecord {
        SessionRecord {
            api_key: "key".to_string(),
            api_endpoint: "http://jellyfin.local".to_string(),
            download_location: std::env::temp_dir()
                .join("jf-coordinator-tests")
                .display()
                .to_string(),
            ..Default::default()
        }
    }

    fn setup(record: SessionRecord) -> (Coordinator, EventReceiver, Arc<StubCatalog>, MemoryStore) {
        let store = MemoryStore::with_record(record);
        let session = Session::load(Box::new(store.clone())).unwrap();
        let catalog = Arc::new(StubCatalog::default());
        let (events, inbox) = inbox();
        let coordinator = Coordinator::new(
            session,
            catalog.clone(),
            Arc::new(NeverTransfer),
            NavigatorConfig::default(),
            ConfigPresets::testing(),
            events,
        );
        (coordinator, inbox, catalog, store)
    }

    async fn pump_until(
        coordinator: &mut Coordinator,
        inbox: &mut EventReceiver,
        mut done: impl FnMut(&Coordinator) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(coordinator) {
                let event = inbox.recv().await.unwrap();
                coordinator.handle(event).unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_start_loads_root_column() {
        let (mut coordinator, mut inbox, _, _) = setup(record());
        coordinator.start();

        pump_until(&mut coordinator, &mut inbox, |c| {
            !c.navigator().columns().is_empty()
        })
        .await;
        assert_eq!(coordinator.navigator().focused_item().unwrap().id, "m1");
    }

    #[tokio::test]
    async fn test_missing_endpoint_opens_prompt() {
        let (mut coordinator, _inbox, _, _) = setup(SessionRecord::default());
        coordinator.start();
        assert_eq!(coordinator.prompt().unwrap().setting, Setting::Endpoint);
    }

    #[tokio::test]
    async fn test_invalid_credentials_open_api_key_prompt() {
        let (mut coordinator, mut inbox, catalog, _) = setup(record());
        *catalog.failure.lock().unwrap() = Some(CatalogError::InvalidCredentials);
        coordinator.start();

        pump_until(&mut coordinator, &mut inbox, |c| c.prompt().is_some()).await;
        assert_eq!(coordinator.prompt().unwrap().setting, Setting::ApiKey);
        assert_eq!(coordinator.info(), "Incorrect API key");
        assert_eq!(
            coordinator.take_catalog_error(),
            Some(CatalogError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_prompt_submit_persists_and_reloads() {
        let (mut coordinator, mut inbox, catalog, store) = setup(record());
        coordinator.open_prompt(Setting::Endpoint);
        assert_eq!(coordinator.prompt().unwrap().buffer, "http://jellyfin.local");

        for _ in 0.."http://jellyfin.local".len() {
            coordinator
                .handle(AppEvent::Input(Command::PromptBackspace))
                .unwrap();
        }
        for c in "http://other/".chars() {
            coordinator
                .handle(AppEvent::Input(Command::PromptInput(c)))
                .unwrap();
        }
        coordinator
            .handle(AppEvent::Input(Command::PromptSubmit))
            .unwrap();

        assert!(coordinator.prompt().is_none());
        assert_eq!(store.last_persisted().unwrap().api_endpoint, "http://other");
        assert_eq!(
            catalog.credentials.lock().unwrap().as_ref().unwrap().endpoint,
            "http://other"
        );

        pump_until(&mut coordinator, &mut inbox, |c| {
            !c.navigator().columns().is_empty()
        })
        .await;
    }

    #[tokio::test]
    async fn test_toggle_and_open_downloads() {
        let (mut coordinator, mut inbox, _, store) = setup(record());
        coordinator.start();
        pump_until(&mut coordinator, &mut inbox, |c| {
            !c.navigator().columns().is_empty()
        })
        .await;

        coordinator
            .handle(AppEvent::Input(Command::ToggleSelection))
            .unwrap();
        assert!(coordinator.session().selection().contains("m1"));
        assert_eq!(store.persist_count(), 1);

        coordinator
            .handle(AppEvent::Input(Command::OpenDownloads))
            .unwrap();
        assert_eq!(coordinator.screen(), Screen::Downloads);

        pump_until(&mut coordinator, &mut inbox, |c| {
            c.queue().is_some_and(|q| q.active_item().is_some())
        })
        .await;
        assert_eq!(coordinator.focused_task().unwrap().item_id(), "m1");

        coordinator
            .handle(AppEvent::Input(Command::CloseDownloads))
            .unwrap();
        assert!(coordinator.queue().is_none());
        assert_eq!(coordinator.screen(), Screen::Browser);
    }

    #[tokio::test]
    async fn test_quit_and_shutdown_end_loop() {
        let (mut coordinator, _inbox, _, _) = setup(record());
        assert_eq!(
            coordinator.handle(AppEvent::Input(Command::Quit)).unwrap(),
            Flow::Quit
        );
        assert_eq!(coordinator.handle(AppEvent::Shutdown).unwrap(), Flow::Quit);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let (mut coordinator, mut inbox, _, store) = setup(record());
        coordinator.start();
        pump_until(&mut coordinator, &mut inbox, |c| {
            !c.navigator().columns().is_empty()
        })
        .await;

        store.fail_writes(true);
        let result = coordinator.handle(AppEvent::Input(Command::ToggleSelection));
        assert!(matches!(result, Err(AppError::Store(_))));
        assert!(coordinator.session().selection().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_reports_and_keeps_running() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("Alien.mkv");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("inner"), b"x").unwrap();

        let mut stored = record();
        stored.downloaded.insert("m1", &blocker);
        let (mut coordinator, mut inbox, _, _) = setup(stored);
        coordinator.start();
        pump_until(&mut coordinator, &mut inbox, |c| {
            !c.navigator().columns().is_empty()
        })
        .await;

        let flow = coordinator
            .handle(AppEvent::Input(Command::DeleteDownloaded))
            .unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(coordinator.info().contains("Could not delete"));
        assert!(coordinator.session().downloaded().contains("m1"));
        assert!(blocker.exists());
    }

    #[tokio::test]
    async fn test_prompts_wait_their_turn() {
        let (mut coordinator, _inbox, _, _) = setup(record());
        coordinator.open_prompt(Setting::Endpoint);
        coordinator.open_prompt(Setting::ApiKey);
        coordinator.open_prompt(Setting::Endpoint);
        assert_eq!(coordinator.prompt().unwrap().setting, Setting::Endpoint);

        coordinator
            .handle(AppEvent::Input(Command::PromptCancel))
            .unwrap();
        assert_eq!(coordinator.prompt().unwrap().setting, Setting::ApiKey);
        assert!(coordinator.prompt().unwrap().buffer.is_empty());

        coordinator
            .handle(AppEvent::Input(Command::PromptCancel))
            .unwrap();
        assert!(coordinator.prompt().is_none());
    }

    #[test]
    fn test_secret_prompt_is_masked() {
        let prompt = Prompt {
            setting: Setting::ApiKey,
            buffer: "abc".to_string(),
        };
        assert_eq!(prompt.display_value(), "***");
    }
}
