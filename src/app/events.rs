//! Typed inbox of the application event loop
//!
//! Background units (column derivation, selection propagation, queue loading,
//! transfers) never touch shared state. They report back by sending an
//! [`AppEvent`] and the loop applies the result, one message at a time.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::app::models::CatalogItem;
use crate::app::navigator::NavigationColumn;
use crate::app::session::Setting;
use crate::errors::{CatalogResult, TransferResult};

/// Message consumed by the event loop
#[derive(Debug)]
pub enum AppEvent {
    /// A user command, already mapped from a key press
    Input(Command),
    /// Columns re-derived from the root
    ColumnsDerived {
        request_id: u64,
        result: CatalogResult<Vec<NavigationColumn>>,
    },
    /// Descendants of a toggled folder were collected
    SelectionPropagated {
        job_id: u64,
        item_id: String,
        add: bool,
        result: CatalogResult<Vec<String>>,
    },
    /// Metadata for the download list arrived
    QueueLoaded {
        generation: u64,
        result: CatalogResult<Vec<CatalogItem>>,
    },
    /// A transfer ended, successfully or not
    TransferFinished {
        item_id: String,
        attempt: u64,
        outcome: TransferResult<PathBuf>,
    },
    /// Progress tick
    Tick,
    /// Stop the loop
    Shutdown,
}

/// User intent, independent of key bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move column focus, wrapping at both ends
    MoveFocus(i32),
    /// Move the cursor of the focused column (browser) or the task list
    MoveCursor(i32),
    /// Toggle selection of the focused catalog item
    ToggleSelection,
    /// Delete the local file of the focused item
    DeleteDownloaded,
    /// Switch to the download list
    OpenDownloads,
    /// Cancel every transfer and return to the browser
    CloseDownloads,
    /// Start the focused task, or cancel it when it is downloading
    StartOrCancel,
    /// Open the prompt for a setting
    EditSetting(Setting),
    /// Type into the open prompt
    PromptInput(char),
    /// Erase the last character of the open prompt
    PromptBackspace,
    /// Save the open prompt
    PromptSubmit,
    /// Close the open prompt without saving
    PromptCancel,
    /// Leave the application
    Quit,
}

/// Sending half of the inbox
pub type EventSender = mpsc::UnboundedSender<AppEvent>;

/// Receiving half of the inbox
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

/// Create a new inbox
pub fn inbox() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, ignoring a closed inbox
///
/// The loop closing its receiver means the application is shutting down,
/// and nobody is left to care about late results.
pub(crate) fn send(events: &EventSender, event: AppEvent) {
    if events.send(event).is_err() {
        tracing::debug!("Inbox closed, dropping event");
    }
}
