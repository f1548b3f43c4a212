//! Persisted session state
//!
//! A [`Session`] owns the [`SelectionSet`], the [`DownloadedIndex`] and the
//! credentials. Components borrow it mutably for one call to change it, and
//! every change is written through the [`SessionStore`] before the call
//! returns. A failed write rolls the in-memory change back.
//!
//! # Examples
//!
//! ```rust
//! use jellyfin_fetcher::app::session::{MemoryStore, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let mut session = Session::load(Box::new(store.clone()))?;
//!
//! assert!(session.toggle_selected("item-1")?);
//! assert_eq!(store.persist_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::auth::{Credentials, EnvOverrides};
use crate::constants::files;
use crate::errors::{StoreError, StoreResult};

pub mod downloaded;
pub mod record;
pub mod selection;
pub mod store;

pub use downloaded::DownloadedIndex;
pub use record::{SessionRecord, Setting};
pub use selection::SelectionSet;
pub use store::{JsonFileStore, MemoryStore, SessionStore};

/// Live session state with write-through persistence
pub struct Session {
    record: SessionRecord,
    store: Box<dyn SessionStore>,
    overrides: EnvOverrides,
}

impl Session {
    /// Load the record from `store`
    pub fn load(store: Box<dyn SessionStore>) -> StoreResult<Self> {
        let record = store.load()?;
        debug!(
            "Session loaded: {} selected, {} downloaded",
            record.selected.len(),
            record.downloaded.len()
        );
        Ok(Self {
            record,
            store,
            overrides: EnvOverrides::default(),
        })
    }

    /// Apply environment credential overrides for this process
    pub fn with_overrides(mut self, overrides: EnvOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.record.selected
    }

    pub fn downloaded(&self) -> &DownloadedIndex {
        &self.record.downloaded
    }

    pub fn overrides(&self) -> &EnvOverrides {
        &self.overrides
    }

    /// Where the record is stored
    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Effective credentials, overrides applied
    pub fn credentials(&self) -> Credentials {
        self.overrides.apply(&self.record.credentials())
    }

    /// Root directory for downloads, `~/Jellyfin` when unset
    pub fn download_root(&self) -> PathBuf {
        resolve_download_root(&self.record.download_location)
    }

    /// Flip selection of one id, returning whether it is now selected
    pub fn toggle_selected(&mut self, id: &str) -> StoreResult<bool> {
        self.mutate(|record| record.selected.toggle(id))
    }

    /// Add or remove many ids with a single write
    ///
    /// Returns how many ids actually changed membership.
    pub fn apply_selection(&mut self, ids: &[String], add: bool) -> StoreResult<usize> {
        self.mutate(|record| {
            ids.iter()
                .filter(|id| {
                    if add {
                        record.selected.add(id.as_str())
                    } else {
                        record.selected.remove(id)
                    }
                })
                .count()
        })
    }

    /// Record the local file of a finished download
    pub fn record_download(&mut self, id: &str, path: &Path) -> StoreResult<()> {
        self.mutate(|record| {
            record.downloaded.insert(id, path);
        })
    }

    /// Forget a downloaded item, returning the path it had
    pub fn forget_download(&mut self, id: &str) -> StoreResult<Option<PathBuf>> {
        if !self.record.downloaded.contains(id) {
            return Ok(None);
        }
        self.mutate(|record| record.downloaded.remove(id))
    }

    /// Delete the local file of a downloaded item and forget it
    ///
    /// A file that is already gone is not an error. Any other failure keeps
    /// the index entry and returns [`StoreError::DeleteFailed`].
    pub fn delete_download(&mut self, id: &str) -> StoreResult<Option<PathBuf>> {
        let Some(path) = self.record.downloaded.get(id).map(Path::to_path_buf) else {
            return Ok(None);
        };

        match fs::remove_file(&path) {
            Ok(()) => info!("Deleted {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} was already gone", path.display())
            }
            Err(e) => {
                warn!("Could not delete {}: {}", path.display(), e);
                return Err(StoreError::DeleteFailed {
                    path,
                    reason: e.to_string(),
                });
            }
        }

        self.forget_download(id)
    }

    /// Overwrite a setting
    pub fn set_setting(&mut self, setting: Setting, value: &str) -> StoreResult<()> {
        self.mutate(|record| record.set_setting(setting, value))
    }

    fn mutate<R>(&mut self, change: impl FnOnce(&mut SessionRecord) -> R) -> StoreResult<R> {
        let previous = self.record.clone();
        let result = change(&mut self.record);

        if let Err(e) = self.store.persist(&self.record) {
            error!("Session write failed, rolling back: {}", e);
            self.record = previous;
            return Err(e);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("selected", &self.record.selected.len())
            .field("downloaded", &self.record.downloaded.len())
            .field("credentials", &self.credentials())
            .finish()
    }
}

/// Resolve a configured download location
///
/// An empty value means `<home>/Jellyfin`, and a leading `~/` expands to the
/// home directory.
pub fn resolve_download_root(location: &str) -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let location = location.trim();

    if location.is_empty() {
        home.join(files::DEFAULT_DOWNLOAD_DIR)
    } else if location == "~" {
        home
    } else if let Some(rest) = location.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Session, MemoryStore) {
        let store = MemoryStore::new();
        let session = Session::load(Box::new(store.clone())).unwrap();
        (session, store)
    }

    #[test]
    fn test_every_mutation_persists() {
        let (mut session, store) = session();

        session.toggle_selected("a").unwrap();
        session
            .apply_selection(&["b".to_string(), "c".to_string()], true)
            .unwrap();
        session.record_download("b", Path::new("/m/b.mkv")).unwrap();
        session.set_setting(Setting::UserId, "u1").unwrap();

        assert_eq!(store.persist_count(), 4);
        let last = store.last_persisted().unwrap();
        assert_eq!(last.selected.len(), 3);
        assert_eq!(last.downloaded.get("b"), Some(Path::new("/m/b.mkv")));
        assert_eq!(last.user_id, "u1");
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (mut session, store) = session();
        session.toggle_selected("a").unwrap();

        store.fail_writes(true);
        assert!(session.toggle_selected("b").is_err());
        assert!(session.record_download("a", Path::new("/x")).is_err());

        assert!(session.selection().contains("a"));
        assert!(!session.selection().contains("b"));
        assert!(session.downloaded().is_empty());
    }

    #[test]
    fn test_apply_selection_counts_changes() {
        let (mut session, _store) = session();
        let ids = vec!["a".to_string(), "b".to_string()];

        assert_eq!(session.apply_selection(&ids, true).unwrap(), 2);
        assert_eq!(session.apply_selection(&ids, true).unwrap(), 0);
        assert_eq!(session.apply_selection(&ids, false).unwrap(), 2);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_forget_unknown_download_does_not_write() {
        let (mut session, store) = session();
        assert_eq!(session.forget_download("nope").unwrap(), None);
        assert_eq!(store.persist_count(), 0);
    }

    #[test]
    fn test_delete_download_removes_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("a.mkv");
        fs::write(&file, b"data").unwrap();

        let (mut session, store) = session();
        session.record_download("a", &file).unwrap();

        assert_eq!(session.delete_download("a").unwrap(), Some(file.clone()));
        assert!(!file.exists());
        assert!(!session.downloaded().contains("a"));
        assert!(store.last_persisted().unwrap().downloaded.is_empty());

        // Already gone: nothing left to do
        assert_eq!(session.delete_download("a").unwrap(), None);
    }

    #[test]
    fn test_failed_delete_keeps_index_entry() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("a.mkv");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("inner"), b"x").unwrap();

        let (mut session, store) = session();
        session.record_download("a", &blocker).unwrap();
        let writes = store.persist_count();

        let result = session.delete_download("a");
        assert!(matches!(result, Err(StoreError::DeleteFailed { .. })));
        assert!(blocker.exists());
        assert!(session.downloaded().contains("a"));
        assert_eq!(store.persist_count(), writes);
    }

    #[test]
    fn test_overrides_are_not_persisted() {
        let mut record = SessionRecord::default();
        record.api_key = "stored".to_string();
        let store = MemoryStore::with_record(record);

        let mut session = Session::load(Box::new(store.clone()))
            .unwrap()
            .with_overrides(EnvOverrides {
                api_key: Some("from-env".to_string()),
                ..Default::default()
            });

        assert_eq!(session.credentials().api_key, "from-env");
        session.toggle_selected("x").unwrap();
        assert_eq!(store.last_persisted().unwrap().api_key, "stored");
    }

    #[test]
    fn test_download_root_resolution() {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(resolve_download_root(""), home.join("Jellyfin"));
        assert_eq!(resolve_download_root("~/Media"), home.join("Media"));
        assert_eq!(resolve_download_root("/srv/media"), PathBuf::from("/srv/media"));
    }
}
