//! Session record storage
//!
//! [`JsonFileStore`] writes the record atomically (temp file + rename) and
//! retries failed writes with exponential backoff. [`MemoryStore`] keeps the
//! record in memory and is what tests and dry runs use.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use backoff::ExponentialBackoffBuilder;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn};

use super::SessionRecord;
use crate::constants::{files, persistence};
use crate::errors::{StoreError, StoreResult};

/// Load and persist the session record
pub trait SessionStore: Send {
    /// Read the record; a missing record is an empty one
    fn load(&self) -> StoreResult<SessionRecord>;

    /// Durably write the full record
    ///
    /// Blocks the calling thread, including while a failed write is retried.
    fn persist(&self, record: &SessionRecord) -> StoreResult<()>;

    /// Where the record lives, for display
    fn location(&self) -> String;
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config_dir>/jellyfin-fetcher/session.json`
    pub fn default_location() -> StoreResult<Self> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(
            dir.join(files::APP_DIR_NAME).join(files::SESSION_FILE_NAME),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_once(&self, contents: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(contents)?;
            file.sync_all()?;

            // The record holds the API key
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = file.metadata()?.permissions();
                perms.set_mode(0o600);
                file.set_permissions(perms)?;
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            e
        })
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> StoreResult<SessionRecord> {
        if !self.path.exists() {
            debug!("No session file at {}, starting fresh", self.path.display());
            return Ok(SessionRecord::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let record = serde_json::from_str(&contents)?;
        debug!("Loaded session from {}", self.path.display());
        Ok(record)
    }

    fn persist(&self, record: &SessionRecord) -> StoreResult<()> {
        let contents = serde_json::to_vec_pretty(record)?;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(persistence::INITIAL_RETRY_INTERVAL)
            .with_max_elapsed_time(Some(persistence::MAX_RETRY_ELAPSED))
            .build();

        let mut attempts = 0u32;
        let result = without_stalling_runtime(|| {
            backoff::retry(policy, || {
                attempts += 1;
                self.write_once(&contents).map_err(|e| {
                    warn!(
                        "Session write to {} failed (attempt {}): {}",
                        self.path.display(),
                        attempts,
                        e
                    );
                    backoff::Error::transient(e)
                })
            })
        });

        result.map_err(|e| {
            let reason = match e {
                backoff::Error::Permanent(err) => err.to_string(),
                backoff::Error::Transient { err, .. } => err.to_string(),
            };
            StoreError::PersistFailed {
                path: self.path.clone(),
                attempts,
                reason,
            }
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Run blocking work so other tasks on a multi-thread runtime keep going
fn without_stalling_runtime<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    record: SessionRecord,
    persisted: Vec<SessionRecord>,
    fail_writes: bool,
}

/// In-memory store
///
/// Clones share state, so a test can keep one handle and give the other to a
/// [`Session`](super::Session) to observe every persisted snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts with `record`
    pub fn with_record(record: SessionRecord) -> Self {
        let store = Self::default();
        store.lock().record = record;
        store
    }

    /// Make every following write fail
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes
    pub fn persist_count(&self) -> usize {
        self.lock().persisted.len()
    }

    /// The most recent successful write
    pub fn last_persisted(&self) -> Option<SessionRecord> {
        self.lock().persisted.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> StoreResult<SessionRecord> {
        Ok(self.lock().record.clone())
    }

    fn persist(&self, record: &SessionRecord) -> StoreResult<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StoreError::PersistFailed {
                path: PathBuf::from("<memory>"),
                attempts: 1,
                reason: "writes disabled".to_string(),
            });
        }
        state.record = record.clone();
        state.persisted.push(record.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("session.json"));

        let record = store.load().unwrap();
        assert_eq!(record, SessionRecord::default());
    }

    #[test]
    fn test_persist_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");
        let store = JsonFileStore::new(&path);

        let mut record = SessionRecord::default();
        record.selected.add("a");
        record.downloaded.insert("b", "/media/b.mkv");
        record.api_endpoint = "http://host".to_string();
        store.persist(&record).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), record);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("session.json"));
        store.persist(&SessionRecord::default()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_unwritable_location_fails_after_retries() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = JsonFileStore::new(blocker.join("session.json"));

        match store.persist(&SessionRecord::default()) {
            Err(StoreError::PersistFailed { attempts, .. }) => assert!(attempts >= 1),
            other => panic!("Expected PersistFailed, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_retrying_write_leaves_other_tasks_running() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = JsonFileStore::new(blocker.join("session.json"));

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let writer = tokio::spawn(async move { store.persist(&SessionRecord::default()) });
        assert!(writer.await.unwrap().is_err());
        counter.abort();

        assert!(ticks.load(Ordering::SeqCst) > 5);
    }

    #[test]
    fn test_memory_store_records_snapshots() {
        let store = MemoryStore::new();
        let mut record = SessionRecord::default();
        record.selected.add("x");

        store.persist(&record).unwrap();
        assert_eq!(store.persist_count(), 1);
        assert_eq!(store.last_persisted(), Some(record.clone()));
        assert_eq!(store.load().unwrap(), record);

        store.fail_writes(true);
        assert!(store.persist(&SessionRecord::default()).is_err());
        assert_eq!(store.persist_count(), 1);
    }
}
