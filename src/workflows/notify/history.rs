use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

use super::domain::NotificationEntry;

/// Durable per-channel alert history.
pub trait HistoryStore: Debug + Send + Sync {
    fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError>;
    fn save(&self, entries: &[NotificationEntry]) -> Result<(), HistoryError>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Box<S> {
    fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError> {
        (**self).load()
    }

    fn save(&self, entries: &[NotificationEntry]) -> Result<(), HistoryError> {
        (**self).save(entries)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history file {} could not be accessed: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("history file {} is not a JSON array: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("history could not be encoded: {0}")]
    Encode(serde_json::Error),
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// History kept as a pretty-printed JSON array on disk.
///
/// A missing file is an empty history. Writes go to a sibling temp file which
/// is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_channel(dir: impl AsRef<Path>, channel: &str) -> Self {
        Self::new(
            dir.as_ref()
                .join(format!("notification_history_{channel}.json")),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };

        let values: Vec<Value> =
            serde_json::from_str(&raw).map_err(|source| HistoryError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                match serde_json::from_value::<NotificationEntry>(value) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(
                            path = %self.path.display(),
                            index,
                            error = %err,
                            "skipping malformed history entry"
                        );
                        None
                    }
                }
            })
            .collect())
    }

    fn save(&self, entries: &[NotificationEntry]) -> Result<(), HistoryError> {
        let body = serde_json::to_string_pretty(entries).map_err(HistoryError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let temp = self.temp_path();
        fs::write(&temp, body).map_err(|err| self.io_error(err))?;
        fs::rename(&temp, &self.path).map_err(|err| self.io_error(err))
    }
}

/// Process-local history, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<NotificationEntry>>,
}

impl InMemoryHistoryStore {
    pub fn with_entries(entries: Vec<NotificationEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn entries(&self) -> Vec<NotificationEntry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| HistoryError::Unavailable("history mutex poisoned".to_string()))
    }

    fn save(&self, entries: &[NotificationEntry]) -> Result<(), HistoryError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| HistoryError::Unavailable("history mutex poisoned".to_string()))?;
        *guard = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(message: &str) -> NotificationEntry {
        NotificationEntry {
            message: message.to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap(),
            hash: format!("hash-{message}"),
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileHistoryStore::for_channel(dir.path(), "webhook");
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn save_then_load_preserves_entries_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileHistoryStore::for_channel(dir.path(), "speaker");
        let entries = vec![entry("一"), entry("two")];

        store.save(&entries).expect("save");
        assert_eq!(store.load().expect("load"), entries);

        let raw = fs::read_to_string(store.path()).expect("read file");
        assert!(raw.contains("\"一\""), "non-ascii text stored verbatim: {raw}");
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileHistoryStore::new(dir.path().join("nested/state/history.json"));
        store.save(&[entry("a")]).expect("save");
        assert_eq!(store.load().expect("load").len(), 1);
    }

    #[test]
    fn non_array_content_is_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileHistoryStore::for_channel(dir.path(), "webhook");
        fs::write(store.path(), "{not json").expect("write");

        match store.load() {
            Err(HistoryError::Corrupt { .. }) => {}
            other => panic!("expected corrupt history, got {other:?}"),
        }
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileHistoryStore::for_channel(dir.path(), "webhook");
        fs::write(
            store.path(),
            r#"[
                {"message": "ok", "timestamp": "2026-01-20T12:00:00Z", "hash": "h1"},
                {"message": "no timestamp", "hash": "h2"},
                {"message": "bad", "timestamp": "soon", "hash": "h3"}
            ]"#,
        )
        .expect("write");

        let entries = store.load().expect("load");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash, "h1");
    }

    #[test]
    fn in_memory_store_replaces_contents_on_save() {
        let store = InMemoryHistoryStore::with_entries(vec![entry("old")]);
        store.save(&[entry("new")]).expect("save");
        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "new");
    }
}
