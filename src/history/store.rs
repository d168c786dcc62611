use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use regex::Regex;
use tracing::{debug, info};

use crate::history::entry::Entry;

const APP_DIR_NAME: &str = ".convo";
const HISTORY_DIR_NAME: &str = "history";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("thread not found: {0}")]
    NotFound(String),

    #[error("invalid thread name: {0:?}")]
    InvalidName(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt history at {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode history: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Persistence backend for threads. Entries come back in conversational order.
pub trait HistoryStore: Send + Sync {
    fn read_thread(&self, name: &str) -> Result<Vec<Entry>, StoreError>;

    /// Replace the full contents of a thread, creating it if needed.
    fn write_thread(&self, name: &str, entries: &[Entry]) -> Result<(), StoreError>;

    fn list_threads(&self) -> Result<Vec<String>, StoreError>;

    fn delete_thread(&self, name: &str) -> Result<(), StoreError>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for &T {
    fn read_thread(&self, name: &str) -> Result<Vec<Entry>, StoreError> {
        (**self).read_thread(name)
    }

    fn write_thread(&self, name: &str, entries: &[Entry]) -> Result<(), StoreError> {
        (**self).write_thread(name, entries)
    }

    fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_threads()
    }

    fn delete_thread(&self, name: &str) -> Result<(), StoreError> {
        (**self).delete_thread(name)
    }
}

/// Append entries to a thread, treating a missing thread as empty.
pub fn append(store: &dyn HistoryStore, name: &str, entries: &[Entry]) -> Result<(), StoreError> {
    let mut existing = match store.read_thread(name) {
        Ok(existing) => existing,
        Err(StoreError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(e),
    };
    existing.extend_from_slice(entries);
    store.write_thread(name, &existing)
}

pub fn validate_thread_name(name: &str) -> Result<(), StoreError> {
    let re = Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex");
    if name.starts_with('.') || !re.is_match(name) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// One pretty-printed JSON array per thread, stored as `<dir>/<thread>.json`.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(APP_DIR_NAME).join(HISTORY_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn thread_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_thread_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

impl HistoryStore for FileHistoryStore {
    fn read_thread(&self, name: &str) -> Result<Vec<Entry>, StoreError> {
        let path = self.thread_path(name)?;
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        let entries: Vec<Entry> = serde_json::from_str(&json)
            .map_err(|source| StoreError::Decode { path: path.clone(), source })?;
        debug!(thread = name, entries = entries.len(), "read thread");
        Ok(entries)
    }

    fn write_thread(&self, name: &str, entries: &[Entry]) -> Result<(), StoreError> {
        let path = self.thread_path(name)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;
        }
        let json = serde_json::to_string_pretty(entries).map_err(StoreError::Encode)?;

        // write-then-rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        debug!(thread = name, entries = entries.len(), "wrote thread");
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let read_dir = fs::read_dir(&self.dir)
            .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry
                .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_thread_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_thread(&self, name: &str) -> Result<(), StoreError> {
        let path = self.thread_path(name)?;
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(&path).map_err(|source| StoreError::Io { path, source })?;
        info!(thread = name, "deleted thread");
        Ok(())
    }
}

/// Volatile store. Backs `--no-history` runs so nothing reaches disk.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    threads: Mutex<HashMap<String, Vec<Entry>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self { Self::default() }
}

impl HistoryStore for MemoryHistoryStore {
    fn read_thread(&self, name: &str) -> Result<Vec<Entry>, StoreError> {
        validate_thread_name(name)?;
        let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn write_thread(&self, name: &str, entries: &[Entry]) -> Result<(), StoreError> {
        validate_thread_name(name)?;
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads.insert(name.to_string(), entries.to_vec());
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<String>, StoreError> {
        let threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = threads.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_thread(&self, name: &str) -> Result<(), StoreError> {
        validate_thread_name(name)?;
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}
