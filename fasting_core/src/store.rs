//! Key-value persistence with file locking.
//!
//! Every record the tracker owns lives under one logical key. The file
//! backend writes each key as its own JSON document, replacing it whole on
//! every save, so a crash mid-write can only lose the latest mutation.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Logical keys of the persisted state
pub mod keys {
    pub const USER_DATA: &str = "userData";
    pub const CURRENT_PLAN: &str = "currentPlan";
    pub const FASTING_SESSION: &str = "fastingSession";
    pub const FASTING_HISTORY: &str = "fastingHistory";
    pub const WEIGHT_HISTORY: &str = "weightHistory";
    pub const WATER_INTAKE: &str = "waterIntake";

    pub const ALL: [&str; 6] = [
        USER_DATA,
        CURRENT_PLAN,
        FASTING_SESSION,
        FASTING_HISTORY,
        WEIGHT_HISTORY,
        WATER_INTAKE,
    ];
}

/// Durable string storage addressed by key
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Load and parse a record, falling back to `default` on any failure.
///
/// Missing keys are normal (first run). Unreadable or unparseable records
/// are logged and replaced by the default rather than surfaced.
pub fn load_or_else<S, T, F>(store: &S, key: &str, default: F) -> T
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("No stored value for {}, using default", key);
            return default();
        }
        Err(e) => {
            tracing::warn!("Unable to read {}: {}. Using default.", key, e);
            return default();
        }
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) => {
            tracing::debug!("Loaded {} from store", key);
            value
        }
        Err(e) => {
            tracing::warn!("Failed to parse stored {}: {}. Using default.", key, e);
            default()
        }
    }
}

/// Serialize and write a whole record under `key`
pub fn save_record<S, T>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let contents = serde_json::to_string(value)?;
    store.set(key, &contents)
}

/// Remove every known key from the store
pub fn clear_all<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<()> {
    for key in keys::ALL {
        store.remove(key)?;
    }
    tracing::info!("Cleared all stored data");
    Ok(())
}

// ============================================================================
// File backend
// ============================================================================

/// One `<key>.json` file per key inside a data directory
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Store(format!("invalid key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;

        // Shared lock so a concurrent writer's rename can't interleave the read
        FileExt::lock_shared(&file)?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        FileExt::unlock(&file)?;
        read?;

        Ok(Some(contents))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Temp file in the same directory so the rename stays atomic
        let temp = NamedTempFile::new_in(&self.dir)?;
        FileExt::lock_exclusive(temp.as_file())?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        FileExt::unlock(temp.as_file())?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} to {:?}", key, path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory backend
// ============================================================================

/// Volatile store for tests and dry runs
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}
