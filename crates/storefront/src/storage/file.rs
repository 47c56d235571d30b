//! Directory-backed storage area.
//!
//! Each key lives in its own file, `k_{percent-encoded key}.entry`, so values
//! survive process restarts and can be inspected by hand. The prefix keeps
//! every name, including the empty key's, from becoming a dotfile.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::{StorageArea, StorageError, check_quota, entry_size};

const ENTRY_PREFIX: &str = "k_";
const ENTRY_EXTENSION: &str = "entry";

/// A storage area persisted as one file per key.
#[derive(Debug)]
pub struct FileArea {
    dir: PathBuf,
    quota: Option<usize>,
    // Serializes read-modify-write sequences within this process.
    lock: Mutex<()>,
}

impl FileArea {
    /// Open (creating if needed) an area rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file storage area");
        Ok(Self {
            dir,
            quota,
            lock: Mutex::new(()),
        })
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{ENTRY_PREFIX}{}.{ENTRY_EXTENSION}", urlencoding::encode(key)))
    }

    fn read_entry(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Paths and decoded keys of every entry in the directory.
    fn entries(&self) -> Result<Vec<(PathBuf, String)>, StorageError> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(stem) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(ENTRY_PREFIX))
            else {
                continue;
            };
            let Ok(key) = urlencoding::decode(stem) else {
                continue;
            };
            let key = key.into_owned();
            entries.push((path, key));
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(entries)
    }

    fn used_bytes(&self) -> Result<usize, StorageError> {
        let mut used = 0;
        for (path, key) in self.entries()? {
            let len = usize::try_from(fs::metadata(&path)?.len()).unwrap_or(usize::MAX);
            used += key.len().saturating_add(len);
        }
        Ok(used)
    }
}

impl StorageArea for FileArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.read_entry(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;

        let old = self.read_entry(key)?;
        if self.quota.is_some() {
            check_quota(self.quota, self.used_bytes()?, key, old.as_deref(), value)?;
        }

        // Write-then-rename so readers never observe a half-written value.
        let path = self.entry_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        debug!(key, bytes = entry_size(key, value), "Stored entry");
        Ok(old)
    }

    fn remove_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;

        let old = self.read_entry(key)?;
        if old.is_some() {
            fs::remove_file(self.entry_path(key))?;
        }
        Ok(old)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        for (path, _) in self.entries()? {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.entries()?.into_iter().map(|(_, key)| key).collect())
    }
}
