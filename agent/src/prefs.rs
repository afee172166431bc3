//! JSON file backed preference store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tether_engine::{error::Result, Error, PreferenceStore};

/// Stores preferences as one flat JSON object on disk.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let location = path.display().to_string();

        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| Error::CorruptPreference {
                key: location,
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::preferences(location, e)),
        };

        tracing::debug!(path = %path.display(), entries = values.len(), "Preferences loaded");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn update(&self, key: &str, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| Error::preferences(key, e))?;

        let mut next = values.clone();
        apply(&mut next);

        let json = serde_json::to_string_pretty(&next).map_err(|e| Error::preferences(key, e))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| Error::preferences(key, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::preferences(key, e))?;

        *values = next;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| Error::preferences(key, e))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(key, |values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(key, |values| {
            values.remove(key);
        })
    }
}
