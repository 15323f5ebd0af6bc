use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CursorFile {
    last_signature: Option<String>,
}

/// Durable home of the last processed signature: a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored signature. A missing, unreadable or malformed file
    /// yields `None` so the watcher starts fresh instead of failing.
    pub fn load(&self) -> Option<String> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cursor file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Cannot read cursor file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<CursorFile>(&raw) {
            Ok(file) => file.last_signature.filter(|sig| !sig.is_empty()),
            Err(e) => {
                warn!(
                    "Ignoring corrupt cursor file {}: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Replaces the stored signature. The new document is written to a sibling
    /// temp file, flushed to disk and renamed over the old one, so readers only
    /// ever observe a complete document.
    pub fn save(&self, signature: &str) -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        let file = CursorFile {
            last_signature: Some(signature.to_string()),
        };
        serde_json::to_writer(&mut tmp, &file)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_without_file_is_none() {
        let dir = tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("last_sig.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn saved_signature_survives_a_fresh_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_sig.json");

        CursorStore::new(&path).save("SIG123").unwrap();

        let reopened = CursorStore::new(&path);
        assert_eq!(reopened.load().as_deref(), Some("SIG123"));
    }

    #[test]
    fn save_overwrites_previous_value() {
        let dir = tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("last_sig.json"));

        store.save("A").unwrap();
        store.save("B").unwrap();

        assert_eq!(store.load().as_deref(), Some("B"));
        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"last_signature":"B"}"#);
    }

    #[test]
    fn corrupt_or_null_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_sig.json");
        let store = CursorStore::new(&path);

        fs::write(&path, "{not json").unwrap();
        assert_eq!(store.load(), None);

        fs::write(&path, r#"{"last_signature": null}"#).unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_removes_cursor_and_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("last_sig.json"));

        store.save("A").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }
}
