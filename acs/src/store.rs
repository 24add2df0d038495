//! Core ActionStore implementation

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The persisted document: the collection plus its save timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedActions {
    /// When the collection was last replaced
    #[serde(rename = "saved-at")]
    pub saved_at: DateTime<Utc>,

    /// The ordered action-descriptor records, stored verbatim
    pub actions: Vec<Value>,
}

/// Whole-collection-replace store for default action records
///
/// Writes go through a temp file rename under an exclusive advisory lock so
/// a reader never observes a torn document. Reads are lenient: a missing or
/// unparseable document loads as the empty collection.
pub struct ActionStore {
    base_path: PathBuf,
}

impl ActionStore {
    /// Open or create an action store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened action store");
        Ok(Self { base_path })
    }

    /// Replace the entire collection with the given records
    pub fn save(&self, actions: &[Value]) -> Result<()> {
        let lock_file = fs::File::create(self.lock_path()).context("Failed to create lock file")?;
        lock_file.lock_exclusive().context("Failed to acquire store lock")?;

        let document = SavedActions {
            saved_at: Utc::now(),
            actions: actions.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document).context("Failed to serialize actions")?;

        // Temp-file rename keeps the document whole for concurrent readers
        let tmp_path = self.actions_path().with_extension("json.tmp");
        fs::write(&tmp_path, json).context("Failed to write actions file")?;
        fs::rename(&tmp_path, self.actions_path()).context("Failed to replace actions file")?;

        let _ = fs2::FileExt::unlock(&lock_file);

        info!(count = actions.len(), "Saved default actions");
        Ok(())
    }

    /// Load the current collection
    ///
    /// A missing or corrupt document yields the empty collection, never an
    /// error: the bridge must keep answering queries even if a previous save
    /// was interrupted.
    pub fn load(&self) -> Result<Vec<Value>> {
        let path = self.actions_path();
        if !path.exists() {
            debug!(?path, "No actions file, loading empty collection");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).context("Failed to read actions file")?;
        match serde_json::from_str::<SavedActions>(&content) {
            Ok(document) => {
                debug!(count = document.actions.len(), "Loaded default actions");
                Ok(document.actions)
            }
            Err(e) => {
                warn!(?path, error = %e, "Actions file unparseable, loading empty collection");
                Ok(Vec::new())
            }
        }
    }

    /// Remove the persisted collection entirely
    pub fn clear(&self) -> Result<()> {
        let path = self.actions_path();
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove actions file")?;
            info!(?path, "Cleared default actions");
        }
        Ok(())
    }

    /// When the collection was last saved, if a document exists
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let path = self.actions_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).context("Failed to read actions file")?;
        Ok(serde_json::from_str::<SavedActions>(&content).ok().map(|d| d.saved_at))
    }

    fn actions_path(&self) -> PathBuf {
        self.base_path.join(crate::ACTIONS_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.base_path.join(crate::LOCK_FILE)
    }
}
