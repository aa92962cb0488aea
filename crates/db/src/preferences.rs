//! File-backed storage for the selected-island preference.

use std::path::{Path, PathBuf};

use islandboard_core::island::{self, Island, ISLANDS};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    selected_island: Option<String>,
}

/// Persists a single island-id valued key as JSON on disk.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The selected island. A missing file, unreadable contents or an id
    /// no longer in the registry fall back to the first island.
    pub async fn selected_island(&self) -> &'static Island {
        match self.read().await {
            Ok(prefs) => prefs
                .selected_island
                .as_deref()
                .and_then(island::find)
                .unwrap_or(&ISLANDS[0]),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable preferences, using default island");
                &ISLANDS[0]
            }
        }
    }

    /// Persist `island` as the selection.
    pub async fn set_selected_island(&self, island: &'static Island) -> Result<(), StoreError> {
        let prefs = Preferences {
            selected_island: Some(island.id.to_string()),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Readers only ever see a complete file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&prefs)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn read(&self) -> Result<Preferences, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }
}
