//! File-backed plugin data.
//!
//! Each plugin's payload is one pretty-printed JSON file:
//!
//! ```text
//! {data_dir}/plugins/{identifier}.json
//! ```
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so a
//! crash mid-write leaves the previous version intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use alyx_framework::{PluginStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("plugins"),
        }
    }

    /// Directory holding the per-plugin files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `identifier`. Path separators are replaced so
    /// an identifier can never escape the store directory.
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        let file: String = identifier
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[async_trait]
impl PluginStore for JsonFileStore {
    async fn load(&self, identifier: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(identifier);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(plugin = %identifier, path = %path.display(), "Loaded plugin data");
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, identifier: &str, data: Value) -> Result<(), StoreError> {
        let path = self.path_for(identifier);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&data)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(plugin = %identifier, path = %path.display(), "Saved plugin data");
        Ok(())
    }
}
