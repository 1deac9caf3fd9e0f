//! File-backed `StateStore`
//!
//! Keeps a JSON object mapping store keys to serialized request state. Used
//! by the CLI, where the authorize and callback steps run as separate
//! processes. Every mutation is written with temp-file + rename so a crash
//! never leaves a half-written file, and a tokio Mutex serializes writers.
//!
//! The file holds nonces, so it is created with 0600 permissions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{BoxFuture, Error, Result, StateStore};

pub struct FileStateStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl FileStateStore {
    /// Load the store from `path`.
    ///
    /// A missing file is created as `{}`.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading state file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::Store(format!("parsing state file: {e}")))?;
            info!(path = %path.display(), entries = entries.len(), "loaded request state file");
            entries
        } else {
            info!(path = %path.display(), "state file not found, starting empty");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move { Ok(self.state.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Option<String>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let changed = match value {
                Some(value) => {
                    state.insert(key.to_string(), value);
                    true
                }
                None => state.remove(key).is_some(),
            };
            if changed {
                debug!(key, "updated request state file");
                write_atomic(&self.path, &state).await?;
            }
            Ok(())
        })
    }

    fn take<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let taken = state.remove(key);
            if taken.is_some() {
                // Removed on disk before the value is returned
                write_atomic(&self.path, &state).await?;
                debug!(key, "took request state from file");
            }
            Ok(taken)
        })
    }
}

/// Write the store to disk atomically (temp file + rename, 0600 on unix).
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Store(format!("serializing state file: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("state file path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".oidc-state.tmp.{}", std::process::id()));

    // A temp file left by a crashed writer would keep its old mode
    match tokio::fs::remove_file(&tmp_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::Io(format!("removing stale temp state file: {e}"))),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&tmp_path)
        .await
        .map_err(|e| Error::Io(format!("creating temp state file: {e}")))?;
    file.write_all(json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp state file: {e}")))?;
    file.sync_all()
        .await
        .map_err(|e| Error::Io(format!("syncing temp state file: {e}")))?;
    drop(file);

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp state file: {e}")))?;

    debug!(path = %path.display(), "persisted request state file");
    Ok(())
}
