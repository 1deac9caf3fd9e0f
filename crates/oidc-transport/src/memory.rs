//! In-memory `StateStore`
//!
//! Suitable for single-process deployments and tests. `take` removes the
//! entry under the same lock that reads it, so a stored request state is
//! handed out at most once.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::{BoxFuture, Result, StateStore};

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move { Ok(self.entries.lock().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: Option<String>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            match value {
                Some(value) => {
                    entries.insert(key.to_string(), value);
                    debug!(key, "stored request state");
                }
                None => {
                    entries.remove(key);
                    debug!(key, "cleared request state");
                }
            }
            Ok(())
        })
    }

    fn take<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let taken = self.entries.lock().await.remove(key);
            debug!(key, found = taken.is_some(), "took request state");
            Ok(taken)
        })
    }
}
