//! Per-name mutation locks
//!
//! Save, update and delete on the same file name are serialised; different
//! names proceed independently. Entries only live while someone holds or
//! waits for them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Table of named async mutexes
#[derive(Debug, Default)]
pub struct NameLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while a mutation on one name is in progress
pub struct NameGuard {
    _guard: OwnedMutexGuard<()>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other mutation of `name` is running, then hold it.
    pub async fn lock(&self, name: &str) -> NameGuard {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds anymore
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(table.entry(name.to_string()).or_default())
        };

        NameGuard {
            _guard: entry.lock_owned().await,
        }
    }

    /// Number of names with a live entry
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
