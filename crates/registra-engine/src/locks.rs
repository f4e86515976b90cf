//! # Lock Registry
//!
//! Named async mutexes keyed by entity id.
//!
//! ## What Gets Serialized
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  key = location id     → session transitions at that register      │
//! │                          (two concurrent opens: exactly one wins)  │
//! │  key = transaction id  → payments on that transaction              │
//! │                          (no double-spend of the remaining         │
//! │                           balance)                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locks are created on first use and kept for the registry's lifetime;
//! the registry lives as long as the engine, and the per-key cost is a
//! single Arc'd mutex.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-key async mutexes.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        LockRegistry {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for `key`, creating it on first use.
    ///
    /// The registry's own mutex is held only for the map lookup, never
    /// across the acquisition of the per-key lock.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
