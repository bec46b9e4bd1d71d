//! Per-case serialization of mutating operations.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed async mutex: one lock per case id.
///
/// Operations on different cases run concurrently; operations on the same
/// case run one at a time within this process.
#[derive(Debug, Default)]
pub struct CaseLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl CaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the lock of `case_id` until the guard drops.
    pub async fn lock(&self, case_id: Uuid) -> OwnedMutexGuard<()> {
        let case_lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody holds or waits on.
            locks.retain(|id, lock| *id == case_id || Arc::strong_count(lock) > 1);
            locks.entry(case_id).or_default().clone()
        };
        case_lock.lock_owned().await
    }

    /// Number of cases with a live lock entry.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
