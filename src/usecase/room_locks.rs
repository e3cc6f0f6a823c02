//! Per-room event serialization.
//!
//! Handling of one event must not block unrelated rooms, so exclusion
//! is per room rather than global: each room gets its own async mutex,
//! and every validate → persist → fan-out sequence for that room runs
//! while holding it. The generation tail re-acquires the same lock when
//! it re-enters the room.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::RoomId;

/// Map of per-room locks.
///
/// Entries live for the process lifetime: evicting a lock while a
/// generation tail still holds its `Arc` would let a freshly created
/// lock admit a second writer for the same room.
pub struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock of a room, creating it on first use.
    pub async fn acquire(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(room_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl Default for RoomLocks {
    fn default() -> Self {
        Self::new()
    }
}
