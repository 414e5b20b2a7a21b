use crate::types::RoomId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Entries = std::sync::Mutex<HashMap<RoomId, Arc<Mutex<()>>>>;

/// One exclusive section per room. Different rooms never contend.
///
/// Entries exist only while someone holds or waits for them, so ids that
/// never name a real room leave nothing behind.
#[derive(Default)]
pub struct RoomLocks {
    locks: Entries,
}

/// Held for the duration of a room operation
pub struct RoomGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<Mutex<()>>,
    room_id: RoomId,
    locks: &'a Entries,
}

impl RoomLocks {
    /// Wait for exclusive access to a room
    pub async fn lock(&self, room_id: &str) -> RoomGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.entry(room_id.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        RoomGuard {
            guard: Some(guard),
            lock,
            room_id: room_id.to_string(),
            locks: &self.locks,
        }
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        // Release the room first so the guard's own reference is gone
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        let ours = locks
            .get(&self.room_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock));
        // The map and this guard hold the only references: nobody waits
        if ours && Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.room_id);
        }
    }
}
