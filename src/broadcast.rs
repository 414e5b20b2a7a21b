use crate::error::StoreError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Send the room's full snapshot to every session in it.
/// A room that no longer exists is skipped. Returns the number of
/// sessions the update was queued for.
pub async fn broadcast_room_state(state: &AppState, room_id: &str) -> Result<usize, StoreError> {
    let Some(snapshot) = state.store.snapshot(room_id).await? else {
        tracing::debug!("Room {} is gone, skipping broadcast", room_id);
        return Ok(0);
    };

    let msg = ServerMessage::from(snapshot);
    let delivered = state.sessions.send_to_room(room_id, &msg).await;
    tracing::debug!("Broadcast room {} to {} sessions", room_id, delivered);
    Ok(delivered)
}

/// Spawn a background task that closes voting phases whose deadline passed
pub fn spawn_phase_deadline_watcher(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(500)).await;

            match state.expire_overdue_votes(Utc::now()).await {
                Ok(rooms) if !rooms.is_empty() => {
                    tracing::info!("Closed {} overdue voting phases", rooms.len());
                }
                Ok(_) => {}
                Err(e) if e.is_stale() => {
                    tracing::debug!("Deadline check hit a stale reference: {}", e);
                }
                Err(e) => {
                    tracing::error!("Deadline check failed: {}", e);
                }
            }
        }
    })
}
