//! WebSocket message dispatch
//!
//! Every inbound message maps to one `AppState` operation. Operations
//! broadcast their own state updates; the value returned here is the
//! optional unicast reply for the originating connection only.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage, INTERNAL_ERROR, MALFORMED_MESSAGE};
use crate::state::{AppState, Connection, Outcome};
use crate::types::MeetingKind;
use std::sync::Arc;

/// Decode one text frame and dispatch it
pub async fn handle_text(
    text: &str,
    conn: &Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match ClientMessage::from_json_str(text) {
        Ok(msg) => handle_message(msg, conn, state).await,
        Err(e) => {
            tracing::info!("Rejecting malformed message from {}: {}", conn.id, e);
            Some(ServerMessage::error(MALFORMED_MESSAGE))
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let kind = msg.kind();
    tracing::debug!("Handling {} from {}", kind, conn.id);

    let result = match msg {
        ClientMessage::Join {
            room_code,
            username,
            color,
        } => state
            .join_room(conn, &room_code, &username, color)
            .await
            .map(|_| Outcome::Updated),

        ClientMessage::Leave { game_id, player_id } => {
            tracing::info!(
                "Leave from {} (gameId={:?}, playerId={:?})",
                conn.id,
                game_id,
                player_id
            );
            state.end_session(&conn.id).await
        }

        ClientMessage::Start { game_id } => state.start_game(&game_id).await,

        ClientMessage::Move {
            game_id,
            player_id,
            position,
        } => {
            state
                .move_participant(&game_id, &player_id, position)
                .await
        }

        ClientMessage::CompleteTask { game_id, player_id } => {
            state.complete_task(&game_id, &player_id).await
        }

        ClientMessage::CallMeeting { game_id, player_id } => {
            state
                .call_meeting(&game_id, &player_id, MeetingKind::Emergency, None)
                .await
        }

        ClientMessage::Report {
            game_id,
            player_id,
            location,
        } => {
            state
                .call_meeting(&game_id, &player_id, MeetingKind::Report, location)
                .await
        }

        ClientMessage::Chat {
            game_id,
            player_id,
            message,
        } => state.post_chat(&game_id, &player_id, &message).await,

        ClientMessage::CastVote {
            game_id,
            player_id,
            target_id,
        } => state.cast_vote(&game_id, &player_id, target_id).await,

        ClientMessage::Eliminate {
            game_id,
            killer_id,
            victim_id,
        } => state.eliminate(&game_id, &killer_id, &victim_id).await,
    };

    match result {
        Ok(Outcome::Updated) => None,
        Ok(Outcome::Ignored) => {
            tracing::debug!("Ignored {} from {}", kind, conn.id);
            None
        }
        Err(e) => into_reply(kind, e),
    }
}

fn into_reply(kind: &str, err: GameError) -> Option<ServerMessage> {
    match err {
        e if e.is_stale() => {
            tracing::debug!("Stale reference in {}: {}", kind, e);
            None
        }
        GameError::Store(e) => {
            tracing::error!("Store failure during {}: {}", kind, e);
            Some(ServerMessage::error(INTERNAL_ERROR))
        }
        e => {
            tracing::info!("Rejected {}: {}", kind, e);
            Some(ServerMessage::error(e.to_string()))
        }
    }
}
