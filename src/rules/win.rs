use crate::types::{Participant, Role, RoomState, Winner};

/// Decide whether the round is over. Only alive participants count.
///
/// Checks run in a fixed order and the first match wins:
/// impostors at parity, then no impostors left, then all crew tasks done.
/// Rooms that are not `Playing` never end here.
pub fn evaluate(state: RoomState, participants: &[Participant]) -> Option<Winner> {
    if state != RoomState::Playing {
        return None;
    }

    let alive = participants.iter().filter(|p| p.is_alive);
    let (impostors, crewmates): (Vec<&Participant>, Vec<&Participant>) =
        alive.partition(|p| p.role == Role::Impostor);

    if impostors.len() >= crewmates.len() {
        return Some(Winner::Impostors);
    }

    if impostors.is_empty() {
        return Some(Winner::Crewmates);
    }

    let total: u32 = crewmates.iter().map(|p| p.total_tasks).sum();
    let completed: u32 = crewmates.iter().map(|p| p.tasks_completed).sum();
    if total > 0 && completed >= total {
        return Some(Winner::Crewmates);
    }

    None
}
