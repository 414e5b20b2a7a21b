use crate::types::{Ballot, Participant, ParticipantId};
use std::collections::HashMap;

/// Result of resolving one voting phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A unique plurality target is ejected
    Eliminate(ParticipantId),
    /// Two or more targets share the highest count
    Tie,
    /// Every ballot was a skip, or there were none
    NoVotes,
}

/// Quorum is reached once every alive participant has voted.
/// Dead participants never count.
pub fn quorum_reached(participants: &[Participant]) -> bool {
    participants
        .iter()
        .filter(|p| p.is_alive)
        .all(|p| p.has_voted)
}

/// Count non-skip ballots per target
pub fn count_votes(ballots: &[Ballot]) -> HashMap<ParticipantId, u32> {
    let mut counts: HashMap<ParticipantId, u32> = HashMap::new();
    for target in ballots.iter().filter_map(|b| b.target_id.as_ref()) {
        *counts.entry(target.clone()).or_insert(0) += 1;
    }
    counts
}

/// Plurality tally. Skip ballots never count toward a target.
pub fn tally(ballots: &[Ballot]) -> Verdict {
    let counts = count_votes(ballots);
    let Some(max) = counts.values().copied().max() else {
        return Verdict::NoVotes;
    };

    let mut leaders = counts.into_iter().filter(|(_, count)| *count == max);
    match (leaders.next(), leaders.next()) {
        (Some((target, _)), None) => Verdict::Eliminate(target),
        _ => Verdict::Tie,
    }
}
