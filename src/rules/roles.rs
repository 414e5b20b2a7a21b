use crate::types::{ParticipantId, Role};
use rand::seq::SliceRandom;
use rand::Rng;

/// Partition participants into impostors and crewmates.
///
/// The ids are shuffled uniformly (Fisher-Yates) and the first
/// `impostors` entries become impostors. `impostors >= ids.len()` makes
/// everyone an impostor; callers that want to forbid that must check
/// before calling.
pub fn assign_roles<R: Rng + ?Sized>(
    ids: &[ParticipantId],
    impostors: usize,
    rng: &mut R,
) -> Vec<(ParticipantId, Role)> {
    let mut shuffled = ids.to_vec();
    shuffled.shuffle(rng);

    shuffled
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            let role = if index < impostors {
                Role::Impostor
            } else {
                Role::Crewmate
            };
            (id, role)
        })
        .collect()
}
