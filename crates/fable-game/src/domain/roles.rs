//! Role rotation across rounds.

use fable_core::rng::DeterministicRng;
use fable_core::role::RoleType;
use uuid::Uuid;

use super::random::shuffle;

/// Assigns a role to every participant for the given round.
///
/// The participant order is shuffled, then the `i`-th participant receives
/// `RoleType::ALL[(i + offset) % COUNT]` with `offset = (round - 1) % COUNT`.
/// With as many participants as roles, each role is used exactly once.
///
/// `previous` is last round's assignment. If the shuffle happens to
/// reproduce it, the roles are shifted one further so that consecutive
/// rounds never share the same assignment.
pub fn assign_roles(
    participant_ids: &[Uuid],
    round_number: u32,
    previous: &[(Uuid, RoleType)],
    rng: &mut dyn DeterministicRng,
) -> Vec<(Uuid, RoleType)> {
    let mut order = participant_ids.to_vec();
    shuffle(&mut order, rng);

    let offset = usize::try_from(round_number.saturating_sub(1)).unwrap_or(0) % RoleType::COUNT;
    let assignment = rotate(&order, offset);
    if same_assignment(&assignment, previous) {
        return rotate(&order, offset + 1);
    }
    assignment
}

fn rotate(order: &[Uuid], offset: usize) -> Vec<(Uuid, RoleType)> {
    order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, RoleType::ALL[(index + offset) % RoleType::COUNT]))
        .collect()
}

fn same_assignment(current: &[(Uuid, RoleType)], previous: &[(Uuid, RoleType)]) -> bool {
    !current.is_empty()
        && current
            .iter()
            .all(|entry| previous.iter().any(|earlier| earlier == entry))
}
