//! Assembling the round's story from the chosen cards.

use std::collections::BTreeMap;

use fable_core::role::RoleType;

use super::participant::Participant;
use super::round::Submission;

/// Wraps a card's fragment in the connective text for its role.
fn connective(role: RoleType, fragment: &str) -> String {
    match role {
        RoleType::Location => format!("Once upon a time, in {fragment},"),
        RoleType::Character => format!("there lived {fragment}."),
        RoleType::Complication => format!("One day, {fragment}."),
        RoleType::Escalation => format!("Because of that, {fragment}."),
        RoleType::Resolution => format!("Finally, {fragment}."),
    }
}

/// Card text without surrounding whitespace or trailing punctuation, so the
/// connective controls sentence breaks.
fn fragment(text: &str) -> &str {
    text.trim().trim_end_matches(['.', '!', ',', ';'])
}

/// Builds the narrative from every participant's selected card, in role
/// order. Roles nobody selected for are left out.
#[must_use]
pub fn assemble(participants: &[Participant]) -> String {
    let mut by_role: BTreeMap<RoleType, &str> = BTreeMap::new();
    for participant in participants {
        if let (Some(role), Some(card)) = (participant.role, participant.selected_card()) {
            by_role.entry(role).or_insert_with(|| fragment(&card.text));
        }
    }

    let story = RoleType::ALL
        .iter()
        .filter_map(|role| by_role.get(role).map(|text| connective(*role, text)))
        .collect::<Vec<_>>()
        .join(" ");

    capitalize_first(&story)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Creates a fresh submission for every participant that has selected a
/// card.
#[must_use]
pub fn seed_submissions(participants: &[Participant]) -> Vec<Submission> {
    participants
        .iter()
        .filter_map(|participant| {
            participant
                .selected_card_id
                .map(|card_id| Submission::new(participant.id, card_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::{Card, CardId};
    use fable_core::deck::DeckCard;
    use uuid::Uuid;

    fn picked(role: RoleType, id: u32, text: &str) -> Participant {
        let mut participant = Participant::simulated(Uuid::new_v4(), 0);
        participant.role = Some(role);
        participant.hand = vec![Card::from_deck(
            &DeckCard {
                id,
                text: text.to_owned(),
            },
            role,
        )];
        participant.selected_card_id = Some(CardId(id));
        participant
    }

    #[test]
    fn test_assemble_orders_fragments_by_role() {
        let participants = vec![
            picked(RoleType::Resolution, 5, "everyone went home"),
            picked(RoleType::Character, 2, "a grumpy baker."),
            picked(RoleType::Location, 1, "a floating market"),
            picked(RoleType::Escalation, 4, "the bread came alive"),
            picked(RoleType::Complication, 3, "the oven broke"),
        ];

        let story = assemble(&participants);

        assert_eq!(
            story,
            "Once upon a time, in a floating market, there lived a grumpy baker. \
             One day, the oven broke. Because of that, the bread came alive. \
             Finally, everyone went home."
        );
    }

    #[test]
    fn test_assemble_omits_missing_roles() {
        let participants = vec![
            picked(RoleType::Complication, 3, "the oven broke"),
            picked(RoleType::Resolution, 5, "everyone went home"),
        ];

        let story = assemble(&participants);

        assert_eq!(story, "One day, the oven broke. Finally, everyone went home.");
    }

    #[test]
    fn test_assemble_with_no_selections_is_empty() {
        let mut participant = picked(RoleType::Location, 1, "a cave");
        participant.selected_card_id = None;

        assert_eq!(assemble(&[participant]), "");
    }

    #[test]
    fn test_seed_submissions_creates_one_clean_record_per_selection() {
        let participants = vec![
            picked(RoleType::Location, 1, "a cave"),
            picked(RoleType::Character, 2, "a bat"),
        ];

        let submissions = seed_submissions(&participants);

        assert_eq!(submissions.len(), 2);
        for (submission, participant) in submissions.iter().zip(&participants) {
            assert_eq!(submission.participant_id, participant.id);
            assert_eq!(Some(submission.card_id), participant.selected_card_id);
            assert!(submission.moral.is_none());
            assert_eq!(submission.votes, 0);
            assert!(!submission.has_voted);
        }
    }
}
