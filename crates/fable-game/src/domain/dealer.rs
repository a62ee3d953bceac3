//! Dealing hands for a round.

use fable_core::deck::DeckProvider;
use fable_core::rng::DeterministicRng;
use fable_core::role::RoleType;

use super::card::{Card, CardId};
use super::participant::ParticipantKind;
use super::random::index_in;

/// How hands are dealt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DealRules {
    /// Cards per hand.
    pub hand_size: usize,
    /// Probability that a human's hand has one card swapped for a blank.
    pub custom_card_chance: f64,
}

/// Deals a hand of unique cards for `role`.
///
/// Human hands may have one card replaced by a blank custom card. Custom ids
/// come from `next_custom_id`, which starts in the reserved id range and is
/// advanced for every blank dealt.
pub fn deal_hand(
    deck: &dyn DeckProvider,
    role: RoleType,
    kind: ParticipantKind,
    rules: DealRules,
    next_custom_id: &mut u32,
    rng: &mut dyn DeterministicRng,
) -> Vec<Card> {
    let candidates = deck.cards(role);
    let take = rules.hand_size.min(candidates.len());

    // Partial Fisher–Yates over candidate indices.
    let mut indices: Vec<usize> = (0..candidates.len()).collect();
    for i in 0..take {
        let j = index_in(rng, i, candidates.len() - 1);
        indices.swap(i, j);
    }

    let mut hand: Vec<Card> = indices[..take]
        .iter()
        .map(|&index| Card::from_deck(&candidates[index], role))
        .collect();

    if kind == ParticipantKind::Human
        && !hand.is_empty()
        && rng.next_f64() < rules.custom_card_chance
    {
        let slot = index_in(rng, 0, hand.len() - 1);
        hand[slot] = Card::blank(CardId(*next_custom_id), role);
        *next_custom_id = next_custom_id.saturating_add(1);
    }

    hand
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use fable_core::deck::CUSTOM_CARD_ID_BASE;
    use fable_core::rng::SystemRng;
    use fable_test_support::{InMemoryDeck, MockRng, SequenceRng};

    const RULES: DealRules = DealRules {
        hand_size: 3,
        custom_card_chance: 0.2,
    };

    #[test]
    fn test_hand_has_three_unique_cards_of_the_role() {
        let deck = InMemoryDeck::default();
        let mut rng = SystemRng::seeded(9);
        let mut next_custom = CUSTOM_CARD_ID_BASE;

        for _ in 0..50 {
            let hand = deal_hand(
                &deck,
                RoleType::Character,
                ParticipantKind::Simulated,
                RULES,
                &mut next_custom,
                &mut rng,
            );
            assert_eq!(hand.len(), 3);
            let ids: BTreeSet<CardId> = hand.iter().map(|c| c.id).collect();
            assert_eq!(ids.len(), 3);
            assert!(hand.iter().all(|c| c.role == RoleType::Character));
        }
    }

    #[test]
    fn test_simulated_hands_never_get_custom_cards() {
        let deck = InMemoryDeck::default();
        let mut next_custom = CUSTOM_CARD_ID_BASE;

        // MockRng rolls 0.0, which would always trigger the custom card.
        let hand = deal_hand(
            &deck,
            RoleType::Location,
            ParticipantKind::Simulated,
            RULES,
            &mut next_custom,
            &mut MockRng,
        );

        assert!(hand.iter().all(|c| !c.is_custom));
        assert_eq!(next_custom, CUSTOM_CARD_ID_BASE);
    }

    #[test]
    fn test_human_custom_card_uses_reserved_id_range() {
        let deck = InMemoryDeck::default();
        let mut next_custom = CUSTOM_CARD_ID_BASE;

        let hand = deal_hand(
            &deck,
            RoleType::Resolution,
            ParticipantKind::Human,
            RULES,
            &mut next_custom,
            &mut MockRng,
        );

        let custom: Vec<&Card> = hand.iter().filter(|c| c.is_custom).collect();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].id, CardId(CUSTOM_CARD_ID_BASE));
        assert!(custom[0].id.is_custom_range());
        assert!(custom[0].text.is_empty());
        assert_eq!(custom[0].custom_prompt.as_deref(), Some("How does it end?"));
        assert_eq!(next_custom, CUSTOM_CARD_ID_BASE + 1);
    }

    #[test]
    fn test_human_without_chance_roll_keeps_deck_cards() {
        let deck = InMemoryDeck::default();
        let mut next_custom = CUSTOM_CARD_ID_BASE;

        // SequenceRng rolls 0.99 for chances.
        let hand = deal_hand(
            &deck,
            RoleType::Resolution,
            ParticipantKind::Human,
            RULES,
            &mut next_custom,
            &mut SequenceRng::new(vec![]),
        );

        assert!(hand.iter().all(|c| !c.is_custom && !c.id.is_custom_range()));
    }

    #[test]
    fn test_small_deck_deals_what_it_has() {
        let deck = InMemoryDeck::with_cards_per_role(2);
        let mut next_custom = CUSTOM_CARD_ID_BASE;

        let hand = deal_hand(
            &deck,
            RoleType::Escalation,
            ParticipantKind::Simulated,
            RULES,
            &mut next_custom,
            &mut MockRng,
        );

        assert_eq!(hand.len(), 2);
    }
}
