// ── Public state snapshot ──
//
// Everything the UI renders from, replaced as a whole on every successful
// fetch so readers never observe fields from two different cycles.

use chrono::{DateTime, Utc};
use microsdeck_api::CardAndGames;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Result of the most recent health check.
    pub enabled: bool,
    pub backend_version: Option<String>,
    /// The card currently inserted, if any.
    pub current_card_and_games: Option<CardAndGames>,
    /// Every known card in backend order.
    pub cards_and_games: Vec<CardAndGames>,
    /// When the card data was last replaced. `None` until the first
    /// successful fetch, which lets a UI tell "loading" from "no cards".
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_loaded(&self) -> bool {
        self.refreshed_at.is_some()
    }

    /// Cards in display order. Positions need not be dense or unique; ties
    /// keep backend order.
    pub fn sorted_cards(&self) -> Vec<&CardAndGames> {
        let mut cards: Vec<_> = self.cards_and_games.iter().collect();
        cards.sort_by_key(|cg| cg.card.position);
        cards
    }

    pub fn card(&self, uid: &str) -> Option<&CardAndGames> {
        self.cards_and_games.iter().find(|cg| cg.card.uid == uid)
    }

    pub fn is_current(&self, uid: &str) -> bool {
        self.current_card_and_games
            .as_ref()
            .is_some_and(|cg| cg.card.uid == uid)
    }
}

#[cfg(test)]
mod tests {
    use microsdeck_api::Card;

    use super::*;

    fn entry(uid: &str, position: u32) -> CardAndGames {
        CardAndGames {
            card: Card {
                position,
                ..Card::new(uid, uid)
            },
            games: Vec::new(),
        }
    }

    #[test]
    fn sorted_cards_orders_by_position_keeping_ties_stable() {
        let snapshot = Snapshot {
            cards_and_games: vec![entry("c", 2), entry("a", 0), entry("b", 2), entry("d", 1)],
            ..Snapshot::default()
        };
        let order: Vec<_> = snapshot
            .sorted_cards()
            .iter()
            .map(|cg| cg.card.uid.as_str())
            .collect();
        assert_eq!(order, vec!["a", "d", "c", "b"]);
    }

    #[test]
    fn default_snapshot_is_not_loaded() {
        let snapshot = Snapshot::default();
        assert!(!snapshot.is_loaded());
        assert!(!snapshot.enabled);
        assert!(snapshot.card("a").is_none());
    }

    #[test]
    fn is_current_matches_inserted_card() {
        let snapshot = Snapshot {
            current_card_and_games: Some(entry("a", 0)),
            cards_and_games: vec![entry("a", 0), entry("b", 1)],
            ..Snapshot::default()
        };
        assert!(snapshot.is_current("a"));
        assert!(!snapshot.is_current("b"));
        assert_eq!(snapshot.card("b").map(|cg| cg.card.position), Some(1));
    }
}
