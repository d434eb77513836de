// Bid evaluation: ceilings, increments, and the first-bid snap to base price.
// Pure rules; the caller applies the resulting writes.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::RulesConfig;
use crate::model::{AuctionState, Category, Player};

/// Ceiling and increment tables, resolved from config. A category absent from
/// the ceiling table bids unbounded; a category absent from the increment
/// table falls back to the default step.
#[derive(Debug, Clone)]
pub struct BidRules {
    ceilings: HashMap<Category, i64>,
    increments: HashMap<Category, i64>,
    default_increment: i64,
}

impl BidRules {
    /// Build the tables from validated config. Unknown category codes were
    /// already rejected by config validation and are silently skipped here.
    pub fn from_config(rules: &RulesConfig) -> Self {
        let ceilings = rules
            .ceilings
            .iter()
            .filter_map(|(code, amount)| Category::from_code(code).map(|c| (c, *amount)))
            .collect();
        let increments = rules
            .increments
            .iter()
            .filter_map(|(code, amount)| Category::from_code(code).map(|c| (c, *amount)))
            .collect();
        Self {
            ceilings,
            increments,
            default_increment: rules.default_increment,
        }
    }

    /// Maximum bid for a category, if one is configured.
    pub fn ceiling(&self, category: Category) -> Option<i64> {
        self.ceilings.get(&category).copied()
    }

    /// Raise step for a category.
    pub fn increment(&self, category: Category) -> i64 {
        self.increments
            .get(&category)
            .copied()
            .unwrap_or(self.default_increment)
    }
}

/// What a bid attempt should do. `Raised` and `AtLimit` both record the
/// bidding team in the player's interested-teams set; only `Raised` moves
/// the price and the highest bidder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BidOutcome {
    /// Accept: set `current_bid` to `new_bid` and the team as highest bidder.
    Raised { new_bid: i64 },
    /// Price is at or above the category ceiling: record interest only.
    AtLimit { ceiling: i64 },
    /// Local-talent players are direct-assign; no bidding at all.
    BiddingDisabled,
    /// The auction flag is off; bids are rejected until it is re-enabled.
    AuctionPaused,
    /// No player on the block, or the bid targets a different player.
    NoPlayerSelected,
}

/// Evaluate a bid on `player` against the live auction row.
///
/// The first bid on a player lands exactly at `base_price` regardless of the
/// increment table; subsequent bids step by the category increment until the
/// ceiling is reached.
pub fn evaluate_bid(player: &Player, state: &AuctionState, rules: &BidRules) -> BidOutcome {
    if state.current_player_id != Some(player.id) {
        return BidOutcome::NoPlayerSelected;
    }
    if !state.auction_active {
        return BidOutcome::AuctionPaused;
    }
    if player.category == Category::Lt {
        return BidOutcome::BiddingDisabled;
    }

    let current = state.bid_or_zero();
    if current == 0 {
        return BidOutcome::Raised {
            new_bid: player.base_price,
        };
    }

    if let Some(ceiling) = rules.ceiling(player.category) {
        if current >= ceiling {
            return BidOutcome::AtLimit { ceiling };
        }
    }

    BidOutcome::Raised {
        new_bid: current + rules.increment(player.category),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_rules() -> BidRules {
        BidRules::from_config(&RulesConfig::default())
    }

    fn player(category: Category, base_price: i64) -> Player {
        Player {
            id: 1,
            sn: 1,
            first_name: "Test".into(),
            middle_name: None,
            last_name: "Player".into(),
            category,
            player_type: "Batsman".into(),
            batting_role: None,
            bowling_role: None,
            wicket_keeper: false,
            province: "Bagmati".into(),
            base_price,
            image_url: None,
            status: None,
            team_name: None,
            sold_price: None,
            interested_teams: vec![],
        }
    }

    fn live_state(player_id: i64, bid: i64) -> AuctionState {
        AuctionState {
            current_player_id: Some(player_id),
            current_bid: Some(bid),
            highest_bidder: if bid > 0 { Some("someone".into()) } else { None },
            auction_active: true,
            lucky_draw_active: false,
        }
    }

    #[test]
    fn first_bid_snaps_to_base_price() {
        let p = player(Category::B, 300_000);
        let outcome = evaluate_bid(&p, &live_state(1, 0), &default_rules());
        assert_eq!(outcome, BidOutcome::Raised { new_bid: 300_000 });

        // Null bid behaves the same as zero.
        let mut state = live_state(1, 0);
        state.current_bid = None;
        let outcome = evaluate_bid(&p, &state, &default_rules());
        assert_eq!(outcome, BidOutcome::Raised { new_bid: 300_000 });
    }

    #[test]
    fn subsequent_bids_step_by_category_increment() {
        let rules = default_rules();

        let b = player(Category::B, 300_000);
        assert_eq!(
            evaluate_bid(&b, &live_state(1, 300_000), &rules),
            BidOutcome::Raised { new_bid: 325_000 }
        );

        // Grade A carries the larger step.
        let a = player(Category::A, 500_000);
        assert_eq!(
            evaluate_bid(&a, &live_state(1, 500_000), &rules),
            BidOutcome::Raised { new_bid: 550_000 }
        );
    }

    #[test]
    fn at_ceiling_bids_do_not_raise() {
        let rules = default_rules();
        let p = player(Category::B, 300_000);
        assert_eq!(
            evaluate_bid(&p, &live_state(1, 1_000_000), &rules),
            BidOutcome::AtLimit { ceiling: 1_000_000 }
        );
        // Above the ceiling behaves the same as at it.
        assert_eq!(
            evaluate_bid(&p, &live_state(1, 1_200_000), &rules),
            BidOutcome::AtLimit { ceiling: 1_000_000 }
        );
    }

    #[test]
    fn category_without_ceiling_bids_unbounded() {
        let mut config = RulesConfig::default();
        config.ceilings.remove("B");
        let rules = BidRules::from_config(&config);

        let p = player(Category::B, 300_000);
        assert_eq!(
            evaluate_bid(&p, &live_state(1, 50_000_000), &rules),
            BidOutcome::Raised { new_bid: 50_025_000 }
        );
    }

    #[test]
    fn local_talent_bidding_disabled() {
        let p = player(Category::Lt, 0);
        assert_eq!(
            evaluate_bid(&p, &live_state(1, 0), &default_rules()),
            BidOutcome::BiddingDisabled
        );
    }

    #[test]
    fn paused_auction_rejects_bids() {
        let p = player(Category::A, 500_000);
        let mut state = live_state(1, 500_000);
        state.auction_active = false;
        assert_eq!(
            evaluate_bid(&p, &state, &default_rules()),
            BidOutcome::AuctionPaused
        );
    }

    #[test]
    fn bid_without_current_player_is_rejected() {
        let p = player(Category::A, 500_000);
        let mut state = live_state(1, 0);
        state.current_player_id = None;
        assert_eq!(
            evaluate_bid(&p, &state, &default_rules()),
            BidOutcome::NoPlayerSelected
        );

        // Bid for a player other than the one on the block.
        let stale = live_state(42, 500_000);
        assert_eq!(
            evaluate_bid(&p, &stale, &default_rules()),
            BidOutcome::NoPlayerSelected
        );
    }

    #[test]
    fn grade_b_walkthrough_to_ceiling() {
        let rules = default_rules();
        let p = player(Category::B, 300_000);

        let mut bid = 0;
        match evaluate_bid(&p, &live_state(1, bid), &rules) {
            BidOutcome::Raised { new_bid } => bid = new_bid,
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(bid, 300_000);

        match evaluate_bid(&p, &live_state(1, bid), &rules) {
            BidOutcome::Raised { new_bid } => bid = new_bid,
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(bid, 325_000);

        while let BidOutcome::Raised { new_bid } = evaluate_bid(&p, &live_state(1, bid), &rules) {
            bid = new_bid;
        }
        assert_eq!(bid, 1_000_000);
        assert_eq!(
            evaluate_bid(&p, &live_state(1, bid), &rules),
            BidOutcome::AtLimit { ceiling: 1_000_000 }
        );
    }
}
