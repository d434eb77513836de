// Orchestration: executes admin commands via the auction engines against the
// store. Multi-step writes go in settlement order (player, team, auction row)
// and earlier writes are not rolled back if a later one fails; the next
// snapshot shows whatever actually landed.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::auction::bid::{evaluate_bid, BidOutcome, BidRules};
use crate::auction::{reconcile, settle};
use crate::model::{format_lakh, AuctionState};
use crate::protocol::{ClientCommand, LeagueInfo, ServerMessage, Snapshot};
use crate::store::Store;

pub struct Auctioneer {
    store: Arc<Store>,
    rules: BidRules,
    league: LeagueInfo,
}

impl Auctioneer {
    pub fn new(store: Arc<Store>, rules: BidRules, league: LeagueInfo) -> Self {
        Self {
            store,
            rules,
            league,
        }
    }

    /// Full state read for fan-out: league identity, all players (by sequence
    /// number), all teams, the auction row, and the resolved current player.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let players = self.store.load_players()?;
        let teams = self.store.load_teams()?;
        let auction = self.store.auction_state()?;
        let current_player = auction
            .current_player_id
            .and_then(|id| players.iter().find(|p| p.id == id).cloned());
        Ok(Snapshot {
            league: self.league.clone(),
            players,
            teams,
            auction,
            current_player,
        })
    }

    /// Put a player on the block: bid reset to zero, bidder cleared, auction
    /// switched on. The lucky-draw flag is left as-is.
    pub fn select_player(&self, player_id: i64) -> Result<()> {
        let player = self
            .store
            .player(player_id)?
            .with_context(|| format!("no player with id {player_id}"))?;

        let state = self.store.auction_state()?;
        self.store.update_auction_state(&AuctionState {
            current_player_id: Some(player_id),
            current_bid: Some(0),
            highest_bidder: None,
            auction_active: true,
            lucky_draw_active: state.lucky_draw_active,
        })?;
        info!(
            player = %player.full_name(),
            sn = player.sn,
            tier = player.category.display_name(),
            "player on the block"
        );
        Ok(())
    }

    /// Evaluate and apply a bid from `team`. A raise is two separate writes
    /// (auction row, then interested-teams); an at-limit bid records interest
    /// only. Non-applying outcomes are returned for the caller to report.
    pub fn place_bid(&self, team: &str) -> Result<BidOutcome> {
        let state = self.store.auction_state()?;
        let player = match state.current_player_id {
            Some(id) => self
                .store
                .player(id)?
                .with_context(|| format!("current player {id} not found"))?,
            None => return Ok(BidOutcome::NoPlayerSelected),
        };

        let outcome = evaluate_bid(&player, &state, &self.rules);
        match outcome {
            BidOutcome::Raised { new_bid } => {
                self.store.update_auction_state(&AuctionState {
                    current_bid: Some(new_bid),
                    highest_bidder: Some(team.to_string()),
                    ..state
                })?;
                self.store.add_interested_team(player.id, team)?;
                info!(team, bid = %format_lakh(new_bid), player = %player.full_name(), "bid raised");
            }
            BidOutcome::AtLimit { ceiling } => {
                self.store.add_interested_team(player.id, team)?;
                info!(team, ceiling = %format_lakh(ceiling), player = %player.full_name(), "at limit, interest recorded");
            }
            BidOutcome::BiddingDisabled
            | BidOutcome::AuctionPaused
            | BidOutcome::NoPlayerSelected => {}
        }
        Ok(outcome)
    }

    /// Finalize the current player as sold at the current bid. An explicit
    /// `team` overrides the highest bidder; this is the only settlement path
    /// for free/direct-assign (LT) players, which never acquire a bidder and
    /// sell at a price of zero. Errors leave everything untouched.
    pub fn mark_sold(&self, team: Option<&str>) -> Result<()> {
        let state = self.store.auction_state()?;
        let player_id = match state.current_player_id {
            Some(id) => id,
            None => bail!("no player on the block"),
        };
        let winner = match (team, &state.highest_bidder) {
            (Some(team), _) => team.to_string(),
            (None, Some(bidder)) => bidder.clone(),
            (None, None) => bail!("cannot mark sold without a winning bidder"),
        };
        let price = state.bid_or_zero();

        let mut player = self
            .store
            .player(player_id)?
            .with_context(|| format!("current player {player_id} not found"))?;
        let mut team = self
            .store
            .team(&winner)?
            .with_context(|| format!("winning team `{winner}` not found"))?;

        settle::apply_sale(&mut player, &mut team, price);
        self.store.mark_player_sold(player_id, &winner, price)?;
        self.store.update_team(&team)?;
        self.clear_auction()?;
        info!(
            player = %player.full_name(),
            tier = player.category.display_name(),
            team = %winner,
            price = %format_lakh(price),
            "sold"
        );
        Ok(())
    }

    /// Finalize the current player as unsold. Status only; no team is touched.
    pub fn mark_unsold(&self) -> Result<()> {
        let state = self.store.auction_state()?;
        let player_id = state
            .current_player_id
            .context("no player on the block")?;

        let mut player = self
            .store
            .player(player_id)?
            .with_context(|| format!("current player {player_id} not found"))?;
        settle::apply_unsold(&mut player);
        self.store.mark_player_unsold(player_id)?;
        self.clear_auction()?;
        info!(player = %player.full_name(), "unsold");
        Ok(())
    }

    pub fn set_auction_active(&self, active: bool) -> Result<()> {
        let state = self.store.auction_state()?;
        self.store.update_auction_state(&AuctionState {
            auction_active: active,
            ..state
        })
    }

    pub fn set_lucky_draw(&self, active: bool) -> Result<()> {
        let state = self.store.auction_state()?;
        self.store.update_auction_state(&AuctionState {
            lucky_draw_active: active,
            ..state
        })
    }

    /// Assign teams round-robin to settled players that have none. Run once at
    /// startup and available as an admin command. A failed write is logged and
    /// skipped; the sweep continues. Returns the number of players assigned.
    pub fn reconcile(&self) -> Result<usize> {
        let teams = self.store.load_teams()?;
        if teams.is_empty() {
            warn!("reconcile skipped: no teams configured");
            return Ok(0);
        }
        let orphans = self.store.unassigned_settled_players()?;
        if orphans.is_empty() {
            return Ok(0);
        }

        let mut assigned = 0;
        for (player_id, team_name) in reconcile::assignment_plan(&orphans, &teams) {
            match self.store.assign_player_team(player_id, &team_name) {
                Ok(()) => {
                    info!(player_id, team = %team_name, "reconciled team assignment");
                    assigned += 1;
                }
                Err(err) => {
                    warn!(player_id, error = %err, "reconcile write failed, skipping");
                }
            }
        }
        Ok(assigned)
    }

    fn clear_auction(&self) -> Result<()> {
        self.store.update_auction_state(&AuctionState::default())
    }

    /// Execute a protocol command and produce the reply for that connection.
    /// Snapshot fan-out happens separately via store notifications. `Auth` is
    /// handled at the connection layer and never reaches this point.
    pub fn dispatch(&self, command: &ClientCommand) -> ServerMessage {
        let result = match command {
            ClientCommand::Auth { .. } => {
                return ServerMessage::Error {
                    message: "auth must be handled by the connection".into(),
                }
            }
            ClientCommand::SelectPlayer { player_id } => self
                .select_player(*player_id)
                .map(|()| format!("player {player_id} selected")),
            ClientCommand::PlaceBid { team } => {
                self.place_bid(team).map(|outcome| match outcome {
                    BidOutcome::Raised { new_bid } => {
                        format!("bid raised to {}", format_lakh(new_bid))
                    }
                    BidOutcome::AtLimit { ceiling } => {
                        format!("at {} limit, interest recorded", format_lakh(ceiling))
                    }
                    BidOutcome::BiddingDisabled => {
                        "bidding disabled for local talent".to_string()
                    }
                    BidOutcome::AuctionPaused => "auction is paused".to_string(),
                    BidOutcome::NoPlayerSelected => "no player selected".to_string(),
                })
            }
            ClientCommand::MarkSold { team } => self
                .mark_sold(team.as_deref())
                .map(|()| "sold".to_string()),
            ClientCommand::MarkUnsold => self.mark_unsold().map(|()| "unsold".to_string()),
            ClientCommand::SetAuctionActive { active } => self
                .set_auction_active(*active)
                .map(|()| format!("auction_active = {active}")),
            ClientCommand::SetLuckyDraw { active } => self
                .set_lucky_draw(*active)
                .map(|()| format!("lucky_draw_active = {active}")),
            ClientCommand::Reconcile => self
                .reconcile()
                .map(|n| format!("reconciled {n} player(s)")),
        };

        match result {
            Ok(detail) => ServerMessage::Ack { detail },
            Err(err) => ServerMessage::Error {
                message: format!("{err:#}"),
            },
        }
    }
}
