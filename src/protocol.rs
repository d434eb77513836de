// JSON wire types exchanged over the WebSocket. Internally tagged on "type"
// so clients can dispatch without peeking at payload fields.

use serde::{Deserialize, Serialize};

use crate::model::{AuctionState, Player, Team};

/// Commands a client may send. Everything except `Auth` mutates auction state
/// and requires an authenticated connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Auth { token: String },
    SelectPlayer { player_id: i64 },
    PlaceBid { team: String },
    /// Finalize as sold. `team` overrides the highest bidder when present;
    /// it is how free/direct-assign (LT) players are settled.
    MarkSold {
        #[serde(default)]
        team: Option<String>,
    },
    MarkUnsold,
    SetAuctionActive { active: bool },
    SetLuckyDraw { active: bool },
    Reconcile,
}

impl ClientCommand {
    /// Whether this command changes auction state (and therefore needs an
    /// authenticated admin connection).
    pub fn is_mutating(&self) -> bool {
        !matches!(self, ClientCommand::Auth { .. })
    }
}

/// Messages the server pushes. Every connected client gets a `Snapshot` on
/// connect and another one after every state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthOk,
    Ack { detail: String },
    Error { message: String },
    Snapshot(Snapshot),
}

/// League identity shown on viewer surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueInfo {
    pub name: String,
    /// Currency code for amounts (e.g. "NPR").
    pub currency: String,
}

/// Full state of the auction, re-read from the store after each change.
/// Players arrive ordered by sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub league: LeagueInfo,
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub auction: AuctionState,
    /// The player on the block, resolved from `auction.current_player_id`.
    pub current_player: Option<Player>,
}
