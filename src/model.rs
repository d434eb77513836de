// Domain records: players, teams, and the singleton auction row.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player classification tier. `S` is the marquee tier, `A`/`B`/`C` are the
/// graded tiers. `LT` (local talent) players are free/direct-assign; bidding
/// is disabled for them entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    S,
    A,
    B,
    C,
    #[serde(rename = "LT")]
    Lt,
}

impl Category {
    /// Parse a category code as stored in the database / CSV ("S", "A", ...).
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "S" => Some(Category::S),
            "A" => Some(Category::A),
            "B" => Some(Category::B),
            "C" => Some(Category::C),
            "LT" => Some(Category::Lt),
            _ => None,
        }
    }

    /// The code stored in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Category::S => "S",
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
            Category::Lt => "LT",
        }
    }

    /// Human-readable tier name used by the viewer surfaces.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::S => "Marquee",
            Category::A => "Grade A",
            Category::B => "Grade B",
            Category::C => "Grade C",
            Category::Lt => "Local Talent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Settlement status of a player. Absent (`None` on the record) means the
/// player has not come up for auction yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Sold,
    Unsold,
    Retained,
}

impl PlayerStatus {
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "sold" => Some(PlayerStatus::Sold),
            "unsold" => Some(PlayerStatus::Unsold),
            "retained" => Some(PlayerStatus::Retained),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PlayerStatus::Sold => "sold",
            PlayerStatus::Unsold => "unsold",
            PlayerStatus::Retained => "retained",
        }
    }
}

/// A player in the auction pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    /// Sequence number from the published player list; display ordering key.
    pub sn: u32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub category: Category,
    /// Role string from the source list (e.g. "Batsman", "All-rounder").
    pub player_type: String,
    pub batting_role: Option<String>,
    pub bowling_role: Option<String>,
    pub wicket_keeper: bool,
    pub province: String,
    /// Starting price. Ignored for LT players, which are free/direct-assign.
    pub base_price: i64,
    pub image_url: Option<String>,
    pub status: Option<PlayerStatus>,
    /// Owning team key once sold/retained/assigned.
    pub team_name: Option<String>,
    pub sold_price: Option<i64>,
    /// Teams that engaged in bidding for this player. Append-only metadata,
    /// never authoritative for who may win.
    pub interested_teams: Vec<String>,
}

impl Player {
    /// Full display name, skipping an absent middle name.
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(mid) => format!("{} {} {}", self.first_name, mid, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Whether this player is still awaiting auction.
    pub fn is_available(&self) -> bool {
        self.status.is_none()
    }
}

/// A franchise participating in the auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    /// Stable key (e.g. "janakpur_bolts").
    pub name: String,
    pub display_name: String,
    /// Remaining budget. May go negative if misused; not defended against.
    pub remaining_purse: i64,
    pub total_purse: i64,
    pub marquee_count: u32,
    pub grade_a_count: u32,
    pub grade_b_count: u32,
    pub grade_c_count: u32,
    pub local_talent_count: u32,
}

impl Team {
    /// The roster counter matching a category. Informational caps (3/4/3 for
    /// A/B/C, 1 marquee) are a viewer concern, not enforced here.
    pub fn category_count(&self, category: Category) -> u32 {
        match category {
            Category::S => self.marquee_count,
            Category::A => self.grade_a_count,
            Category::B => self.grade_b_count,
            Category::C => self.grade_c_count,
            Category::Lt => self.local_talent_count,
        }
    }
}

/// The singleton auction row. `current_bid` and `highest_bidder` are only
/// meaningful while `current_player_id` is set; finalize clears all of them
/// together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionState {
    pub current_player_id: Option<i64>,
    pub current_bid: Option<i64>,
    pub highest_bidder: Option<String>,
    pub auction_active: bool,
    /// Cosmetic toggle shown on viewer surfaces; no settlement effect.
    pub lucky_draw_active: bool,
}

impl AuctionState {
    /// The bid amount treating "no bids yet" as zero.
    pub fn bid_or_zero(&self) -> i64 {
        self.current_bid.unwrap_or(0)
    }
}

/// Format an amount in lakhs the way the original scoreboard did
/// (e.g. 1_500_000 -> "15.0L").
pub fn format_lakh(amount: i64) -> String {
    format!("{:.1}L", amount as f64 / 100_000.0)
}
