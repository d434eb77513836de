// SQLite persistence for players, teams, and the singleton auction row.
//
// Every successful mutation publishes the changed table on a broadcast
// channel. Subscribers are expected to respond by re-reading a full snapshot
// (there is no payload beyond the table name); a missed notification is
// corrected by the next one.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;

use crate::config::TeamSeed;
use crate::model::{AuctionState, Category, Player, PlayerStatus, Team};

/// Which collection changed. Carried on the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Players,
    Teams,
    Auction,
}

/// A player row as provided by the roster import (auction fields excluded).
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub sn: u32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub category: Category,
    pub player_type: String,
    pub batting_role: Option<String>,
    pub bowling_role: Option<String>,
    pub wicket_keeper: bool,
    pub province: String,
    pub base_price: i64,
    pub image_url: Option<String>,
}

/// SQLite-backed store. All access goes through a single connection behind a
/// mutex; the auction has one logical writer, so contention is not a concern.
pub struct Store {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<Change>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                sn               INTEGER NOT NULL UNIQUE,
                first_name       TEXT NOT NULL,
                middle_name      TEXT,
                last_name        TEXT NOT NULL,
                category         TEXT NOT NULL,
                player_type      TEXT NOT NULL,
                batting_role     TEXT,
                bowling_role     TEXT,
                wicket_keeper    INTEGER NOT NULL DEFAULT 0,
                province         TEXT NOT NULL,
                base_price       INTEGER NOT NULL,
                image_url        TEXT,
                status           TEXT,
                team_name        TEXT,
                sold_price       INTEGER,
                interested_teams TEXT NOT NULL DEFAULT '[]',
                updated_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS teams (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                name               TEXT NOT NULL UNIQUE,
                display_name       TEXT NOT NULL,
                remaining_purse    INTEGER NOT NULL,
                total_purse        INTEGER NOT NULL,
                marquee_count      INTEGER NOT NULL DEFAULT 0,
                grade_a_count      INTEGER NOT NULL DEFAULT 0,
                grade_b_count      INTEGER NOT NULL DEFAULT 0,
                grade_c_count      INTEGER NOT NULL DEFAULT 0,
                local_talent_count INTEGER NOT NULL DEFAULT 0,
                updated_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS auction_state (
                id                INTEGER PRIMARY KEY CHECK (id = 1),
                current_player_id INTEGER REFERENCES players(id),
                current_bid       INTEGER,
                highest_bidder    TEXT,
                auction_active    INTEGER NOT NULL DEFAULT 0,
                lucky_draw_active INTEGER NOT NULL DEFAULT 0,
                updated_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            INSERT OR IGNORE INTO auction_state (id) VALUES (1);
            ",
        )
        .context("failed to create database schema")?;

        let (changes, _) = broadcast::channel(64);

        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    /// Subscribe to change notifications. Each event names a table whose rows
    /// changed; subscribers should re-fetch a full snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    fn notify(&self, change: Change) {
        // No subscribers is fine (e.g. during startup or in unit tests).
        let _ = self.changes.send(change);
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    /// Seed the team table from config. Idempotent: existing rows (matched by
    /// key) are left untouched so purses and counters survive restarts.
    /// Returns the number of newly inserted teams.
    pub fn seed_teams(&self, seeds: &[TeamSeed]) -> Result<usize> {
        let mut inserted = 0;
        {
            let conn = self.conn();
            for seed in seeds {
                let n = conn
                    .execute(
                        "INSERT OR IGNORE INTO teams (name, display_name, remaining_purse, total_purse)
                         VALUES (?1, ?2, ?3, ?3)",
                        params![seed.name, seed.display_name, seed.purse],
                    )
                    .with_context(|| format!("failed to seed team `{}`", seed.name))?;
                inserted += n;
            }
        }
        if inserted > 0 {
            self.notify(Change::Teams);
        }
        Ok(inserted)
    }

    /// Load all teams in natural fetch order (insertion order).
    pub fn load_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, display_name, remaining_purse, total_purse,
                        marquee_count, grade_a_count, grade_b_count, grade_c_count,
                        local_talent_count
                 FROM teams ORDER BY id",
            )
            .context("failed to prepare load_teams query")?;

        let teams = stmt
            .query_map([], row_to_team)
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;
        Ok(teams)
    }

    /// Look up a team by its stable key.
    pub fn team(&self, name: &str) -> Result<Option<Team>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, display_name, remaining_purse, total_purse,
                    marquee_count, grade_a_count, grade_b_count, grade_c_count,
                    local_talent_count
             FROM teams WHERE name = ?1",
            params![name],
            row_to_team,
        )
        .optional()
        .with_context(|| format!("failed to load team `{name}`"))
    }

    /// Write back a team's purse and roster counters after settlement.
    pub fn update_team(&self, team: &Team) -> Result<()> {
        let updated = {
            let conn = self.conn();
            conn.execute(
                "UPDATE teams SET remaining_purse = ?2, marquee_count = ?3,
                        grade_a_count = ?4, grade_b_count = ?5, grade_c_count = ?6,
                        local_talent_count = ?7, updated_at = ?8
                 WHERE name = ?1",
                params![
                    team.name,
                    team.remaining_purse,
                    team.marquee_count,
                    team.grade_a_count,
                    team.grade_b_count,
                    team.grade_c_count,
                    team.local_talent_count,
                    Self::now(),
                ],
            )
            .with_context(|| format!("failed to update team `{}`", team.name))?
        };
        if updated == 0 {
            anyhow::bail!("team `{}` does not exist", team.name);
        }
        self.notify(Change::Teams);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Insert a player or update their bio fields if the sequence number is
    /// already present. Auction fields (status, team, price, interest) are
    /// never touched by the upsert. Returns the player's row id.
    pub fn upsert_player(&self, player: &NewPlayer) -> Result<i64> {
        let id = {
            let conn = self.conn();
            conn.query_row(
                "INSERT INTO players (sn, first_name, middle_name, last_name, category,
                                      player_type, batting_role, bowling_role, wicket_keeper,
                                      province, base_price, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(sn) DO UPDATE SET
                    first_name    = excluded.first_name,
                    middle_name   = excluded.middle_name,
                    last_name     = excluded.last_name,
                    category      = excluded.category,
                    player_type   = excluded.player_type,
                    batting_role  = excluded.batting_role,
                    bowling_role  = excluded.bowling_role,
                    wicket_keeper = excluded.wicket_keeper,
                    province      = excluded.province,
                    base_price    = excluded.base_price,
                    image_url     = excluded.image_url
                 RETURNING id",
                params![
                    player.sn,
                    player.first_name,
                    player.middle_name,
                    player.last_name,
                    player.category.code(),
                    player.player_type,
                    player.batting_role,
                    player.bowling_role,
                    player.wicket_keeper,
                    player.province,
                    player.base_price,
                    player.image_url,
                ],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to upsert player sn={}", player.sn))?
        };
        self.notify(Change::Players);
        Ok(id)
    }

    /// Load all players ordered by sequence number.
    pub fn load_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PLAYER_COLUMNS} FROM players ORDER BY sn"
            ))
            .context("failed to prepare load_players query")?;

        let players = stmt
            .query_map([], row_to_player)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    /// Look up a single player by id.
    pub fn player(&self, id: i64) -> Result<Option<Player>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
            params![id],
            row_to_player,
        )
        .optional()
        .with_context(|| format!("failed to load player {id}"))
    }

    /// Append `team` to a player's interested-teams set, if not already
    /// present, as a single statement. The `json_each` guard makes this an
    /// atomic append-if-absent: two concurrent calls cannot lose an entry the
    /// way a client-side read-modify-write can. Returns `true` if appended.
    pub fn add_interested_team(&self, player_id: i64, team: &str) -> Result<bool> {
        let updated = {
            let conn = self.conn();
            conn.execute(
                "UPDATE players
                    SET interested_teams = json_insert(interested_teams, '$[#]', ?2),
                        updated_at = ?3
                  WHERE id = ?1
                    AND NOT EXISTS (
                        SELECT 1 FROM json_each(players.interested_teams)
                        WHERE json_each.value = ?2
                    )",
                params![player_id, team, Self::now()],
            )
            .with_context(|| format!("failed to record interest for player {player_id}"))?
        };
        if updated > 0 {
            self.notify(Change::Players);
        }
        Ok(updated > 0)
    }

    /// Record a sale on the player row: status, owning team, and final price.
    pub fn mark_player_sold(&self, player_id: i64, team: &str, price: i64) -> Result<()> {
        self.update_player_status(
            player_id,
            PlayerStatus::Sold,
            Some(team),
            Some(price),
        )
    }

    /// Record a pass on the player row. Team and price are left untouched.
    pub fn mark_player_unsold(&self, player_id: i64) -> Result<()> {
        self.update_player_status(player_id, PlayerStatus::Unsold, None, None)
    }

    /// Backfill a team assignment without touching status or price. Used by
    /// the assignment reconciler.
    pub fn assign_player_team(&self, player_id: i64, team: &str) -> Result<()> {
        let updated = {
            let conn = self.conn();
            conn.execute(
                "UPDATE players SET team_name = ?2, updated_at = ?3 WHERE id = ?1",
                params![player_id, team, Self::now()],
            )
            .with_context(|| format!("failed to assign team for player {player_id}"))?
        };
        if updated == 0 {
            anyhow::bail!("player {player_id} does not exist");
        }
        self.notify(Change::Players);
        Ok(())
    }

    fn update_player_status(
        &self,
        player_id: i64,
        status: PlayerStatus,
        team: Option<&str>,
        price: Option<i64>,
    ) -> Result<()> {
        let updated = {
            let conn = self.conn();
            match (team, price) {
                (Some(team), Some(price)) => conn.execute(
                    "UPDATE players SET status = ?2, team_name = ?3, sold_price = ?4,
                            updated_at = ?5
                     WHERE id = ?1",
                    params![player_id, status.code(), team, price, Self::now()],
                ),
                _ => conn.execute(
                    "UPDATE players SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![player_id, status.code(), Self::now()],
                ),
            }
            .with_context(|| format!("failed to update status for player {player_id}"))?
        };
        if updated == 0 {
            anyhow::bail!("player {player_id} does not exist");
        }
        self.notify(Change::Players);
        Ok(())
    }

    /// Players that settled (sold or retained) without a recorded team.
    /// These are the reconciler's work list, in id order.
    pub fn unassigned_settled_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PLAYER_COLUMNS} FROM players
                 WHERE status IN ('sold', 'retained')
                   AND (team_name IS NULL OR team_name = '')
                 ORDER BY id"
            ))
            .context("failed to prepare unassigned players query")?;

        let players = stmt
            .query_map([], row_to_player)
            .context("failed to query unassigned players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map unassigned player rows")?;
        Ok(players)
    }

    // ------------------------------------------------------------------
    // Auction state
    // ------------------------------------------------------------------

    /// Read the singleton auction row.
    pub fn auction_state(&self) -> Result<AuctionState> {
        let conn = self.conn();
        conn.query_row(
            "SELECT current_player_id, current_bid, highest_bidder,
                    auction_active, lucky_draw_active
             FROM auction_state WHERE id = 1",
            [],
            |row| {
                Ok(AuctionState {
                    current_player_id: row.get(0)?,
                    current_bid: row.get(1)?,
                    highest_bidder: row.get(2)?,
                    auction_active: row.get(3)?,
                    lucky_draw_active: row.get(4)?,
                })
            },
        )
        .context("failed to load auction state")
    }

    /// Overwrite the singleton auction row. Last write wins; there is no
    /// optimistic-concurrency token by design.
    pub fn update_auction_state(&self, state: &AuctionState) -> Result<()> {
        {
            let conn = self.conn();
            conn.execute(
                "UPDATE auction_state
                    SET current_player_id = ?1, current_bid = ?2, highest_bidder = ?3,
                        auction_active = ?4, lucky_draw_active = ?5, updated_at = ?6
                  WHERE id = 1",
                params![
                    state.current_player_id,
                    state.current_bid,
                    state.highest_bidder,
                    state.auction_active,
                    state.lucky_draw_active,
                    Self::now(),
                ],
            )
            .context("failed to update auction state")?;
        }
        self.notify(Change::Auction);
        Ok(())
    }
}

const PLAYER_COLUMNS: &str = "id, sn, first_name, middle_name, last_name, category, \
     player_type, batting_role, bowling_role, wicket_keeper, province, base_price, \
     image_url, status, team_name, sold_price, interested_teams";

fn row_to_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    let category_code: String = row.get(5)?;
    let category = Category::from_code(&category_code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown category `{category_code}`").into(),
        )
    })?;

    let status_code: Option<String> = row.get(13)?;
    let status = status_code.as_deref().and_then(PlayerStatus::from_code);

    let interested_json: String = row.get(16)?;
    let interested_teams =
        serde_json::from_str::<Vec<String>>(&interested_json).unwrap_or_default();

    Ok(Player {
        id: row.get(0)?,
        sn: row.get(1)?,
        first_name: row.get(2)?,
        middle_name: row.get(3)?,
        last_name: row.get(4)?,
        category,
        player_type: row.get(6)?,
        batting_role: row.get(7)?,
        bowling_role: row.get(8)?,
        wicket_keeper: row.get(9)?,
        province: row.get(10)?,
        base_price: row.get(11)?,
        image_url: row.get(12)?,
        status,
        team_name: row.get(14)?,
        sold_price: row.get(15)?,
        interested_teams,
    })
}

fn row_to_team(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        remaining_purse: row.get(3)?,
        total_purse: row.get(4)?,
        marquee_count: row.get(5)?,
        grade_a_count: row.get(6)?,
        grade_b_count: row.get(7)?,
        grade_c_count: row.get(8)?,
        local_talent_count: row.get(9)?,
    })
}
