// Roster repair: assign teams to sold/retained players that ended up without
// one. Data maintenance only; purses and counters are deliberately ignored.

use crate::model::{Player, Team};

/// Plan round-robin assignments for settled players lacking a team.
///
/// `players` is the pre-filtered work list (settled, no team) in stable
/// order; teams are cycled in their natural fetch order. Returns
/// `(player_id, team_name)` pairs. Empty team list plans nothing.
pub fn assignment_plan(players: &[Player], teams: &[Team]) -> Vec<(i64, String)> {
    if teams.is_empty() {
        return Vec::new();
    }
    players
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, teams[i % teams.len()].name.clone()))
        .collect()
}
