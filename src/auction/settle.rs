// Settlement: turn a finalized lot into player and team record updates.
// Pure record mutation; the caller persists in order and tolerates partial
// failure (no rollback of earlier writes).

use crate::model::{Category, Player, PlayerStatus, Team};

/// Record a sale: the player is marked sold to `team` at `price`, the team's
/// purse is reduced by `price` (signed, no floor check), and exactly one
/// roster counter is incremented by the player's category.
pub fn apply_sale(player: &mut Player, team: &mut Team, price: i64) {
    player.status = Some(PlayerStatus::Sold);
    player.team_name = Some(team.name.clone());
    player.sold_price = Some(price);

    team.remaining_purse -= price;
    match player.category {
        Category::S => team.marquee_count += 1,
        Category::A => team.grade_a_count += 1,
        Category::B => team.grade_b_count += 1,
        Category::C => team.grade_c_count += 1,
        Category::Lt => team.local_talent_count += 1,
    }
}

/// Record a pass: status only. Team, price, and interest history are left
/// untouched.
pub fn apply_unsold(player: &mut Player) {
    player.status = Some(PlayerStatus::Unsold);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(category: Category) -> Player {
        Player {
            id: 1,
            sn: 1,
            first_name: "Test".into(),
            middle_name: None,
            last_name: "Player".into(),
            category,
            player_type: "Bowler".into(),
            batting_role: None,
            bowling_role: Some("Right Arm Fast".into()),
            wicket_keeper: false,
            province: "Gandaki".into(),
            base_price: 300_000,
            image_url: None,
            status: None,
            team_name: None,
            sold_price: None,
            interested_teams: vec!["janakpur_bolts".into()],
        }
    }

    fn team() -> Team {
        Team {
            id: 1,
            name: "karnali_yaks".into(),
            display_name: "Karnali Yaks".into(),
            remaining_purse: 5_000_000,
            total_purse: 5_000_000,
            marquee_count: 0,
            grade_a_count: 0,
            grade_b_count: 0,
            grade_c_count: 0,
            local_talent_count: 0,
        }
    }

    #[test]
    fn sale_records_player_and_deducts_purse() {
        let mut p = player(Category::S);
        let mut t = team();
        apply_sale(&mut p, &mut t, 1_800_000);

        assert_eq!(p.status, Some(PlayerStatus::Sold));
        assert_eq!(p.team_name.as_deref(), Some("karnali_yaks"));
        assert_eq!(p.sold_price, Some(1_800_000));
        assert_eq!(t.remaining_purse, 3_200_000);
        assert_eq!(t.marquee_count, 1);
    }

    #[test]
    fn sale_increments_exactly_one_counter() {
        let cases: [(Category, fn(&Team) -> u32); 5] = [
            (Category::S, |t| t.marquee_count),
            (Category::A, |t| t.grade_a_count),
            (Category::B, |t| t.grade_b_count),
            (Category::C, |t| t.grade_c_count),
            (Category::Lt, |t| t.local_talent_count),
        ];
        for (category, pick) in cases {
            let mut p = player(category);
            let mut t = team();
            apply_sale(&mut p, &mut t, 500_000);

            assert_eq!(pick(&t), 1, "counter for {category}");
            let total = t.marquee_count
                + t.grade_a_count
                + t.grade_b_count
                + t.grade_c_count
                + t.local_talent_count;
            assert_eq!(total, 1, "only one counter moves for {category}");
        }
    }

    #[test]
    fn purse_may_go_negative() {
        let mut p = player(Category::A);
        let mut t = team();
        t.remaining_purse = 1_000_000;
        apply_sale(&mut p, &mut t, 1_500_000);
        assert_eq!(t.remaining_purse, -500_000);
    }

    #[test]
    fn unsold_touches_status_only() {
        let mut p = player(Category::B);
        apply_unsold(&mut p);

        assert_eq!(p.status, Some(PlayerStatus::Unsold));
        assert!(p.team_name.is_none());
        assert!(p.sold_price.is_none());
        assert_eq!(p.interested_teams, vec!["janakpur_bolts".to_string()]);
    }
}
