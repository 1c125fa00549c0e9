use matchday_features::error::ExportError;
use matchday_features::matches::Match;
use matchday_features::standings::{POINTS_FOR_DRAW, POINTS_FOR_WIN, StandingsTable};

fn played(home: &str, away: &str, hg: u32, ag: u32, round: u32) -> Match {
    Match::played(home, away, hg, ag, round).expect("valid match")
}

#[test]
fn home_win_ranks_winner_first() {
    let mut table = StandingsTable::new(["AAA", "BBB"]);
    table.add_match(&played("AAA", "BBB", 2, 1, 1)).unwrap();
    table.finalize_round(1).unwrap();

    let home = table.row(1, "AAA").unwrap();
    assert_eq!(home.games_played, 1);
    assert_eq!(home.games_won, 1);
    assert_eq!(home.points, 3);
    assert_eq!(home.goals_for, 2);
    assert_eq!(home.goals_against, 1);
    assert_eq!(home.goal_difference, 1);
    assert_eq!(home.rank, 1);

    let away = table.row(1, "BBB").unwrap();
    assert_eq!(away.games_played, 1);
    assert_eq!(away.games_lost, 1);
    assert_eq!(away.points, 0);
    assert_eq!(away.goal_difference, -1);
    assert_eq!(away.rank, 2);
}

#[test]
fn earlier_snapshots_stay_untouched() {
    let mut table = StandingsTable::new(["AAA", "BBB"]);
    table.add_match(&played("AAA", "BBB", 2, 1, 1)).unwrap();
    table.finalize_round(1).unwrap();
    table.add_match(&played("BBB", "AAA", 3, 0, 2)).unwrap();
    table.finalize_round(2).unwrap();

    let before = table.row(0, "AAA").unwrap();
    assert_eq!(before.points, 0);
    assert_eq!(before.games_played, 0);
    assert_eq!(table.row(1, "AAA").unwrap().points, 3);
    assert_eq!(table.row(2, "AAA").unwrap().points, 3);

    let bbb = table.row(2, "BBB").unwrap();
    assert_eq!(bbb.points, 3);
    // BBB leads on goal difference, up from rank 2.
    assert_eq!(bbb.rank, 1);
    assert_eq!(bbb.previous_rank, 2);
    assert_eq!(bbb.movement, 1);
    assert_eq!(table.row(2, "AAA").unwrap().movement, -1);
}

#[test]
fn points_total_matches_results() {
    let teams = ["AAA", "BBB", "CCC", "DDD"];
    let mut table = StandingsTable::new(teams);
    let rounds = [
        [("AAA", "BBB", 1, 1), ("CCC", "DDD", 2, 0)],
        [("BBB", "CCC", 0, 3), ("DDD", "AAA", 2, 2)],
        [("AAA", "CCC", 4, 1), ("BBB", "DDD", 1, 0)],
    ];
    let mut expected = 0;
    for (idx, matches) in rounds.iter().enumerate() {
        let round = idx as u32 + 1;
        for (home, away, hg, ag) in matches {
            table.add_match(&played(home, away, *hg, *ag, round)).unwrap();
            expected += if hg == ag {
                2 * POINTS_FOR_DRAW
            } else {
                POINTS_FOR_WIN
            };
        }
        table.finalize_round(round).unwrap();
        let total: u32 = teams.iter().map(|t| table.row(round, t).unwrap().points).sum();
        assert_eq!(total, expected);

        let mut ranks = table
            .standings(round)
            .unwrap()
            .into_iter()
            .map(|(_, row)| row.rank)
            .collect::<Vec<_>>();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}

#[test]
fn ties_fall_back_to_team_order() {
    let mut table = StandingsTable::new(["ZZZ", "MMM", "AAA", "BBB"]);
    table.add_match(&played("ZZZ", "MMM", 1, 1, 1)).unwrap();
    table.add_match(&played("AAA", "BBB", 1, 1, 1)).unwrap();
    table.finalize_round(1).unwrap();
    let order = table
        .standings(1)
        .unwrap()
        .into_iter()
        .map(|(team, _)| team)
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["AAA", "BBB", "MMM", "ZZZ"]);
}

#[test]
fn goal_difference_then_goals_break_ties() {
    let mut table = StandingsTable::new(["AAA", "BBB", "CCC", "DDD"]);
    table.add_match(&played("AAA", "BBB", 1, 0, 1)).unwrap();
    table.add_match(&played("CCC", "DDD", 3, 2, 1)).unwrap();
    table.finalize_round(1).unwrap();
    // Same points and goal difference, CCC scored more.
    assert_eq!(table.row(1, "CCC").unwrap().rank, 1);
    assert_eq!(table.row(1, "AAA").unwrap().rank, 2);
    assert_eq!(table.row(1, "DDD").unwrap().rank, 3);
    assert_eq!(table.row(1, "BBB").unwrap().rank, 4);
}

#[test]
fn adding_a_match_twice_counts_it_twice() {
    let mut table = StandingsTable::new(["AAA", "BBB"]);
    let m = played("AAA", "BBB", 1, 0, 1);
    table.add_match(&m).unwrap();
    table.add_match(&m).unwrap();
    table.finalize_round(1).unwrap();
    let row = table.row(1, "AAA").unwrap();
    assert_eq!(row.games_played, 2);
    assert_eq!(row.points, 6);
}

#[test]
fn ordering_errors_are_reported() {
    let mut table = StandingsTable::new(["AAA", "BBB"]);
    let err = table.add_match(&played("AAA", "BBB", 1, 0, 2)).unwrap_err();
    assert!(matches!(err, ExportError::RoundNotReady { round: 1 }));
    assert!(matches!(
        table.finalize_round(3),
        Err(ExportError::RoundNotReady { .. })
    ));

    table.finalize_round(1).unwrap();
    assert!(matches!(
        table.add_match(&played("AAA", "BBB", 1, 0, 1)),
        Err(ExportError::SnapshotSealed { round: 1 })
    ));
    assert!(matches!(
        table.finalize_round(1),
        Err(ExportError::SnapshotSealed { round: 1 })
    ));
    assert!(matches!(
        table.snapshot_after_round(2),
        Err(ExportError::RoundNotReady { round: 2 })
    ));
}

#[test]
fn unplayed_matches_are_rejected() {
    let mut table = StandingsTable::new(["AAA", "BBB"]);
    let m = Match::from_parts("AAA", "BBB", None, None, 1).unwrap();
    assert!(matches!(
        table.add_match(&m),
        Err(ExportError::MatchNotPlayed { .. })
    ));
}

#[test]
fn empty_round_carries_table_forward() {
    let mut table = StandingsTable::new(["AAA", "BBB"]);
    table.add_match(&played("AAA", "BBB", 0, 2, 1)).unwrap();
    table.finalize_round(1).unwrap();
    table.finalize_round(2).unwrap();
    assert_eq!(table.latest_round(), 2);
    let row = table.row(2, "BBB").unwrap();
    assert_eq!(row.points, 3);
    assert_eq!(row.rank, 1);
    assert_eq!(row.movement, 0);
}
