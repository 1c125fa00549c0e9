//! League table per round.
//!
//! Snapshot `r` is built from snapshot `r - 1` plus the played matches of round
//! `r`, and is sealed by [`StandingsTable::finalize_round`]. Round 0 is the
//! synthetic pre-season table.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{ExportError, ExportResult};
use crate::matches::{Match, Side};

pub const POINTS_FOR_WIN: u32 = 3;
pub const POINTS_FOR_DRAW: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandingsRow {
    pub games_played: u32,
    pub games_won: u32,
    pub games_drawn: u32,
    pub games_lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
    pub rank: u32,
    pub previous_rank: u32,
    pub movement: i64,
}

impl StandingsRow {
    pub const INITIAL: StandingsRow = StandingsRow {
        games_played: 0,
        games_won: 0,
        games_drawn: 0,
        games_lost: 0,
        goals_for: 0,
        goals_against: 0,
        goal_difference: 0,
        points: 0,
        rank: 1,
        previous_rank: 1,
        movement: 0,
    };

    /// New row with one more game folded in.
    pub fn with_result(self, goals_for: u32, goals_against: u32) -> StandingsRow {
        let (won, drawn, lost, points) = match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => (1, 0, 0, POINTS_FOR_WIN),
            std::cmp::Ordering::Equal => (0, 1, 0, POINTS_FOR_DRAW),
            std::cmp::Ordering::Less => (0, 0, 1, 0),
        };
        let goals_for = self.goals_for + goals_for;
        let goals_against = self.goals_against + goals_against;
        StandingsRow {
            games_played: self.games_played + 1,
            games_won: self.games_won + won,
            games_drawn: self.games_drawn + drawn,
            games_lost: self.games_lost + lost,
            goals_for,
            goals_against,
            goal_difference: i64::from(goals_for) - i64::from(goals_against),
            points: self.points + points,
            ..self
        }
    }

    pub fn with_rank(self, rank: u32, previous_rank: u32) -> StandingsRow {
        StandingsRow {
            rank,
            previous_rank,
            movement: i64::from(previous_rank) - i64::from(rank),
            ..self
        }
    }

    fn sort_key(&self) -> (u32, i64, u32) {
        (self.points, self.goal_difference, self.goals_for)
    }
}

pub type Snapshot = BTreeMap<String, StandingsRow>;

#[derive(Debug, Clone)]
pub struct StandingsTable {
    snapshots: Vec<Snapshot>,
    // Round currently receiving matches, not yet sealed.
    open: Option<(u32, Snapshot)>,
}

impl StandingsTable {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let initial = teams
            .into_iter()
            .map(|team| (team.into(), StandingsRow::INITIAL))
            .collect();
        Self {
            snapshots: vec![initial],
            open: None,
        }
    }

    /// Highest sealed round (0 before any round was finalized).
    pub fn latest_round(&self) -> u32 {
        (self.snapshots.len() - 1) as u32
    }

    pub fn add_match(&mut self, m: &Match) -> ExportResult<()> {
        let (Some(home_goals), Some(away_goals)) =
            (m.goals_for(Side::Home), m.goals_for(Side::Away))
        else {
            return Err(ExportError::MatchNotPlayed {
                home: m.home_team().to_string(),
                away: m.away_team().to_string(),
                round: m.round(),
            });
        };
        let round = m.round();
        let rows = self.open_round(round)?;
        for (side, goals_for, goals_against) in [
            (Side::Home, home_goals, away_goals),
            (Side::Away, away_goals, home_goals),
        ] {
            let row = rows
                .entry(m.team(side).to_string())
                .or_insert(StandingsRow::INITIAL);
            *row = row.with_result(goals_for, goals_against);
        }
        Ok(())
    }

    fn open_round(&mut self, round: u32) -> ExportResult<&mut Snapshot> {
        let next = self.snapshots.len() as u32;
        if round < next {
            return Err(ExportError::SnapshotSealed { round });
        }
        if round > next {
            return Err(ExportError::RoundNotReady { round: round - 1 });
        }
        let previous = &self.snapshots[self.snapshots.len() - 1];
        let (_, rows) = self.open.get_or_insert_with(|| (round, previous.clone()));
        Ok(rows)
    }

    /// Seals `round`: ranks every team and appends the snapshot. A round in
    /// which nothing was played carries the previous table forward.
    pub fn finalize_round(&mut self, round: u32) -> ExportResult<&Snapshot> {
        let next = self.snapshots.len() as u32;
        if round < next {
            return Err(ExportError::SnapshotSealed { round });
        }
        if round > next {
            return Err(ExportError::RoundNotReady { round: round - 1 });
        }
        let previous = &self.snapshots[self.snapshots.len() - 1];
        let rows = match self.open.take() {
            Some((_, rows)) => rows,
            None => previous.clone(),
        };
        let ranked = rank_snapshot(rows, previous);
        self.snapshots.push(ranked);
        Ok(&self.snapshots[round as usize])
    }

    pub fn snapshot_after_round(&self, round: u32) -> ExportResult<&Snapshot> {
        self.snapshots
            .get(round as usize)
            .ok_or(ExportError::RoundNotReady { round })
    }

    pub fn row(&self, round: u32, team: &str) -> ExportResult<StandingsRow> {
        let snapshot = self.snapshot_after_round(round)?;
        Ok(snapshot.get(team).copied().unwrap_or(StandingsRow::INITIAL))
    }

    /// Rows of `round` in table order.
    pub fn standings(&self, round: u32) -> ExportResult<Vec<(&str, StandingsRow)>> {
        let snapshot = self.snapshot_after_round(round)?;
        let mut rows = snapshot
            .iter()
            .map(|(team, row)| (team.as_str(), *row))
            .collect::<Vec<_>>();
        rows.sort_by_key(|(_, row)| row.rank);
        Ok(rows)
    }

    pub fn render_round(&self, round: u32) -> ExportResult<String> {
        let rows = self.standings(round)?;
        let mut out = String::new();
        let _ = writeln!(out, "Table after round {round}");
        let _ = writeln!(
            out,
            "{:>3} {:<6} {:>3} {:>3} {:>3} {:>3} {:>7} {:>4} {:>4} {:>4}",
            "#", "Team", "P", "W", "D", "L", "Goals", "GD", "Pts", "+/-"
        );
        for (team, row) in rows {
            let _ = writeln!(
                out,
                "{:>3} {:<6} {:>3} {:>3} {:>3} {:>3} {:>3}:{:<3} {:>4} {:>4} {:>4}",
                row.rank,
                team,
                row.games_played,
                row.games_won,
                row.games_drawn,
                row.games_lost,
                row.goals_for,
                row.goals_against,
                row.goal_difference,
                row.points,
                row.movement
            );
        }
        Ok(out)
    }
}

// Stable sort over team-code order; teams equal on all three keys keep that order.
fn rank_snapshot(rows: Snapshot, previous: &Snapshot) -> Snapshot {
    let mut ordered = rows.into_iter().collect::<Vec<_>>();
    ordered.sort_by(|(_, a), (_, b)| b.sort_key().cmp(&a.sort_key()));
    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, (team, row))| {
            let previous_rank = previous
                .get(&team)
                .map(|prev| prev.rank)
                .unwrap_or(StandingsRow::INITIAL.rank);
            let ranked = row.with_rank(idx as u32 + 1, previous_rank);
            (team, ranked)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_result_builds_new_row() {
        let row = StandingsRow::INITIAL.with_result(2, 2).with_result(0, 1);
        assert_eq!(row.games_played, 2);
        assert_eq!(row.games_drawn, 1);
        assert_eq!(row.games_lost, 1);
        assert_eq!(row.points, 1);
        assert_eq!(row.goal_difference, -1);
        assert_eq!(StandingsRow::INITIAL.points, 0);
    }

    #[test]
    fn render_lists_every_team() {
        let mut table = StandingsTable::new(["AAA", "BBB"]);
        table
            .add_match(&Match::played("AAA", "BBB", 1, 0, 1).unwrap())
            .unwrap();
        table.finalize_round(1).unwrap();
        let text = table.render_round(1).unwrap();
        assert!(text.contains("AAA"));
        assert!(text.contains("BBB"));
        assert!(table.render_round(2).is_err());
    }
}
