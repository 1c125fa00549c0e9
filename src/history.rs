//! Per-team rolling result history.
//!
//! The ledger is fed one played match at a time, after the feature rows of
//! that match's round have been built.

use std::collections::HashMap;

use crate::error::{ExportError, ExportResult};
use crate::matches::{Match, Outcome, Side};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamHistoryRecord {
    pub last_round_processed: u32,
    pub home_history: Vec<Outcome>,
    pub away_history: Vec<Outcome>,
    pub all_history: Vec<Outcome>,
    pub last_win: Option<u32>,
    pub last_draw: Option<u32>,
    pub last_defeat: Option<u32>,
    pub home_wins: u32,
    pub away_wins: u32,
    pub home_draws: u32,
    pub away_draws: u32,
    pub home_defeats: u32,
    pub away_defeats: u32,
}

static EMPTY_RECORD: TeamHistoryRecord = TeamHistoryRecord {
    last_round_processed: 0,
    home_history: Vec::new(),
    away_history: Vec::new(),
    all_history: Vec::new(),
    last_win: None,
    last_draw: None,
    last_defeat: None,
    home_wins: 0,
    away_wins: 0,
    home_draws: 0,
    away_draws: 0,
    home_defeats: 0,
    away_defeats: 0,
};

impl TeamHistoryRecord {
    pub fn wins(&self) -> u32 {
        self.home_wins + self.away_wins
    }

    pub fn draws(&self) -> u32 {
        self.home_draws + self.away_draws
    }

    pub fn defeats(&self) -> u32 {
        self.home_defeats + self.away_defeats
    }

    /// Last `n` results, oldest first. Shorter when fewer were played.
    pub fn recent(&self, n: usize) -> &[Outcome] {
        let start = self.all_history.len().saturating_sub(n);
        &self.all_history[start..]
    }

    fn record(&mut self, side: Side, outcome: Outcome, round: u32) {
        self.last_round_processed = round;
        match side {
            Side::Home => self.home_history.push(outcome),
            Side::Away => self.away_history.push(outcome),
        }
        self.all_history.push(outcome);

        let (marker, counter) = match (outcome, side) {
            (Outcome::Win, Side::Home) => (&mut self.last_win, &mut self.home_wins),
            (Outcome::Win, Side::Away) => (&mut self.last_win, &mut self.away_wins),
            (Outcome::Draw, Side::Home) => (&mut self.last_draw, &mut self.home_draws),
            (Outcome::Draw, Side::Away) => (&mut self.last_draw, &mut self.away_draws),
            (Outcome::Loss, Side::Home) => (&mut self.last_defeat, &mut self.home_defeats),
            (Outcome::Loss, Side::Away) => (&mut self.last_defeat, &mut self.away_defeats),
        };
        *marker = Some(round);
        *counter += 1;
    }

    // "Never" counts as round -1, so the value keeps growing with the season.
    fn rounds_since(&self, marker: Option<u32>) -> i64 {
        let last = marker.map(i64::from).unwrap_or(-1);
        i64::from(self.last_round_processed) - last + 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct TeamHistoryLedger {
    records: HashMap<String, TeamHistoryRecord>,
}

impl TeamHistoryLedger {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = teams
            .into_iter()
            .map(|team| (team.into(), TeamHistoryRecord::default()))
            .collect();
        Self { records }
    }

    /// Folds a played match into both teams' records. Calling this twice with
    /// the same match counts it twice.
    pub fn add_match(&mut self, m: &Match) -> ExportResult<()> {
        if !m.has_been_played() {
            return Err(ExportError::MatchNotPlayed {
                home: m.home_team().to_string(),
                away: m.away_team().to_string(),
                round: m.round(),
            });
        }
        for side in Side::BOTH {
            let Some(outcome) = m.outcome_for(side) else {
                continue;
            };
            self.records
                .entry(m.team(side).to_string())
                .or_default()
                .record(side, outcome, m.round());
        }
        Ok(())
    }

    pub fn record(&self, team: &str) -> &TeamHistoryRecord {
        self.records.get(team).unwrap_or(&EMPTY_RECORD)
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn last_round_processed(&self, team: &str) -> u32 {
        self.record(team).last_round_processed
    }

    pub fn rounds_since_last_win(&self, team: &str) -> i64 {
        let rec = self.record(team);
        rec.rounds_since(rec.last_win)
    }

    pub fn rounds_since_last_draw(&self, team: &str) -> i64 {
        let rec = self.record(team);
        rec.rounds_since(rec.last_draw)
    }

    pub fn rounds_since_last_loss(&self, team: &str) -> i64 {
        let rec = self.record(team);
        rec.rounds_since(rec.last_defeat)
    }

    pub fn win_percentage(&self, team: &str) -> ExportResult<f64> {
        self.percentage(team, TeamHistoryRecord::wins)
    }

    pub fn draw_percentage(&self, team: &str) -> ExportResult<f64> {
        self.percentage(team, TeamHistoryRecord::draws)
    }

    pub fn defeat_percentage(&self, team: &str) -> ExportResult<f64> {
        self.percentage(team, TeamHistoryRecord::defeats)
    }

    // Divides by the last processed round, not by games played: a postponed
    // match lowers every percentage of that team.
    fn percentage(&self, team: &str, count: fn(&TeamHistoryRecord) -> u32) -> ExportResult<f64> {
        let rec = self.record(team);
        if rec.last_round_processed == 0 {
            return Err(ExportError::NoHistory {
                team: team.to_string(),
            });
        }
        Ok(round2(
            f64::from(count(rec)) / f64::from(rec.last_round_processed),
        ))
    }

    /// True when the last `n` results are all wins. A team with fewer than `n`
    /// results only needs the ones it has to be wins (an empty history counts).
    pub fn has_winning_streak(&self, team: &str, n: usize) -> bool {
        self.record(team)
            .recent(n)
            .iter()
            .all(|o| *o == Outcome::Win)
    }

    /// Form over the last `n` results. The score starts at `n`, not zero.
    pub fn team_form(&self, team: &str, n: usize, weight: i64) -> i64 {
        self.record(team)
            .recent(n)
            .iter()
            .fold(n as i64, |acc, outcome| match outcome {
                Outcome::Win => acc + weight,
                Outcome::Loss => acc - weight,
                Outcome::Draw => acc,
            })
    }

    pub fn form_delta(&self, team_a: &str, team_b: &str, n: usize, weight: i64) -> i64 {
        self.team_form(team_a, n, weight) - self.team_form(team_b, n, weight)
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_works() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(0.5), 0.5);
    }

    #[test]
    fn unknown_team_reads_as_empty_record() {
        let ledger = TeamHistoryLedger::new(["FCB"]);
        assert_eq!(ledger.record("XYZ"), &TeamHistoryRecord::default());
        assert_eq!(ledger.rounds_since_last_win("XYZ"), 2);
        assert!(ledger.has_winning_streak("XYZ", 3));
    }
}
