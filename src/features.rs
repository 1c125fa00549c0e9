//! Feature rows for win/draw/loss training data.
//!
//! One [`FeatureRowBuilder`] walks a season round by round. For every round it
//! first builds the rows of all its matches from the state left by earlier
//! rounds, and only then folds the round's results into the ledger and table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::error::ExportResult;
use crate::history::TeamHistoryLedger;
use crate::matches::{Match, MatchResult, RawMatch, RawRound, Side, parse_round_number};
use crate::meta::{ClubMeta, RoundPredictions, TeamInfo};
use crate::standings::StandingsTable;

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Bool(v) => write!(f, "{v}"),
            FeatureValue::Text(v) => f.write_str(v),
            FeatureValue::Missing => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Training,
    Test,
}

impl Partition {
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Training => "training",
            Partition::Test => "test",
        }
    }
}

/// Engineered attributes of one match plus its `winner` label.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    round: u32,
    home_team: String,
    away_team: String,
    partition: Partition,
    fields: Vec<(String, FeatureValue)>,
    winner: MatchResult,
}

impl FeatureRow {
    fn new(m: &Match, partition: Partition) -> Self {
        Self {
            round: m.round(),
            home_team: m.home_team().to_string(),
            away_team: m.away_team().to_string(),
            partition,
            fields: Vec::new(),
            winner: m.result(),
        }
    }

    fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.fields.push((name.into(), value));
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn home_team(&self) -> &str {
        &self.home_team
    }

    pub fn away_team(&self) -> &str {
        &self.away_team
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn winner(&self) -> MatchResult {
        self.winner
    }

    pub fn fields(&self) -> &[(String, FeatureValue)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundAnomaly {
    pub round: u32,
    pub expected_matches: usize,
    pub actual_matches: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub rounds_processed: usize,
    pub matches_folded: usize,
    pub skipped_records: usize,
    pub missing_values: usize,
    pub anomalies: Vec<RoundAnomaly>,
    pub last_fully_played_round: u32,
    pub metadata_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub training: Vec<FeatureRow>,
    pub test: Vec<FeatureRow>,
    pub report: BuildReport,
}

impl FeatureSet {
    pub fn rows(&self, partition: Partition) -> &[FeatureRow] {
        match partition {
            Partition::Training => &self.training,
            Partition::Test => &self.test,
        }
    }
}

pub struct RoundProgress<'a> {
    pub round: u32,
    pub rows_emitted: usize,
    pub table: &'a StandingsTable,
}

pub struct FeatureRowBuilder {
    config: ExportConfig,
    clubs: Vec<String>,
    ledger: TeamHistoryLedger,
    table: StandingsTable,
    club_meta: Option<ClubMeta>,
    predictions: Option<RoundPredictions>,
}

impl FeatureRowBuilder {
    pub fn new(mut clubs: Vec<String>, config: ExportConfig) -> ExportResult<Self> {
        config.validate()?;
        clubs.sort();
        clubs.dedup();
        Ok(Self {
            ledger: TeamHistoryLedger::new(clubs.iter().cloned()),
            table: StandingsTable::new(clubs.iter().cloned()),
            clubs,
            config,
            club_meta: None,
            predictions: None,
        })
    }

    /// Enables market-value features when every club has usable data.
    pub fn with_team_info(mut self, fetched: HashMap<String, TeamInfo>) -> Self {
        match ClubMeta::new(&self.clubs, fetched) {
            Ok(meta) => self.club_meta = Some(meta),
            Err(err) => {
                warn!(error = %err, "club meta data is not meaningful, market value features disabled");
                self.club_meta = None;
            }
        }
        self
    }

    pub fn with_predictions(mut self, predictions: RoundPredictions) -> Self {
        self.predictions = Some(predictions);
        self
    }

    pub fn clubs(&self) -> &[String] {
        &self.clubs
    }

    pub fn ledger(&self) -> &TeamHistoryLedger {
        &self.ledger
    }

    pub fn table(&self) -> &StandingsTable {
        &self.table
    }

    pub fn build(&mut self, rounds: &[RawRound]) -> ExportResult<FeatureSet> {
        self.build_with_progress(rounds, |_| {})
    }

    pub fn build_with_progress(
        &mut self,
        rounds: &[RawRound],
        mut on_round: impl FnMut(RoundProgress<'_>),
    ) -> ExportResult<FeatureSet> {
        // Every build starts from an empty season.
        self.ledger = TeamHistoryLedger::new(self.clubs.iter().cloned());
        self.table = StandingsTable::new(self.clubs.iter().cloned());

        let (ordered, skipped_rounds) = order_rounds(rounds);
        let last_full = last_fully_played(&ordered);
        let mut out = FeatureSet::default();
        out.report.skipped_records = skipped_rounds;
        out.report.last_fully_played_round = last_full;
        out.report.metadata_enabled = self.club_meta.is_some();
        info!(
            rounds = ordered.len(),
            clubs = self.clubs.len(),
            last_fully_played_round = last_full,
            "building feature rows"
        );

        for (round, raw_matches) in &ordered {
            let round = *round;
            self.carry_forward_to(round)?;
            self.check_match_count(round, raw_matches.len(), &mut out.report);

            let mut matches = Vec::with_capacity(raw_matches.len());
            for raw in raw_matches {
                match Match::new(raw, round) {
                    Ok(m) => matches.push(m),
                    Err(err) => {
                        warn!(round, error = %err, "skipping match record");
                        out.report.skipped_records += 1;
                    }
                }
            }

            // Phase 1: rows from the state of rounds < `round` only.
            let is_test_round = round == last_full + 1;
            let mut emitted = 0usize;
            for m in &matches {
                if !self.qualifies(m, is_test_round) {
                    continue;
                }
                let partition = if is_test_round {
                    Partition::Test
                } else {
                    Partition::Training
                };
                let row = self.match_to_row(m, partition, &mut out.report)?;
                match partition {
                    Partition::Training => out.training.push(row),
                    Partition::Test => out.test.push(row),
                }
                emitted += 1;
            }

            // Phase 2: fold played results, then seal the round.
            for m in matches.iter().filter(|m| m.has_been_played()) {
                self.ledger.add_match(m)?;
                self.table.add_match(m)?;
                out.report.matches_folded += 1;
            }
            self.table.finalize_round(round)?;
            out.report.rounds_processed += 1;
            debug!(round, emitted, "round finalized");

            on_round(RoundProgress {
                round,
                rows_emitted: emitted,
                table: &self.table,
            });
        }

        info!(
            training = out.training.len(),
            test = out.test.len(),
            skipped = out.report.skipped_records,
            "feature rows built"
        );
        Ok(out)
    }

    fn carry_forward_to(&mut self, round: u32) -> ExportResult<()> {
        while self.table.latest_round() + 1 < round {
            let missing = self.table.latest_round() + 1;
            warn!(round = missing, "round missing from input, carrying table forward");
            self.table.finalize_round(missing)?;
        }
        Ok(())
    }

    fn check_match_count(&self, round: u32, actual: usize, report: &mut BuildReport) {
        let expected = self.clubs.len() / 2;
        if actual != expected {
            warn!(round, actual, expected, "a match seems to be missing in round");
            report.anomalies.push(RoundAnomaly {
                round,
                expected_matches: expected,
                actual_matches: actual,
            });
        }
    }

    fn qualifies(&self, m: &Match, is_test_round: bool) -> bool {
        let eligible = m.has_been_played()
            || self.config.include_unplayed
            || (self.config.predict_next_round && is_test_round);
        eligible && m.round() >= self.config.minimum_rounds
    }

    fn match_to_row(
        &self,
        m: &Match,
        partition: Partition,
        report: &mut BuildReport,
    ) -> ExportResult<FeatureRow> {
        let mut row = FeatureRow::new(m, partition);
        let (home, away) = (m.home_team(), m.away_team());

        if self.config.verbose {
            row.push("round", FeatureValue::Int(i64::from(m.round())));
            row.push("team_h", FeatureValue::Text(home.to_string()));
            row.push("team_a", FeatureValue::Text(away.to_string()));
        }

        for side in Side::BOTH {
            let team = m.team(side);
            let p = side.prefix();
            row.push(
                format!("{p}_last_w"),
                FeatureValue::Int(self.ledger.rounds_since_last_win(team)),
            );
            row.push(
                format!("{p}_last_dr"),
                FeatureValue::Int(self.ledger.rounds_since_last_draw(team)),
            );
            row.push(
                format!("{p}_last_de"),
                FeatureValue::Int(self.ledger.rounds_since_last_loss(team)),
            );
        }

        let streak = self.config.streak_window;
        for side in Side::BOTH {
            row.push(
                format!("{}_streak_w_{streak}", side.prefix()),
                FeatureValue::Bool(self.ledger.has_winning_streak(m.team(side), streak)),
            );
        }

        let weight = self.config.form_weight;
        for &n in &self.config.form_windows {
            row.push(
                format!("team_h_form_last_{n}"),
                FeatureValue::Int(self.ledger.team_form(home, n, weight)),
            );
            row.push(
                format!("team_a_form_last_{n}"),
                FeatureValue::Int(self.ledger.team_form(away, n, weight)),
            );
            row.push(
                format!("form_delta_last_{n}"),
                FeatureValue::Int(self.ledger.form_delta(home, away, n, weight)),
            );
        }

        for side in Side::BOTH {
            let team = m.team(side);
            let p = side.prefix();
            let percentages = [
                ("win_perc", self.ledger.win_percentage(team)),
                ("dra_perc", self.ledger.draw_percentage(team)),
                ("def_perc", self.ledger.defeat_percentage(team)),
            ];
            for (suffix, value) in percentages {
                row.push(format!("{p}_{suffix}"), percentage_value(value, report));
            }
        }

        if self.config.standings_features {
            self.push_standings(&mut row, m)?;
        }

        if let Some(meta) = &self.club_meta {
            let ratios = [
                ("team_value_ratio", meta.team_value_ratio(home, away)),
                ("avg_pl_value_ratio", meta.avg_player_value_ratio(home, away)),
            ];
            for (name, value) in ratios {
                row.push(name, value.map_or(FeatureValue::Missing, FeatureValue::Float));
            }
            row.push(
                "a_int_delta",
                meta.international_caps_delta(home, away)
                    .map_or(FeatureValue::Missing, FeatureValue::Int),
            );
        }

        if let Some(predictions) = &self.predictions {
            match predictions.get(m.round(), home, away) {
                Some(prediction) => {
                    let (favourite, probability) = prediction.favourite();
                    row.push("tm_pred", FeatureValue::Text(favourite.label().to_string()));
                    row.push("tm_pred_p", FeatureValue::Float(probability));
                }
                None => {
                    row.push("tm_pred", FeatureValue::Missing);
                    row.push("tm_pred_p", FeatureValue::Missing);
                }
            }
        }

        row.fields
            .retain(|(name, _)| !self.config.exclude.contains(name));
        Ok(row)
    }

    fn push_standings(&self, row: &mut FeatureRow, m: &Match) -> ExportResult<()> {
        let before = m.round().saturating_sub(1);
        let home = self.table.row(before, m.home_team())?;
        let away = self.table.row(before, m.away_team())?;
        row.push("team_h_rank", FeatureValue::Int(i64::from(home.rank)));
        row.push("team_a_rank", FeatureValue::Int(i64::from(away.rank)));
        row.push(
            "rank_delta",
            FeatureValue::Int(i64::from(away.rank) - i64::from(home.rank)),
        );
        row.push("team_h_points", FeatureValue::Int(i64::from(home.points)));
        row.push("team_a_points", FeatureValue::Int(i64::from(away.points)));
        row.push("team_h_goal_diff", FeatureValue::Int(home.goal_difference));
        row.push("team_a_goal_diff", FeatureValue::Int(away.goal_difference));
        row.push("team_h_rank_move", FeatureValue::Int(home.movement));
        row.push("team_a_rank_move", FeatureValue::Int(away.movement));
        Ok(())
    }
}

fn percentage_value(value: ExportResult<f64>, report: &mut BuildReport) -> FeatureValue {
    match value {
        Ok(v) => FeatureValue::Float(v),
        Err(err) => {
            warn!(error = %err, "percentage undefined, writing missing value");
            report.missing_values += 1;
            FeatureValue::Missing
        }
    }
}

/// Groups matches by parsed round number. Rounds with an unparseable label are
/// dropped; the second value counts their match records.
pub fn order_rounds(rounds: &[RawRound]) -> (BTreeMap<u32, Vec<&RawMatch>>, usize) {
    let mut ordered: BTreeMap<u32, Vec<&RawMatch>> = BTreeMap::new();
    let mut skipped = 0usize;
    for round in rounds {
        match parse_round_number(&round.name) {
            Ok(number) => ordered.entry(number).or_default().extend(round.matches.iter()),
            Err(err) => {
                warn!(label = %round.name, error = %err, "skipping round");
                skipped += round.matches.len();
            }
        }
    }
    (ordered, skipped)
}

/// Highest round such that it and every earlier round are fully scored.
/// 0 when round 1 is already incomplete.
pub fn last_fully_played_round(rounds: &[RawRound]) -> u32 {
    let (ordered, _) = order_rounds(rounds);
    last_fully_played(&ordered)
}

fn last_fully_played(ordered: &BTreeMap<u32, Vec<&RawMatch>>) -> u32 {
    for (round, matches) in ordered {
        if !matches.iter().all(|m| m.has_scores()) {
            return round - 1;
        }
    }
    ordered.keys().next_back().copied().unwrap_or(0)
}
