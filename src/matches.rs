use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};

/// One matchday as it arrives from a data source. `name` is free text such as
/// "1. Spieltag" or "Matchday 7"; the round number is parsed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRound {
    pub name: String,
    #[serde(default)]
    pub matches: Vec<RawMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatch {
    #[serde(default)]
    pub date: Option<String>,
    pub team1: RawTeam,
    pub team2: RawTeam,
    #[serde(default)]
    pub score1: Option<i64>,
    #[serde(default)]
    pub score2: Option<i64>,
    // Newer football.json layout: {"score": {"ft": [2, 1]}}.
    #[serde(default)]
    pub score: Option<RawScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawScore {
    #[serde(default)]
    pub ft: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTeam {
    Detailed {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
    Name(String),
}

impl RawTeam {
    pub fn code(&self) -> Option<&str> {
        let raw = match self {
            RawTeam::Detailed { code, .. } => code.as_deref()?,
            RawTeam::Name(name) => name.as_str(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

impl RawMatch {
    /// Full-time scores, preferring the flat `score1`/`score2` fields.
    pub fn scores(&self) -> (Option<i64>, Option<i64>) {
        if self.score1.is_some() || self.score2.is_some() {
            return (self.score1, self.score2);
        }
        let ft = self.score.as_ref().and_then(|s| s.ft.as_deref());
        match ft {
            Some([home, away, ..]) => (Some(*home), Some(*away)),
            _ => (None, None),
        }
    }

    pub fn has_scores(&self) -> bool {
        let (home, away) = self.scores();
        home.is_some() && away.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];

    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    /// Feature name prefix for this side (`team_h` / `team_a`).
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Home => "team_h",
            Side::Away => "team_a",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    HomeWin,
    Draw,
    AwayWin,
    Unplayed,
}

impl MatchResult {
    /// Label written to the `winner` column.
    pub fn label(self) -> &'static str {
        match self {
            MatchResult::HomeWin => "H",
            MatchResult::Draw => "X",
            MatchResult::AwayWin => "A",
            MatchResult::Unplayed => "?",
        }
    }
}

/// A result seen from one team's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    home: String,
    away: String,
    home_goals: Option<u32>,
    away_goals: Option<u32>,
    round: u32,
    result: MatchResult,
}

impl Match {
    /// Builds a match from a raw record. The round comes from the caller since
    /// record order inside a data file is not reliable.
    pub fn new(raw: &RawMatch, round: u32) -> ExportResult<Self> {
        let home = raw
            .team1
            .code()
            .ok_or_else(|| ExportError::MalformedMatch("home team code missing".to_string()))?;
        let away = raw
            .team2
            .code()
            .ok_or_else(|| ExportError::MalformedMatch("away team code missing".to_string()))?;
        let (home_goals, away_goals) = raw.scores();
        Self::from_parts(
            home,
            away,
            to_goals(home_goals, home)?,
            to_goals(away_goals, away)?,
            round,
        )
    }

    pub fn from_parts(
        home: &str,
        away: &str,
        home_goals: Option<u32>,
        away_goals: Option<u32>,
        round: u32,
    ) -> ExportResult<Self> {
        if home.trim().is_empty() || away.trim().is_empty() {
            return Err(ExportError::MalformedMatch(format!(
                "empty team code in round {round}"
            )));
        }
        if home == away {
            return Err(ExportError::MalformedMatch(format!(
                "{home} cannot play itself in round {round}"
            )));
        }
        let result = match (home_goals, away_goals) {
            (Some(h), Some(a)) if h > a => MatchResult::HomeWin,
            (Some(h), Some(a)) if h < a => MatchResult::AwayWin,
            (Some(_), Some(_)) => MatchResult::Draw,
            _ => MatchResult::Unplayed,
        };
        Ok(Self {
            home: home.to_string(),
            away: away.to_string(),
            home_goals,
            away_goals,
            round,
            result,
        })
    }

    pub fn played(
        home: &str,
        away: &str,
        home_goals: u32,
        away_goals: u32,
        round: u32,
    ) -> ExportResult<Self> {
        Self::from_parts(home, away, Some(home_goals), Some(away_goals), round)
    }

    pub fn home_team(&self) -> &str {
        &self.home
    }

    pub fn away_team(&self) -> &str {
        &self.away
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn result(&self) -> MatchResult {
        self.result
    }

    pub fn has_been_played(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    pub fn goals_for(&self, side: Side) -> Option<u32> {
        match side {
            Side::Home => self.home_goals,
            Side::Away => self.away_goals,
        }
    }

    pub fn goals_against(&self, side: Side) -> Option<u32> {
        self.goals_for(side.opponent())
    }

    pub fn outcome_for(&self, side: Side) -> Option<Outcome> {
        match (self.result, side) {
            (MatchResult::Unplayed, _) => None,
            (MatchResult::Draw, _) => Some(Outcome::Draw),
            (MatchResult::HomeWin, Side::Home) | (MatchResult::AwayWin, Side::Away) => {
                Some(Outcome::Win)
            }
            _ => Some(Outcome::Loss),
        }
    }
}

fn to_goals(raw: Option<i64>, team: &str) -> ExportResult<Option<u32>> {
    match raw {
        None => Ok(None),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| ExportError::MalformedMatch(format!("invalid score {v} for {team}"))),
    }
}

/// Extracts the 1-based round number from a label like "Matchday 7" or
/// "7. Spieltag". The first run of digits wins.
pub fn parse_round_number(label: &str) -> ExportResult<u32> {
    let digits = label
        .split(|ch: char| !ch.is_ascii_digit())
        .find(|s| !s.is_empty())
        .ok_or_else(|| ExportError::MalformedMatch(format!("no round number in '{label}'")))?;
    let round = digits
        .parse::<u32>()
        .map_err(|_| ExportError::MalformedMatch(format!("round number out of range in '{label}'")))?;
    if round == 0 {
        return Err(ExportError::MalformedMatch(format!(
            "round numbers start at 1, got '{label}'"
        )));
    }
    Ok(round)
}
