//! Match data in the openfootball `football.json` layout, read from GitHub or
//! from a local checkout.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Competition;
use crate::http_cache::fetch_text_cached;
use crate::http_client::http_client;
use crate::matches::RawRound;

const FOOTBALL_JSON_BASE: &str =
    "https://raw.githubusercontent.com/openfootball/football.json/master";

pub trait MatchDataSource {
    fn load_rounds(&self, competition: &Competition) -> Result<Vec<RawRound>>;

    fn load_clubs(&self, competition: &Competition) -> Result<Vec<String>>;

    fn describe(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct RoundsFile {
    #[serde(default)]
    rounds: Vec<RawRound>,
}

#[derive(Debug, Deserialize)]
struct ClubsFile {
    #[serde(default)]
    clubs: Vec<ClubEntry>,
}

#[derive(Debug, Deserialize)]
struct ClubEntry {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub fn parse_rounds_json(raw: &str) -> Result<Vec<RawRound>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let file: RoundsFile = serde_json::from_str(trimmed).context("invalid rounds json")?;
    Ok(file.rounds)
}

/// Club codes in file order. Clubs without a code are skipped with a warning.
pub fn parse_clubs_json(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let file: ClubsFile = serde_json::from_str(trimmed).context("invalid clubs json")?;
    let mut out = Vec::with_capacity(file.clubs.len());
    for club in file.clubs {
        match club.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => out.push(code.to_string()),
            _ => warn!(club = club.name.as_deref().unwrap_or("?"), "club without code"),
        }
    }
    Ok(out)
}

/// Team codes seen in the match records, used when no clubs file exists.
pub fn clubs_from_rounds(rounds: &[RawRound]) -> Vec<String> {
    let mut codes = BTreeSet::new();
    for m in rounds.iter().flat_map(|r| r.matches.iter()) {
        for team in [&m.team1, &m.team2] {
            if let Some(code) = team.code() {
                codes.insert(code.to_string());
            }
        }
    }
    codes.into_iter().collect()
}

/// Loads clubs, falling back to the codes found in `rounds`.
pub fn load_clubs_or_derive(
    source: &dyn MatchDataSource,
    competition: &Competition,
    rounds: &[RawRound],
) -> Vec<String> {
    match source.load_clubs(competition) {
        Ok(clubs) if !clubs.is_empty() => clubs,
        Ok(_) => {
            warn!("clubs file is empty, deriving clubs from match records");
            clubs_from_rounds(rounds)
        }
        Err(err) => {
            warn!(error = %err, "clubs file unavailable, deriving clubs from match records");
            clubs_from_rounds(rounds)
        }
    }
}

fn results_file_name(competition: &Competition) -> String {
    format!("{}.{}.json", competition.country, competition.league)
}

fn clubs_file_name(competition: &Competition) -> String {
    format!("{}.{}.clubs.json", competition.country, competition.league)
}

#[derive(Debug, Clone, Default)]
pub struct GithubSource;

impl GithubSource {
    fn url(competition: &Competition, file: &str) -> String {
        format!(
            "{FOOTBALL_JSON_BASE}/{}/{file}",
            competition.season_label()
        )
    }
}

impl MatchDataSource for GithubSource {
    fn load_rounds(&self, competition: &Competition) -> Result<Vec<RawRound>> {
        let client = http_client()?;
        let url = Self::url(competition, &results_file_name(competition));
        info!(%url, "loading results");
        let body = fetch_text_cached(client, &url, None).context("results request failed")?;
        parse_rounds_json(&body)
    }

    fn load_clubs(&self, competition: &Competition) -> Result<Vec<String>> {
        let client = http_client()?;
        let url = Self::url(competition, &clubs_file_name(competition));
        let body = fetch_text_cached(client, &url, None).context("clubs request failed")?;
        parse_clubs_json(&body)
    }

    fn describe(&self) -> String {
        "github.com/openfootball/football.json".to_string()
    }
}

/// Reads `<root>/<season>/<country>.<league>.json` and the matching clubs file.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, competition: &Competition, file: &str) -> PathBuf {
        self.root.join(competition.season_label()).join(file)
    }
}

impl MatchDataSource for LocalSource {
    fn load_rounds(&self, competition: &Competition) -> Result<Vec<RawRound>> {
        let path = self.path(competition, &results_file_name(competition));
        info!(path = %path.display(), "loading results");
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read results file {}", path.display()))?;
        parse_rounds_json(&raw)
    }

    fn load_clubs(&self, competition: &Competition) -> Result<Vec<String>> {
        let path = self.path(competition, &clubs_file_name(competition));
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read clubs file {}", path.display()))?;
        parse_clubs_json(&raw)
    }

    fn describe(&self) -> String {
        format!("local files under {}", self.root.display())
    }
}
