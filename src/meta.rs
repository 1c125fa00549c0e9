use std::collections::HashMap;

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Competition;
use crate::error::{ExportError, ExportResult};
use crate::history::round2;
use crate::matches::MatchResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team_code: String,
    pub market_value: f64,
    pub avg_player_market_value: f64,
    pub international_caps: i64,
    pub avg_player_age: Option<f64>,
}

impl TeamInfo {
    // A zero value means the scrape found nothing; ratios over it are meaningless.
    pub fn is_meaningful(&self) -> bool {
        self.market_value > 0.0 && self.avg_player_market_value > 0.0
    }
}

/// Crowd prediction for one fixture of a matchday, as probabilities in 0..=1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchdayPrediction {
    pub home_team: String,
    pub away_team: String,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl MatchdayPrediction {
    /// Most likely result and its probability. Ties go to the home side, then the draw.
    pub fn favourite(&self) -> (MatchResult, f64) {
        let mut best = (MatchResult::HomeWin, self.home_win);
        for candidate in [
            (MatchResult::Draw, self.draw),
            (MatchResult::AwayWin, self.away_win),
        ] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }
        (best.0, round2(best.1))
    }
}

pub trait TeamMetadataSource: Sync {
    fn team_info(&self, team_code: &str, season_start_year: u16) -> Result<TeamInfo>;

    fn matchday_predictions(
        &self,
        competition: &Competition,
        round: u32,
    ) -> Result<Vec<MatchdayPrediction>>;
}

/// Market-value data for every club of one season.
#[derive(Debug, Clone)]
pub struct ClubMeta {
    teams: HashMap<String, TeamInfo>,
}

impl ClubMeta {
    /// Accepts the data only when every club has a usable entry.
    pub fn new(clubs: &[String], mut fetched: HashMap<String, TeamInfo>) -> ExportResult<Self> {
        let missing = clubs
            .iter()
            .filter(|code| !fetched.get(*code).is_some_and(TeamInfo::is_meaningful))
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ExportError::MetadataIncomplete { missing });
        }
        fetched.retain(|code, _| clubs.contains(code));
        Ok(Self { teams: fetched })
    }

    pub fn team(&self, code: &str) -> Option<&TeamInfo> {
        self.teams.get(code)
    }

    pub fn team_value_ratio(&self, home: &str, away: &str) -> Option<f64> {
        let (h, a) = (self.team(home)?, self.team(away)?);
        Some(round2(h.market_value / a.market_value))
    }

    pub fn avg_player_value_ratio(&self, home: &str, away: &str) -> Option<f64> {
        let (h, a) = (self.team(home)?, self.team(away)?);
        Some(round2(h.avg_player_market_value / a.avg_player_market_value))
    }

    pub fn international_caps_delta(&self, home: &str, away: &str) -> Option<i64> {
        let (h, a) = (self.team(home)?, self.team(away)?);
        Some(h.international_caps - a.international_caps)
    }
}

/// Predictions keyed by (round, home, away).
#[derive(Debug, Clone, Default)]
pub struct RoundPredictions {
    by_fixture: HashMap<(u32, String, String), MatchdayPrediction>,
}

impl RoundPredictions {
    pub fn insert(&mut self, round: u32, prediction: MatchdayPrediction) {
        let key = (
            round,
            prediction.home_team.clone(),
            prediction.away_team.clone(),
        );
        self.by_fixture.insert(key, prediction);
    }

    pub fn get(&self, round: u32, home: &str, away: &str) -> Option<&MatchdayPrediction> {
        self.by_fixture
            .get(&(round, home.to_string(), away.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_fixture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fixture.is_empty()
    }
}

/// Fetches team info for all clubs in parallel. Failed lookups are logged and
/// left out, which makes [`ClubMeta::new`] reject the set.
pub fn prefetch_team_info(
    source: &dyn TeamMetadataSource,
    clubs: &[String],
    season_start_year: u16,
) -> HashMap<String, TeamInfo> {
    clubs
        .par_iter()
        .filter_map(|code| match source.team_info(code, season_start_year) {
            Ok(info) => {
                debug!(team = %code, value = info.market_value, "fetched team info");
                Some((code.clone(), info))
            }
            Err(err) => {
                warn!(team = %code, error = %err, "team info lookup failed");
                None
            }
        })
        .collect()
}

pub fn prefetch_predictions(
    source: &dyn TeamMetadataSource,
    competition: &Competition,
    rounds: &[u32],
) -> RoundPredictions {
    let fetched = rounds
        .par_iter()
        .map(|round| (*round, source.matchday_predictions(competition, *round)))
        .collect::<Vec<_>>();

    let mut out = RoundPredictions::default();
    for (round, result) in fetched {
        match result {
            Ok(predictions) => {
                for prediction in predictions {
                    out.insert(round, prediction);
                }
            }
            Err(err) => warn!(round, error = %err, "matchday predictions unavailable"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(code: &str, value: f64, avg: f64, caps: i64) -> TeamInfo {
        TeamInfo {
            team_code: code.to_string(),
            market_value: value,
            avg_player_market_value: avg,
            international_caps: caps,
            avg_player_age: None,
        }
    }

    #[test]
    fn ratios_are_rounded() {
        let clubs = vec!["FCB".to_string(), "BVB".to_string()];
        let fetched = HashMap::from([
            ("FCB".to_string(), info("FCB", 600.0, 20.0, 18)),
            ("BVB".to_string(), info("BVB", 400.0, 15.0, 11)),
        ]);
        let meta = ClubMeta::new(&clubs, fetched).unwrap();
        assert_eq!(meta.team_value_ratio("FCB", "BVB"), Some(1.5));
        assert_eq!(meta.avg_player_value_ratio("FCB", "BVB"), Some(1.33));
        assert_eq!(meta.international_caps_delta("FCB", "BVB"), Some(7));
    }

    #[test]
    fn incomplete_meta_is_rejected() {
        let clubs = vec!["FCB".to_string(), "BVB".to_string(), "S04".to_string()];
        let fetched = HashMap::from([
            ("FCB".to_string(), info("FCB", 600.0, 20.0, 18)),
            ("BVB".to_string(), info("BVB", 0.0, 0.0, 0)),
        ]);
        let err = ClubMeta::new(&clubs, fetched).unwrap_err();
        assert_eq!(
            err,
            ExportError::MetadataIncomplete {
                missing: vec!["BVB".to_string(), "S04".to_string()]
            }
        );
    }

    #[test]
    fn favourite_prediction_picks_highest() {
        let p = MatchdayPrediction {
            home_team: "FCB".to_string(),
            away_team: "BVB".to_string(),
            home_win: 0.301,
            draw: 0.2,
            away_win: 0.499,
        };
        assert_eq!(p.favourite(), (MatchResult::AwayWin, 0.5));
    }

    struct FixedSource;

    impl TeamMetadataSource for FixedSource {
        fn team_info(&self, team_code: &str, _season_start_year: u16) -> Result<TeamInfo> {
            match team_code {
                "FCB" => Ok(info("FCB", 600.0, 20.0, 18)),
                _ => Err(anyhow::anyhow!("unknown club {team_code}")),
            }
        }

        fn matchday_predictions(
            &self,
            _competition: &Competition,
            round: u32,
        ) -> Result<Vec<MatchdayPrediction>> {
            if round > 1 {
                return Err(anyhow::anyhow!("matchday {round} not published"));
            }
            Ok(vec![MatchdayPrediction {
                home_team: "FCB".to_string(),
                away_team: "BVB".to_string(),
                home_win: 0.6,
                draw: 0.25,
                away_win: 0.15,
            }])
        }
    }

    #[test]
    fn prefetch_keeps_successful_lookups() {
        let clubs = vec!["FCB".to_string(), "BVB".to_string()];
        let fetched = prefetch_team_info(&FixedSource, &clubs, 2015);
        assert_eq!(fetched.len(), 1);
        assert!(fetched.contains_key("FCB"));

        let competition = Competition {
            year: 15,
            country: "de".to_string(),
            league: "1".to_string(),
        };
        let predictions = prefetch_predictions(&FixedSource, &competition, &[1, 2]);
        assert_eq!(predictions.len(), 1);
        assert!(predictions.get(1, "FCB", "BVB").is_some());
        assert!(predictions.get(2, "FCB", "BVB").is_none());
    }
}
