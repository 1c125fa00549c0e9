use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{ExportError, ExportResult};

/// League and season an export runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Competition {
    /// Two-digit season start, `15` for 2015/16.
    pub year: u16,
    pub country: String,
    pub league: String,
}

impl Competition {
    pub fn season_start_year(&self) -> u16 {
        2000 + self.year
    }

    /// Folder name used by football.json, e.g. `2015-16`.
    pub fn season_label(&self) -> String {
        format!("{}-{:02}", self.season_start_year(), (self.year + 1) % 100)
    }

    pub fn label(&self) -> String {
        format!("{}_{}_{}", self.season_label(), self.country, self.league)
    }
}

/// Knobs of one feature export. Loading them is the binary's job.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub minimum_rounds: u32,
    pub include_unplayed: bool,
    pub predict_next_round: bool,
    pub verbose: bool,
    pub exclude: HashSet<String>,
    pub form_windows: Vec<usize>,
    pub form_weight: i64,
    pub streak_window: usize,
    pub standings_features: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            minimum_rounds: 5,
            include_unplayed: false,
            predict_next_round: false,
            verbose: false,
            exclude: HashSet::new(),
            form_windows: vec![3, 5, 10],
            form_weight: 1,
            streak_window: 3,
            standings_features: true,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> ExportResult<()> {
        if self.minimum_rounds < 1 {
            return Err(ExportError::Configuration(
                "minimum rounds before inclusion must be at least 1".to_string(),
            ));
        }
        if self.form_windows.is_empty() {
            return Err(ExportError::Configuration(
                "at least one form window is required".to_string(),
            ));
        }
        if self.form_windows.contains(&0) {
            return Err(ExportError::Configuration(
                "form windows must be positive".to_string(),
            ));
        }
        if self.streak_window == 0 {
            return Err(ExportError::Configuration(
                "streak window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

/// Exports per-match feature rows for a league season.
#[derive(Debug, Parser)]
#[command(about)]
pub struct Cli {
    /// Season start in YY, e.g. 15 for 2015/16
    #[arg(short = 'y', long, env = "EXPORT_YEAR", default_value_t = 15)]
    pub year: u16,

    /// Country code: de, es, en, it, fr
    #[arg(short = 'c', long = "countrycode", env = "EXPORT_COUNTRY", default_value = "de")]
    pub country: String,

    /// League number within the country
    #[arg(short = 'l', long, env = "EXPORT_LEAGUE", default_value = "1")]
    pub league: String,

    /// Features to drop, separated by ';' or ','
    #[arg(short = 'e', long, env = "EXPORT_EXCLUDE", default_value = "")]
    pub exclude: String,

    /// Read football.json files from this directory instead of GitHub
    #[arg(short = 'L', long, env = "EXPORT_LOCAL_DIR")]
    pub local: Option<PathBuf>,

    /// Also emit rows for matches without a result
    #[arg(short = 'C', long)]
    pub complete: bool,

    /// Emit round and team codes as leading columns
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Print the table after every round
    #[arg(short = 'T', long)]
    pub tables: bool,

    /// First round that produces rows
    #[arg(short = 'm', long = "minmatches", env = "EXPORT_MIN_ROUNDS", default_value_t = 5)]
    pub min_rounds: u32,

    /// Form windows, e.g. "3,5,10"
    #[arg(long, env = "EXPORT_FORM_WINDOWS", default_value = "3,5,10")]
    pub form_windows: String,

    #[arg(long, default_value_t = 1)]
    pub form_weight: i64,

    #[arg(long, default_value_t = 3)]
    pub streak_window: usize,

    /// Add market-value features from transfermarkt
    #[arg(long = "clubmeta")]
    pub club_meta: bool,

    /// Add crowd prediction features from transfermarkt
    #[arg(long)]
    pub predictions: bool,

    /// JSON map of team code to transfermarkt club id
    #[arg(long, env = "TRANSFERMARKT_IDS", default_value = "transfermarkt-team-ids.json")]
    pub transfermarkt_ids: PathBuf,

    /// Include unplayed matches of the first incomplete round in the test set
    #[arg(long)]
    pub predict_next_round: bool,

    /// Leave out rank, points and goal difference features
    #[arg(long)]
    pub no_standings: bool,

    #[arg(short = 'o', long, env = "EXPORT_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
}

impl Cli {
    pub fn competition(&self) -> Competition {
        Competition {
            year: self.year,
            country: self.country.trim().to_string(),
            league: self.league.trim().to_string(),
        }
    }

    pub fn export_config(&self) -> ExportResult<ExportConfig> {
        if self.year > 99 {
            return Err(ExportError::Configuration(format!(
                "season year must be two digits (15 for 2015/16), got {}",
                self.year
            )));
        }
        let form_windows = parse_windows(&self.form_windows)?;
        let config = ExportConfig {
            minimum_rounds: self.min_rounds,
            include_unplayed: self.complete,
            predict_next_round: self.predict_next_round,
            verbose: self.verbose,
            exclude: parse_exclude(&self.exclude),
            form_windows,
            form_weight: self.form_weight,
            streak_window: self.streak_window,
            standings_features: !self.no_standings,
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn parse_exclude(raw: &str) -> HashSet<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_windows(raw: &str) -> ExportResult<Vec<usize>> {
    let mut out = Vec::new();
    for part in raw.split([',', ';', ' ']).filter(|s| !s.trim().is_empty()) {
        let window = part.trim().parse::<usize>().map_err(|_| {
            ExportError::Configuration(format!("invalid form window '{}'", part.trim()))
        })?;
        if !out.contains(&window) {
            out.push(window);
        }
    }
    Ok(out)
}
