use thiserror::Error;

/// Errors raised by the feature export core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    // Input errors
    #[error("Malformed match record: {0}")]
    MalformedMatch(String),

    // Ordering errors
    #[error("Round {round} has no finalized standings snapshot")]
    RoundNotReady { round: u32 },

    #[error("Round {round} standings are already sealed")]
    SnapshotSealed { round: u32 },

    #[error("Match {home} vs {away} in round {round} has not been played")]
    MatchNotPlayed {
        home: String,
        away: String,
        round: u32,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Data availability
    #[error("Team metadata incomplete for: {}", missing.join(", "))]
    MetadataIncomplete { missing: Vec<String> },

    #[error("Team {team} has no processed rounds yet")]
    NoHistory { team: String },
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;
