use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use matchday_features::config::{Cli, OutputFormat};
use matchday_features::features::{FeatureRowBuilder, Partition, order_rounds};
use matchday_features::football_json::{
    GithubSource, LocalSource, MatchDataSource, load_clubs_or_derive,
};
use matchday_features::logging::init_tracing;
use matchday_features::meta::{prefetch_predictions, prefetch_team_info};
use matchday_features::sink::{CsvSink, Sink, XlsxSink};
use matchday_features::transfermarkt::TransfermarktSource;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    init_tracing();

    let config = cli.export_config()?;
    let competition = cli.competition();

    let source: Box<dyn MatchDataSource> = match &cli.local {
        Some(dir) => Box::new(LocalSource::new(dir.clone())),
        None => Box::new(GithubSource),
    };
    info!(
        competition = %competition.label(),
        source = %source.describe(),
        "starting export"
    );

    let rounds = source
        .load_rounds(&competition)
        .with_context(|| format!("no match data for {}", competition.label()))?;
    let clubs = load_clubs_or_derive(source.as_ref(), &competition, &rounds);
    info!(clubs = clubs.len(), rounds = rounds.len(), "season loaded");

    let mut builder = FeatureRowBuilder::new(clubs, config)?;

    if cli.club_meta || cli.predictions {
        let transfermarkt = TransfermarktSource::from_id_file(&cli.transfermarkt_ids)?;
        if cli.club_meta {
            let fetched = prefetch_team_info(
                &transfermarkt,
                builder.clubs(),
                competition.season_start_year(),
            );
            builder = builder.with_team_info(fetched);
        }
        if cli.predictions {
            let round_numbers = order_rounds(&rounds).0.into_keys().collect::<Vec<_>>();
            let predictions = prefetch_predictions(&transfermarkt, &competition, &round_numbers);
            if predictions.is_empty() {
                warn!("no matchday predictions found, prediction features disabled");
            } else {
                builder = builder.with_predictions(predictions);
            }
        }
    }

    let print_tables = cli.tables;
    let features = builder.build_with_progress(&rounds, |progress| {
        debug!(round = progress.round, rows = progress.rows_emitted, "round done");
        if !print_tables {
            return;
        }
        match progress.table.render_round(progress.round) {
            Ok(table) => println!("{table}"),
            Err(err) => warn!(round = progress.round, error = %err, "table not printable"),
        }
    })?;

    let report = &features.report;
    info!(
        rounds = report.rounds_processed,
        matches = report.matches_folded,
        skipped = report.skipped_records,
        missing_values = report.missing_values,
        anomalies = report.anomalies.len(),
        last_fully_played_round = report.last_fully_played_round,
        "season processed"
    );

    let mut sink: Box<dyn Sink> = match cli.format {
        OutputFormat::Csv => Box::new(CsvSink::new(cli.output_dir.clone(), competition)),
        OutputFormat::Xlsx => Box::new(XlsxSink::new(cli.output_dir.clone(), competition)),
    };
    let mut written: Vec<PathBuf> = Vec::new();
    for partition in [Partition::Training, Partition::Test] {
        if let Some(path) = sink.write(partition, features.rows(partition))? {
            written.push(path);
        }
    }
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
