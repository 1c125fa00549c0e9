use std::fs;
use std::path::PathBuf;

use matchday_features::config::Competition;
use matchday_features::features::{last_fully_played_round, order_rounds};
use matchday_features::football_json::{
    LocalSource, MatchDataSource, clubs_from_rounds, parse_clubs_json, parse_rounds_json,
};
use matchday_features::matches::{Match, MatchResult};

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join("2015-16").join(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn bundesliga_15() -> Competition {
    Competition {
        year: 15,
        country: "de".to_string(),
        league: "1".to_string(),
    }
}

#[test]
fn parses_rounds_fixture() {
    let raw = read_fixture("de.1.json");
    let rounds = parse_rounds_json(&raw).expect("fixture should parse");
    assert_eq!(rounds.len(), 6);
    assert_eq!(rounds[0].name, "1. Spieltag");
    assert_eq!(rounds[0].matches.len(), 2);

    let first = Match::new(&rounds[0].matches[0], 1).expect("valid match");
    assert_eq!(first.home_team(), "FCB");
    assert_eq!(first.away_team(), "BVB");
    assert_eq!(first.result(), MatchResult::HomeWin);

    // Nested `score.ft` layout.
    let nested = Match::new(&rounds[3].matches[1], 4).expect("valid match");
    assert_eq!(nested.result(), MatchResult::AwayWin);

    let unplayed = Match::new(&rounds[5].matches[1], 6).expect("valid match");
    assert!(!unplayed.has_been_played());
    assert_eq!(unplayed.result().label(), "?");
}

#[test]
fn parses_clubs_fixture_and_skips_codeless_clubs() {
    let raw = read_fixture("de.1.clubs.json");
    let clubs = parse_clubs_json(&raw).expect("fixture should parse");
    assert_eq!(clubs, vec!["FCB", "BVB", "S04", "B04"]);
}

#[test]
fn empty_and_null_documents_have_no_rounds() {
    assert!(parse_rounds_json("").unwrap().is_empty());
    assert!(parse_rounds_json("null").unwrap().is_empty());
    assert!(parse_clubs_json("  null ").unwrap().is_empty());
    assert!(parse_rounds_json("{ broken").is_err());
}

#[test]
fn clubs_can_be_derived_from_matches() {
    let rounds = parse_rounds_json(&read_fixture("de.1.json")).unwrap();
    assert_eq!(clubs_from_rounds(&rounds), vec!["B04", "BVB", "FCB", "S04"]);
}

#[test]
fn rounds_are_ordered_by_label_number() {
    let raw = r#"{"rounds": [
        {"name": "Matchday 2", "matches": [{"team1": "AAA", "team2": "BBB", "score1": 1, "score2": 0}]},
        {"name": "Matchday 1", "matches": [{"team1": "BBB", "team2": "AAA", "score1": 0, "score2": 0}]},
        {"name": "Relegation", "matches": [{"team1": "AAA", "team2": "CCC"}]}
    ]}"#;
    let rounds = parse_rounds_json(raw).unwrap();
    let (ordered, skipped) = order_rounds(&rounds);
    assert_eq!(ordered.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(skipped, 1);
}

#[test]
fn last_fully_played_round_stops_at_first_gap() {
    let rounds = parse_rounds_json(&read_fixture("de.1.json")).unwrap();
    assert_eq!(last_fully_played_round(&rounds), 5);

    let complete = &rounds[..5];
    assert_eq!(last_fully_played_round(complete), 5);
    assert_eq!(last_fully_played_round(&[]), 0);
}

#[test]
fn local_source_reads_season_folder() {
    let source = LocalSource::new(fixtures_dir());
    let competition = bundesliga_15();
    let rounds = source.load_rounds(&competition).expect("local rounds");
    assert_eq!(rounds.len(), 6);
    let clubs = source.load_clubs(&competition).expect("local clubs");
    assert_eq!(clubs.len(), 4);
    assert!(source.describe().contains("fixtures"));

    let missing = Competition {
        country: "xx".to_string(),
        ..competition
    };
    assert!(source.load_rounds(&missing).is_err());
}
