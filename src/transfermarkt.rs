//! Market values and crowd predictions scraped from transfermarkt.de.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Competition;
use crate::http_cache::fetch_text_cached;
use crate::http_client::http_client;
use crate::meta::{MatchdayPrediction, TeamInfo, TeamMetadataSource};

const TRANSFERMARKT_BASE: &str = "https://www.transfermarkt.de";
const PAGE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Deserialize)]
struct TeamIdEntry {
    id: u32,
}

pub struct TransfermarktSource {
    ids: HashMap<String, u32>,
    codes_by_id: HashMap<u32, String>,
}

impl TransfermarktSource {
    pub fn new(ids: HashMap<String, u32>) -> Self {
        let codes_by_id = ids.iter().map(|(code, id)| (*id, code.clone())).collect();
        Self { ids, codes_by_id }
    }

    /// Reads a `{"FCB": {"id": 27}, ...}` map of team code to club id.
    pub fn from_id_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read transfermarkt id map {}", path.display()))?;
        let entries: HashMap<String, TeamIdEntry> =
            serde_json::from_str(&raw).context("invalid transfermarkt id map")?;
        Ok(Self::new(
            entries
                .into_iter()
                .map(|(code, entry)| (code, entry.id))
                .collect(),
        ))
    }

    fn fetch(&self, url: &str) -> Result<String> {
        let client = http_client()?;
        fetch_text_cached(client, url, Some(PAGE_MAX_AGE))
    }
}

impl TeamMetadataSource for TransfermarktSource {
    fn team_info(&self, team_code: &str, season_start_year: u16) -> Result<TeamInfo> {
        let id = self
            .ids
            .get(team_code)
            .ok_or_else(|| anyhow!("no transfermarkt id for {team_code}"))?;
        let url = format!(
            "{TRANSFERMARKT_BASE}/verein/startseite/verein/{id}/saison_id/{season_start_year}"
        );
        let html = self.fetch(&url).context("team page request failed")?;
        Ok(parse_team_page(&html, team_code))
    }

    fn matchday_predictions(
        &self,
        competition: &Competition,
        round: u32,
    ) -> Result<Vec<MatchdayPrediction>> {
        let (slug, code) = competition_path(competition).ok_or_else(|| {
            anyhow!(
                "no transfermarkt competition for {}.{}",
                competition.country,
                competition.league
            )
        })?;
        let url = format!(
            "{TRANSFERMARKT_BASE}/{slug}/spieltag/wettbewerb/{code}/plus/?saison_id={}&spieltag={round}",
            competition.season_start_year()
        );
        let html = self.fetch(&url).context("matchday page request failed")?;
        Ok(parse_matchday_page(&html, &self.codes_by_id))
    }
}

fn competition_path(competition: &Competition) -> Option<(&'static str, &'static str)> {
    let path = match (competition.country.as_str(), competition.league.as_str()) {
        ("de", "1") => ("1-bundesliga", "L1"),
        ("de", "2") => ("2-bundesliga", "L2"),
        ("en", "1") => ("premier-league", "GB1"),
        ("es", "1") => ("laliga", "ES1"),
        ("it", "1") => ("serie-a", "IT1"),
        ("fr", "1") => ("ligue-1", "FR1"),
        _ => return None,
    };
    Some(path)
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn select_texts(scope: ElementRef<'_>, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    scope.select(&sel).map(element_text).collect()
}

pub fn parse_team_page(html: &str, team_code: &str) -> TeamInfo {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let market_value = select_texts(root, ".marktwert a").into_iter().next();

    // Profile header tables: first holds squad facts (age, internationals),
    // second holds the average market value.
    let headers = selector(".profilheader")
        .map(|sel| doc.select(&sel).collect::<Vec<_>>())
        .unwrap_or_default();
    let cells = |idx: usize| -> Vec<String> {
        headers
            .get(idx)
            .map(|table| select_texts(*table, "td"))
            .unwrap_or_default()
    };
    let squad = cells(0);
    let values = cells(1);

    let info = TeamInfo {
        team_code: team_code.to_string(),
        market_value: market_value_to_number(market_value.as_deref()),
        avg_player_market_value: market_value_to_number(values.last().map(String::as_str)),
        international_caps: string_to_int(squad.last().map(String::as_str)),
        avg_player_age: squad.get(2).and_then(|s| string_to_double(s)),
    };
    debug!(team = team_code, ?info, "parsed team page");
    info
}

pub fn parse_matchday_page(
    html: &str,
    codes_by_id: &HashMap<u32, String>,
) -> Vec<MatchdayPrediction> {
    let doc = Html::parse_document(html);
    let (Some(box_sel), Some(home_sel), Some(away_sel)) = (
        selector("div.box"),
        selector("td.verein-heim a[href]"),
        selector("td.verein-gast a[href]"),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for block in doc.select(&box_sel) {
        let (Some(home), Some(away)) = (
            block.select(&home_sel).next().and_then(club_id),
            block.select(&away_sel).next().and_then(club_id),
        ) else {
            continue;
        };
        let probs = select_texts(block, "span.prognose-wert")
            .iter()
            .filter_map(|text| percent_to_probability(text))
            .collect::<Vec<_>>();
        let [home_win, draw, away_win] = probs[..] else {
            continue;
        };
        let (Some(home_team), Some(away_team)) = (codes_by_id.get(&home), codes_by_id.get(&away))
        else {
            warn!(home, away, "unmapped transfermarkt club id");
            continue;
        };
        out.push(MatchdayPrediction {
            home_team: home_team.clone(),
            away_team: away_team.clone(),
            home_win,
            draw,
            away_win,
        });
    }
    out
}

fn club_id(link: ElementRef<'_>) -> Option<u32> {
    let href = link.value().attr("href")?;
    let mut parts = href.split('/');
    parts.find(|p| *p == "verein")?;
    parts.next()?.parse::<u32>().ok()
}

fn percent_to_probability(raw: &str) -> Option<f64> {
    let value = string_to_double(raw.trim().trim_end_matches('%'))?;
    Some(value / 100.0)
}

/// "12,50 Mio. €" → 12_500_000, "850 Tsd. €" → 850_000. Unreadable → 0.
pub fn market_value_to_number(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        warn!("market value could not be determined");
        return 0.0;
    };
    let mut parts = raw.split_whitespace();
    let number = parts.next().and_then(string_to_double).unwrap_or(0.0);
    let factor = match parts.next() {
        Some("Mrd.") => 1_000_000_000.0,
        Some("Mio.") => 1_000_000.0,
        _ => 1_000.0,
    };
    number * factor
}

fn string_to_int(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0)
}

fn string_to_double(raw: &str) -> Option<f64> {
    raw.trim().replace('.', "").replace(',', ".").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_values_are_parsed() {
        assert_eq!(market_value_to_number(Some("12,50 Mio. €")), 12_500_000.0);
        assert_eq!(market_value_to_number(Some("850 Tsd. €")), 850_000.0);
        assert_eq!(market_value_to_number(Some("1,02 Mrd. €")), 1_020_000_000.0);
        assert_eq!(market_value_to_number(None), 0.0);
        assert_eq!(market_value_to_number(Some("  ")), 0.0);
    }

    #[test]
    fn team_page_fields_are_read() {
        let html = r#"
            <div class="marktwert"><a href="/x">562,75 Mio. €</a></div>
            <table class="profilheader">
              <tr><td>28</td></tr><tr><td>Ø 26,4</td></tr><tr><td>26,4</td></tr><tr><td>18</td></tr>
            </table>
            <table class="profilheader">
              <tr><td>1</td></tr><tr><td>20,10 Mio. €</td></tr>
            </table>
        "#;
        let info = parse_team_page(html, "FCB");
        assert_eq!(info.team_code, "FCB");
        assert_eq!(info.market_value, 562_750_000.0);
        assert_eq!(info.avg_player_market_value, 20_100_000.0);
        assert_eq!(info.international_caps, 18);
        assert_eq!(info.avg_player_age, Some(26.4));
        assert!(info.is_meaningful());
    }

    #[test]
    fn matchday_predictions_are_read() {
        let html = r#"
            <div class="box">
              <table><tr>
                <td class="verein-heim"><a href="/fc-bayern-munchen/spielplan/verein/27/saison_id/2015">FCB</a></td>
                <td class="verein-gast"><a href="/borussia-dortmund/spielplan/verein/16/saison_id/2015">BVB</a></td>
              </tr></table>
              <span class="prognose-wert">55,5%</span>
              <span class="prognose-wert">20%</span>
              <span class="prognose-wert">24,5%</span>
            </div>
            <div class="box"><p>advert</p></div>
        "#;
        let ids = HashMap::from([(27, "FCB".to_string()), (16, "BVB".to_string())]);
        let preds = parse_matchday_page(html, &ids);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].home_team, "FCB");
        assert_eq!(preds[0].away_team, "BVB");
        assert!((preds[0].home_win - 0.555).abs() < 1e-9);
        assert!((preds[0].away_win - 0.245).abs() < 1e-9);
    }
}
