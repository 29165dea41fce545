use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::odds_cell::{interpret_cell, ExtractedOdds, RawOddsCell};
use super::time_label::resolve_time_label;
use super::ParseError;
use crate::models::{MatchStatus, Sport};

pub const ROW_SELECTOR: &str = ".table-main tr.deactivate";
pub const LISTING_READY_SELECTOR: &str = ".table-main";
pub const LEAGUE_MENU_SELECTOR: &str = ".main-menu-text";
pub const NEXT_PAGE_SELECTOR: &str = r#"a[data-cy="pagination-next"]:not(.disabled)"#;

/// One fixture row with its mapped odds
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatchRow {
    pub home: String,
    pub away: String,
    pub kickoff: NaiveDateTime,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub odds: Vec<ExtractedOdds>,
}

/// Rows extracted from one listing page, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    pub rows: Vec<RawMatchRow>,
    pub skipped_rows: usize,
    pub skipped_cells: usize,
}

/// League entry found in a sport's menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueLink {
    pub name: String,
    pub country: String,
    pub locator: String,
}

fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

struct RowSelectors {
    row: Selector,
    participant: Selector,
    time: Selector,
    score: Selector,
    odds_cell: Selector,
    price: Selector,
}

impl RowSelectors {
    fn new() -> Self {
        Self {
            row: css(ROW_SELECTOR),
            participant: css(".table-participant"),
            time: css(".datet"),
            score: css(".table-score"),
            odds_cell: css(".odds-nowrp"),
            price: css("span"),
        }
    }
}

/// Extract every fixture row on a listing page.
///
/// Malformed rows and cells are counted and skipped; they never fail the page.
pub fn extract_rows(html: &str, sport: Sport, anchor: NaiveDate) -> ExtractedPage {
    let document = Html::parse_document(html);
    let selectors = RowSelectors::new();
    let mut page = ExtractedPage::default();

    for row in document.select(&selectors.row) {
        match extract_row(row, &selectors, sport, anchor) {
            Ok((parsed, skipped_cells)) => {
                page.skipped_cells += skipped_cells;
                page.rows.push(parsed);
            }
            Err(e) => {
                debug!("Skipping row: {}", e);
                page.skipped_rows += 1;
            }
        }
    }

    page
}

fn extract_row(
    row: ElementRef<'_>,
    selectors: &RowSelectors,
    sport: Sport,
    anchor: NaiveDate,
) -> Result<(RawMatchRow, usize), ParseError> {
    let participants = row
        .select(&selectors.participant)
        .next()
        .ok_or(ParseError::MissingCell("participant"))?;
    let teams = split_participants(participants);
    let [home, away]: [String; 2] = teams
        .try_into()
        .map_err(|teams: Vec<String>| ParseError::TeamCount(teams.len()))?;

    let time_label = row
        .select(&selectors.time)
        .next()
        .ok_or(ParseError::MissingCell("time"))?
        .text()
        .collect::<String>();
    let kickoff = resolve_time_label(&time_label, anchor)?;

    let classes: Vec<&str> = row.value().classes().collect();
    let status = if classes.contains(&"live") {
        MatchStatus::Live
    } else if classes.contains(&"finished") {
        MatchStatus::Finished
    } else {
        MatchStatus::Scheduled
    };

    let (home_score, away_score) = row
        .select(&selectors.score)
        .next()
        .and_then(|cell| parse_score(&cell.text().collect::<String>()))
        .map_or((None, None), |(h, a)| (Some(h), Some(a)));

    let mut odds = Vec::new();
    let mut skipped_cells = 0;

    for cell in row.select(&selectors.odds_cell) {
        let raw = RawOddsCell {
            market: cell.value().attr("data-market").unwrap_or_default().to_string(),
            bookmaker: cell.value().attr("data-bk").unwrap_or("unknown").to_string(),
            label: text_outside_spans(cell),
            values: cell
                .select(&selectors.price)
                .map(|span| span.text().collect::<String>().trim().to_string())
                .collect(),
        };

        match interpret_cell(sport, &raw) {
            Ok(Some(extracted)) => odds.push(extracted),
            Ok(None) => {}
            Err(e) => {
                debug!("Skipping {} odds cell for {} vs {}: {}", raw.market, home, away, e);
                skipped_cells += 1;
            }
        }
    }

    Ok((
        RawMatchRow {
            home,
            away,
            kickoff,
            status,
            home_score,
            away_score,
            odds,
        },
        skipped_cells,
    ))
}

/// Non-empty text fragments of the participant cell
fn split_participants(cell: ElementRef<'_>) -> Vec<String> {
    cell.text()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect()
}

fn text_outside_spans(cell: ElementRef<'_>) -> String {
    cell.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let in_span = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != cell.id())
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .map_or(false, |e| e.name() == "span")
                });
            (!in_span).then(|| text.trim())
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_score(text: &str) -> Option<(i32, i32)> {
    let (home, away) = text.trim().split_once([':', '-'])?;
    Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
}

/// League links in a sport's menu whose href lives under `/{sport_path}/`.
/// Links sharing a locator are returned once.
pub fn extract_league_links(html: &str, sport_path: &str) -> Vec<LeagueLink> {
    let document = Html::parse_document(html);
    let links = css(".main-menu-text a[href]");
    let needle = format!("/{}/", sport_path.trim_matches('/'));
    let mut seen = HashSet::new();
    let mut leagues = Vec::new();

    for link in document.select(&links) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains(&needle) {
            continue;
        }

        let name = link.text().collect::<Vec<_>>().join(" ");
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            continue;
        }

        let (country, locator) = league_info(href);
        if seen.insert(locator.clone()) {
            leagues.push(LeagueLink {
                name,
                country,
                locator,
            });
        }
    }

    leagues
}

/// Split a league href into `(country, locator)`.
///
/// `/soccer/england/premier-league/results/` gives `("England", "/soccer/england/premier-league")`.
pub fn league_info(href: &str) -> (String, String) {
    let path = match reqwest::Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() < 3 {
        return ("Unknown".to_string(), href.to_string());
    }

    let country = parts[1]
        .split('-')
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    (country, format!("/{}", parts[..3].join("/")))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Href of the enabled "next page" control, if any
pub fn next_page_href(html: &str) -> Option<String> {
    link_href(html, NEXT_PAGE_SELECTOR)
}

/// Href of the first element matching `selector`
pub fn link_href(html: &str, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    let href = document.select(&selector).next()?.value().attr("href")?;
    Some(href.to_string())
}

/// Whether `selector` matches anything in `html`. Invalid selectors match nothing.
pub fn has_selector(html: &str, selector: &str) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        return false;
    };
    Html::parse_document(html).select(&selector).next().is_some()
}
