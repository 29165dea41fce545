//! Synchronous extraction of fixtures and odds from listing markup.

pub mod listing;
pub mod odds_cell;
pub mod time_label;

pub use listing::{
    extract_league_links, extract_rows, has_selector, league_info, link_href, next_page_href,
    ExtractedPage, LeagueLink, RawMatchRow, LEAGUE_MENU_SELECTOR, LISTING_READY_SELECTOR,
    NEXT_PAGE_SELECTOR,
};
pub use odds_cell::{interpret_cell, parse_odds_values, ExtractedOdds, RawOddsCell};
pub use time_label::resolve_time_label;

/// Why a row or an odds cell was skipped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("expected 2 team names, found {0}")]
    TeamCount(usize),

    #[error("unparsable time label {0:?}")]
    TimeLabel(String),

    #[error("missing {0} cell")]
    MissingCell(&'static str),

    #[error("odds cell has no numeric values")]
    NoOddsValues,

    #[error("odds cell has {0} values, at most 3 expected")]
    TooManyOddsValues(usize),
}
