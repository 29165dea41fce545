use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::Sport;

/// A competition within a sport, keyed by `(name, sport)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub sport: Sport,
    pub country: String,

    /// Listing path used to find the league's fixtures (e.g. "/soccer/england/premier-league")
    pub locator: String,
}

/// A participant, keyed by `(name, league)`. Same name in another league is another team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub league_id: i64,
    pub sport: Sport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "live" => MatchStatus::Live,
            "finished" => MatchStatus::Finished,
            _ => MatchStatus::Scheduled,
        }
    }
}

/// A fixture, keyed by `(home_team, away_team, match_date)`.
/// Status, time and scores reflect the latest sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub league_id: i64,
    pub sport: Sport,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub match_date: NaiveDate,
    pub match_time: NaiveTime,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }
}

/// Everything needed to resolve a match besides the team and league identities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSighting {
    pub match_date: NaiveDate,
    pub match_time: NaiveTime,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

/// An odds source, keyed by the identifier observed on the listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub id: i64,
    pub oddsportal_name: String,

    /// Display alias
    pub name: String,

    /// Higher wins when several bookmakers price the same market
    pub priority: i32,
}

/// Row counts per catalogue table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogueCounts {
    pub leagues: i64,
    pub teams: i64,
    pub matches: i64,
    pub bookmakers: i64,
    pub odds: i64,
}
