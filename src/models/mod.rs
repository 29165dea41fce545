pub mod catalogue;
pub mod odds;
pub mod sport;

pub use catalogue::{Bookmaker, CatalogueCounts, League, Match, MatchSighting, MatchStatus, Team};
pub use odds::{Odds, OddsFormat, OddsPrices, OddsSnapshot, OddsSource};
pub use sport::{Sport, UnknownSport};
