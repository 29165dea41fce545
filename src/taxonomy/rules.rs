use once_cell::sync::Lazy;
use regex::Regex;

use super::MarketKey;
use crate::models::Sport;

static SIGNED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?\d+(?:\.\d+)?").expect("valid regex"));
static UNSIGNED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

/// How a market's numeric line is read from the cell text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamExtractor {
    /// Handicap lines, sign preserved ("-1.5")
    Signed,
    /// Totals lines ("2.5")
    Unsigned,
}

impl ParamExtractor {
    /// First number in `text`, or `None` when there is none
    pub fn extract(&self, text: &str) -> Option<f64> {
        let re = match self {
            ParamExtractor::Signed => &*SIGNED_NUMBER,
            ParamExtractor::Unsigned => &*UNSIGNED_NUMBER,
        };
        re.find(text)?.as_str().parse().ok()
    }
}

/// What a raw market identifier maps to for a given sport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRule {
    Bare(MarketKey),
    Parameterized(MarketKey, ParamExtractor),
}

/// A cell's market after mapping and parameter extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMarket {
    pub key: MarketKey,
    pub parameter: Option<f64>,
}

/// Normalise a raw market label into the identifier the rules are keyed on:
/// lowercase, numeric tokens dropped, words joined by `-`.
///
/// `"Over/Under 2.5"` becomes `"over/under"`, `"Asian Handicap -1.5"` becomes `"asian-handicap"`.
pub fn normalize_market_id(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|token| SIGNED_NUMBER.find(token).map(|m| m.as_str()) != Some(token))
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Rule for a normalised market identifier, `None` for unmapped markets
pub fn rule_for(sport: Sport, market_id: &str) -> Option<MarketRule> {
    use MarketKey::*;
    use MarketRule::{Bare, Parameterized};
    use ParamExtractor::{Signed, Unsigned};

    let rule = match sport {
        Sport::Football => match market_id {
            "1x2" => Bare(OneXTwo),
            "asian-handicap" | "ah" => Parameterized(Handicap, Signed),
            "over-under" | "over/under" => Parameterized(OverUnder, Unsigned),
            "1st-half-over-under" | "1st-half-over/under" => {
                Parameterized(FirstHalfOverUnder, Unsigned)
            }
            "correct-score" => Bare(CorrectScore),
            "both-teams-to-score" | "btts" => Bare(Btts),
            "double-chance" => Bare(DoubleChance),
            "half-time" | "1st-half-1x2" => Bare(HalfTimeResult),
            "half-time/full-time" | "ht/ft" => Bare(HalfTimeFullTime),
            "total-goals" => Parameterized(TotalGoals, Unsigned),
            _ => return None,
        },
        Sport::Basketball => match market_id {
            "home-away" | "home/away" | "moneyline" => Bare(MoneyLine),
            "asian-handicap" | "point-spread" => Parameterized(PointSpread, Signed),
            "over-under" | "over/under" => Parameterized(OverUnder, Unsigned),
            "1st-quarter-home-away" | "1st-quarter-home/away" => Bare(FirstQuarterWinner),
            _ => return None,
        },
        Sport::Tennis => match market_id {
            "home-away" | "home/away" => Bare(MatchWinner),
            "correct-score" => Bare(CorrectScore),
            "over-under" | "over/under" => Parameterized(TotalGames, Unsigned),
            "1st-set-home-away" | "1st-set-home/away" => Bare(SetWinner),
            _ => return None,
        },
        Sport::Cricket => match market_id {
            "home-away" | "home/away" | "1x2" => Bare(MatchWinner),
            "over-under" | "over/under" => Parameterized(TotalMatchRuns, Unsigned),
            _ => return None,
        },
        Sport::Rugby => match market_id {
            "1x2" | "home-away" | "home/away" => Bare(MatchWinner),
            "asian-handicap" => Parameterized(Handicap, Signed),
            "over-under" | "over/under" => Parameterized(TotalPoints, Unsigned),
            "half-time" => Bare(HalfTimeResult),
            _ => return None,
        },
        Sport::Hockey => match market_id {
            "1x2" | "home-away" | "home/away" => Bare(MatchWinner),
            "asian-handicap" | "puck-line" => Parameterized(PuckLine, Signed),
            "over-under" | "over/under" => Parameterized(TotalGoals, Unsigned),
            _ => return None,
        },
        Sport::Volleyball => match market_id {
            "home-away" | "home/away" => Bare(MatchWinner),
            "asian-handicap" => Parameterized(PointsHandicap, Signed),
            "over-under" | "over/under" => Parameterized(TotalPoints, Unsigned),
            "correct-score" => Bare(SetScore),
            _ => return None,
        },
        Sport::Baseball => match market_id {
            "home-away" | "home/away" | "moneyline" => Bare(MoneyLine),
            "asian-handicap" | "run-line" => Parameterized(RunLine, Signed),
            "over-under" | "over/under" => Parameterized(TotalRuns, Unsigned),
            _ => return None,
        },
        Sport::AmericanFootball => match market_id {
            "home-away" | "home/away" | "moneyline" => Bare(MoneyLine),
            "asian-handicap" | "point-spread" => Parameterized(PointSpread, Signed),
            "over-under" | "over/under" => Parameterized(TotalPoints, Unsigned),
            "half-time" => Bare(HalfTimeResult),
            _ => return None,
        },
        Sport::Boxing | Sport::MixedMartialArts => match market_id {
            "home-away" | "home/away" | "1x2" | "moneyline" => Bare(FightWinner),
            "over-under" | "over/under" => Parameterized(TotalRounds, Unsigned),
            "method-of-victory" => Bare(MethodOfVictory),
            _ => return None,
        },
    };

    Some(rule)
}

/// Map a raw market label plus the cell's display text onto a canonical market.
///
/// Unknown markets and parameterized markets without a number in `display_text`
/// both come back as `None`.
pub fn resolve(sport: Sport, raw_market: &str, display_text: &str) -> Option<ResolvedMarket> {
    match rule_for(sport, &normalize_market_id(raw_market))? {
        MarketRule::Bare(key) => Some(ResolvedMarket {
            key,
            parameter: None,
        }),
        MarketRule::Parameterized(key, extractor) => Some(ResolvedMarket {
            key,
            parameter: Some(extractor.extract(display_text)?),
        }),
    }
}
