use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::MarketKey;

/// Prices for one market line. Two-way markets leave `draw` empty,
/// single-sided rows (money-line style) carry `home` only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsPrices {
    pub home: f64,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

impl OddsPrices {
    /// Build prices from one to three values in listing order
    pub fn from_values(values: &[f64]) -> Option<Self> {
        match *values {
            [home, draw, away] => Some(Self {
                home,
                draw: Some(draw),
                away: Some(away),
            }),
            [home, away] => Some(Self {
                home,
                draw: None,
                away: Some(away),
            }),
            [home] => Some(Self {
                home,
                draw: None,
                away: None,
            }),
            _ => None,
        }
    }

    /// Every present price must be finite and strictly positive
    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        ok(self.home) && self.draw.map_or(true, ok) && self.away.map_or(true, ok)
    }

    pub fn boosted(&self, multiplier: f64) -> Self {
        Self {
            home: self.home * multiplier,
            draw: self.draw.map(|v| v * multiplier),
            away: self.away.map(|v| v * multiplier),
        }
    }
}

/// How the prices were written on the listing. Stored prices are always decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsFormat {
    Decimal,
    Fractional,
    American,
}

impl OddsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OddsFormat::Decimal => "decimal",
            OddsFormat::Fractional => "fractional",
            OddsFormat::American => "american",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "fractional" => OddsFormat::Fractional,
            "american" => OddsFormat::American,
            _ => OddsFormat::Decimal,
        }
    }
}

/// Durable odds row, unique per `(match, bookmaker, market_key, parameter)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    pub id: i64,
    pub match_id: i64,
    pub bookmaker_id: i64,
    pub market_key: MarketKey,
    pub parameter: Option<f64>,
    pub prices: OddsPrices,
    pub format: OddsFormat,
    pub is_live: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsSource {
    Cache,
    Store,
}

/// Read-side view of odds handed to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub match_id: i64,
    pub bookmaker_id: i64,
    pub bookmaker_name: String,
    pub bookmaker_priority: i32,
    pub market_key: MarketKey,
    pub parameter: Option<f64>,
    pub prices: OddsPrices,
    pub format: OddsFormat,
    pub is_live: bool,
    pub updated_at: DateTime<Utc>,
    pub source: OddsSource,
}
