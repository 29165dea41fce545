use crate::models::{OddsFormat, OddsPrices, Sport};
use crate::taxonomy::{self, ResolvedMarket};

use super::ParseError;

/// One odds-bearing cell as found in the markup
#[derive(Debug, Clone, PartialEq)]
pub struct RawOddsCell {
    /// Raw market label (`data-market`)
    pub market: String,
    /// Bookmaker identifier (`data-bk`)
    pub bookmaker: String,
    /// Cell text outside the price spans, used for parameter lookup
    pub label: String,
    /// Price tokens in document order
    pub values: Vec<String>,
}

/// A cell mapped onto the taxonomy with its prices parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedOdds {
    pub market: ResolvedMarket,
    pub bookmaker: String,
    pub prices: OddsPrices,
    pub format: OddsFormat,
}

/// Parse a single price token into decimal odds.
///
/// `"2.10"` is decimal, `"11/10"` fractional and `"+150"` / `"-200"` american.
pub fn parse_price(token: &str) -> Option<(f64, OddsFormat)> {
    let token = token.trim();

    if let Some((num, den)) = token.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if num <= 0.0 || den <= 0.0 {
            return None;
        }
        return Some((num / den + 1.0, OddsFormat::Fractional));
    }

    if token.starts_with('+') || token.starts_with('-') {
        let line: f64 = token.parse().ok()?;
        if line.abs() < 100.0 {
            return None;
        }
        let decimal = if line > 0.0 {
            1.0 + line / 100.0
        } else {
            1.0 + 100.0 / line.abs()
        };
        return Some((decimal, OddsFormat::American));
    }

    let value: f64 = token.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some((value, OddsFormat::Decimal))
}

/// Turn price tokens into prices. Unparseable tokens are skipped; the first
/// parsed token decides the representation kind.
pub fn parse_odds_values<S: AsRef<str>>(tokens: &[S]) -> Result<(OddsPrices, OddsFormat), ParseError> {
    let parsed: Vec<(f64, OddsFormat)> = tokens
        .iter()
        .filter_map(|t| parse_price(t.as_ref()))
        .collect();

    let format = match parsed.first() {
        Some((_, format)) => *format,
        None => return Err(ParseError::NoOddsValues),
    };

    let values: Vec<f64> = parsed.iter().map(|(v, _)| *v).collect();
    let prices = OddsPrices::from_values(&values).ok_or(ParseError::TooManyOddsValues(values.len()))?;

    Ok((prices, format))
}

/// Interpret a cell for `sport`.
///
/// `Ok(None)` is a mapping miss (unknown market, or no line in a parameterized
/// market) and is expected noise. `Err` means the cell carried no usable prices.
pub fn interpret_cell(sport: Sport, cell: &RawOddsCell) -> Result<Option<ExtractedOdds>, ParseError> {
    let display_text = if cell.label.trim().is_empty() {
        cell.market.as_str()
    } else {
        cell.label.as_str()
    };

    let market = match taxonomy::resolve(sport, &cell.market, display_text) {
        Some(market) => market,
        None => return Ok(None),
    };

    let (prices, format) = parse_odds_values(&cell.values)?;

    Ok(Some(ExtractedOdds {
        market,
        bookmaker: cell.bookmaker.clone(),
        prices,
        format,
    }))
}
