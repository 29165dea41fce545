use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ParseError;

static RELATIVE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([A-Za-z]+),?\s+)?(\d{1,2}:\d{2})$").expect("valid regex")
});

/// Resolve a listing time label against `anchor` (the crawl date).
///
/// Accepts `"20:45"`, `"Today 20:45"`, `"Tomorrow 20:45"`, `"Yesterday 20:45"`,
/// `"Sat 20:45"` (next Saturday on or after the anchor) and `"02 May 2024 20:45"`.
pub fn resolve_time_label(label: &str, anchor: NaiveDate) -> Result<NaiveDateTime, ParseError> {
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let unparsable = || ParseError::TimeLabel(label.clone());

    if let Some(caps) = RELATIVE_LABEL.captures(&label) {
        let time =
            NaiveTime::parse_from_str(&caps[2], "%H:%M").map_err(|_| unparsable())?;
        let date = match caps.get(1) {
            None => anchor,
            Some(word) => resolve_day_word(word.as_str(), anchor).ok_or_else(unparsable)?,
        };
        return Ok(date.and_time(time));
    }

    NaiveDateTime::parse_from_str(&label.replace(',', ""), "%d %b %Y %H:%M")
        .map_err(|_| unparsable())
}

fn resolve_day_word(word: &str, anchor: NaiveDate) -> Option<NaiveDate> {
    match word.to_lowercase().as_str() {
        "today" => Some(anchor),
        "tomorrow" => Some(anchor + Duration::days(1)),
        "yesterday" => Some(anchor - Duration::days(1)),
        other => {
            let weekday: Weekday = other.parse().ok()?;
            let ahead = (7 + weekday.num_days_from_monday() as i64
                - anchor.weekday().num_days_from_monday() as i64)
                % 7;
            Some(anchor + Duration::days(ahead))
        }
    }
}
