use chrono::Utc;

use super::catalogue::{parse_timestamp, timestamp, CatalogueStore};
use super::retry::{with_retry, StoreError};
use crate::models::{Bookmaker, Odds, OddsFormat, OddsPrices, OddsSnapshot, OddsSource};
use crate::taxonomy::MarketKey;

/// Canonical text for an optional market parameter, part of the odds natural key
pub fn parameter_key(parameter: Option<f64>) -> String {
    match parameter {
        // -0.0 and 0.0 are the same line
        Some(p) if p == 0.0 => "0".to_string(),
        Some(p) => format!("{}", p),
        None => String::new(),
    }
}

/// Values written by one odds upsert
#[derive(Debug, Clone, Copy)]
pub struct NewOdds {
    pub match_id: i64,
    pub bookmaker_id: i64,
    pub market_key: MarketKey,
    pub parameter: Option<f64>,
    pub prices: OddsPrices,
    pub format: OddsFormat,
    pub is_live: bool,
}

impl CatalogueStore {
    /// Get or create a bookmaker by the identifier seen on the listings
    pub async fn upsert_bookmaker(&self, oddsportal_name: &str) -> Result<Bookmaker, StoreError> {
        let row: BookmakerRow = with_retry("upsert bookmaker", || async move {
            sqlx::query_as(
                r#"
                INSERT INTO bookmakers (oddsportal_name, name)
                VALUES (?, ?)
                ON CONFLICT (oddsportal_name) DO UPDATE SET oddsportal_name = excluded.oddsportal_name
                RETURNING id, oddsportal_name, name, priority
                "#,
            )
            .bind(oddsportal_name)
            .bind(oddsportal_name)
            .fetch_one(&self.pool)
            .await
        })
        .await?;

        Ok(row.into())
    }

    pub async fn bookmaker_by_id(&self, bookmaker_id: i64) -> Result<Option<Bookmaker>, StoreError> {
        let row: Option<BookmakerRow> =
            sqlx::query_as("SELECT id, oddsportal_name, name, priority FROM bookmakers WHERE id = ?")
                .bind(bookmaker_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Bookmaker::from))
    }

    /// Returns false when the bookmaker does not exist
    pub async fn set_bookmaker_priority(&self, bookmaker_id: i64, priority: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE bookmakers SET priority = ? WHERE id = ?")
            .bind(priority)
            .bind(bookmaker_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert odds or overwrite prices and liveness for the same
    /// `(match, bookmaker, market, parameter)`
    pub async fn upsert_odds(&self, new: &NewOdds) -> Result<Odds, StoreError> {
        let now = timestamp(Utc::now());
        let now = now.as_str();
        let key = parameter_key(new.parameter);
        let key = key.as_str();

        let row: OddsRow = with_retry("upsert odds", || async move {
            sqlx::query_as(
                r#"
                INSERT INTO odds (
                    match_id, bookmaker_id, market_key, parameter, parameter_key,
                    home_odds, draw_odds, away_odds, odds_format, is_live, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (match_id, bookmaker_id, market_key, parameter_key) DO UPDATE SET
                    home_odds = excluded.home_odds,
                    draw_odds = excluded.draw_odds,
                    away_odds = excluded.away_odds,
                    odds_format = excluded.odds_format,
                    is_live = excluded.is_live,
                    updated_at = excluded.updated_at
                RETURNING id, match_id, bookmaker_id, market_key, parameter, home_odds,
                    draw_odds, away_odds, odds_format, is_live, updated_at
                "#,
            )
            .bind(new.match_id)
            .bind(new.bookmaker_id)
            .bind(new.market_key.as_str())
            .bind(new.parameter)
            .bind(key)
            .bind(new.prices.home)
            .bind(new.prices.draw)
            .bind(new.prices.away)
            .bind(new.format.as_str())
            .bind(new.is_live)
            .bind(now)
            .fetch_one(&self.pool)
            .await
        })
        .await?;

        row.try_into()
    }

    /// Best stored odds for a match and market.
    ///
    /// Rows are ranked by bookmaker priority (highest first), then lowest
    /// bookmaker id, then most recent update.
    pub async fn best_odds(
        &self,
        match_id: i64,
        market_key: MarketKey,
        is_live: bool,
        bookmaker_id: Option<i64>,
        parameter: Option<f64>,
    ) -> Result<Option<OddsSnapshot>, StoreError> {
        let key = parameter.map(|p| parameter_key(Some(p)));

        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT o.match_id, o.bookmaker_id, b.name AS bookmaker_name,
                b.priority AS bookmaker_priority, o.market_key, o.parameter,
                o.home_odds, o.draw_odds, o.away_odds, o.odds_format, o.is_live, o.updated_at
            FROM odds o
            JOIN bookmakers b ON b.id = o.bookmaker_id
            WHERE o.match_id = ? AND o.market_key = ? AND o.is_live = ?
                AND (? IS NULL OR o.bookmaker_id = ?)
                AND (? IS NULL OR o.parameter_key = ?)
            ORDER BY b.priority DESC, b.id ASC, o.updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(match_id)
        .bind(market_key.as_str())
        .bind(is_live)
        .bind(bookmaker_id)
        .bind(bookmaker_id)
        .bind(key.as_deref())
        .bind(key.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(OddsSnapshot::try_from).transpose()
    }
}

fn parse_market_key(value: &str) -> Result<MarketKey, StoreError> {
    value.parse().map_err(|_| StoreError::Corrupt {
        column: "market_key",
        value: value.to_string(),
    })
}

#[derive(sqlx::FromRow)]
struct BookmakerRow {
    id: i64,
    oddsportal_name: String,
    name: String,
    priority: i32,
}

impl From<BookmakerRow> for Bookmaker {
    fn from(row: BookmakerRow) -> Self {
        Bookmaker {
            id: row.id,
            oddsportal_name: row.oddsportal_name,
            name: row.name,
            priority: row.priority,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OddsRow {
    id: i64,
    match_id: i64,
    bookmaker_id: i64,
    market_key: String,
    parameter: Option<f64>,
    home_odds: f64,
    draw_odds: Option<f64>,
    away_odds: Option<f64>,
    odds_format: String,
    is_live: bool,
    updated_at: String,
}

impl TryFrom<OddsRow> for Odds {
    type Error = StoreError;

    fn try_from(row: OddsRow) -> Result<Self, Self::Error> {
        Ok(Odds {
            id: row.id,
            match_id: row.match_id,
            bookmaker_id: row.bookmaker_id,
            market_key: parse_market_key(&row.market_key)?,
            parameter: row.parameter,
            prices: OddsPrices {
                home: row.home_odds,
                draw: row.draw_odds,
                away: row.away_odds,
            },
            format: OddsFormat::parse(&row.odds_format),
            is_live: row.is_live,
            updated_at: parse_timestamp(&row.updated_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    match_id: i64,
    bookmaker_id: i64,
    bookmaker_name: String,
    bookmaker_priority: i32,
    market_key: String,
    parameter: Option<f64>,
    home_odds: f64,
    draw_odds: Option<f64>,
    away_odds: Option<f64>,
    odds_format: String,
    is_live: bool,
    updated_at: String,
}

impl TryFrom<SnapshotRow> for OddsSnapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(OddsSnapshot {
            match_id: row.match_id,
            bookmaker_id: row.bookmaker_id,
            bookmaker_name: row.bookmaker_name,
            bookmaker_priority: row.bookmaker_priority,
            market_key: parse_market_key(&row.market_key)?,
            parameter: row.parameter,
            prices: OddsPrices {
                home: row.home_odds,
                draw: row.draw_odds,
                away: row.away_odds,
            },
            format: OddsFormat::parse(&row.odds_format),
            is_live: row.is_live,
            updated_at: parse_timestamp(&row.updated_at),
            source: OddsSource::Store,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::models::{MatchSighting, MatchStatus, Sport};

    async fn store_with_match() -> (CatalogueStore, i64) {
        let store = CatalogueStore::new("sqlite::memory:").await.unwrap();
        let league = store
            .upsert_league("NBA", Sport::Basketball, "Usa", "/basketball/usa/nba")
            .await
            .unwrap();
        let home = store.upsert_team("Boston Celtics", league.id, Sport::Basketball).await.unwrap();
        let away = store.upsert_team("Miami Heat", league.id, Sport::Basketball).await.unwrap();
        let sighting = MatchSighting {
            match_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            match_time: NaiveTime::from_hms_opt(1, 30, 0).unwrap(),
            status: MatchStatus::Live,
            home_score: None,
            away_score: None,
        };
        let fixture = store
            .upsert_match(league.id, Sport::Basketball, home.id, away.id, &sighting)
            .await
            .unwrap();
        (store, fixture.id)
    }

    fn new_odds(match_id: i64, bookmaker_id: i64, parameter: Option<f64>, home: f64) -> NewOdds {
        NewOdds {
            match_id,
            bookmaker_id,
            market_key: MarketKey::OverUnder,
            parameter,
            prices: OddsPrices {
                home,
                draw: None,
                away: Some(1.90),
            },
            format: OddsFormat::Decimal,
            is_live: true,
        }
    }

    #[test]
    fn test_parameter_key() {
        assert_eq!(parameter_key(None), "");
        assert_eq!(parameter_key(Some(2.5)), "2.5");
        assert_eq!(parameter_key(Some(-1.0)), "-1");
        assert_eq!(parameter_key(Some(0.0)), "0");
        assert_eq!(parameter_key(Some(-0.0)), "0");
    }

    #[tokio::test]
    async fn test_bookmaker_upsert_is_idempotent() {
        let (store, _) = store_with_match().await;
        let first = store.upsert_bookmaker("bet365").await.unwrap();
        let second = store.upsert_bookmaker("bet365").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.priority, 0);
        assert!(store.set_bookmaker_priority(first.id, 7).await.unwrap());
        assert_eq!(store.bookmaker_by_id(first.id).await.unwrap().unwrap().priority, 7);
        assert!(!store.set_bookmaker_priority(9999, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_odds_keyed_by_parameter() {
        let (store, match_id) = store_with_match().await;
        let bk = store.upsert_bookmaker("pinnacle").await.unwrap();

        let first = store.upsert_odds(&new_odds(match_id, bk.id, Some(210.5), 1.80)).await.unwrap();
        let updated = store.upsert_odds(&new_odds(match_id, bk.id, Some(210.5), 1.85)).await.unwrap();
        store.upsert_odds(&new_odds(match_id, bk.id, Some(212.5), 2.00)).await.unwrap();
        store.upsert_odds(&new_odds(match_id, bk.id, None, 1.70)).await.unwrap();
        store.upsert_odds(&new_odds(match_id, bk.id, None, 1.75)).await.unwrap();

        assert_eq!(first.id, updated.id);
        assert_eq!(updated.prices.home, 1.85);
        assert_eq!(store.counts().await.unwrap().odds, 3);

        let line = store
            .best_odds(match_id, MarketKey::OverUnder, true, None, Some(212.5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.prices.home, 2.00);
    }

    #[tokio::test]
    async fn test_signed_zero_line_is_one_row() {
        let (store, match_id) = store_with_match().await;
        let bk = store.upsert_bookmaker("pinnacle").await.unwrap();

        let first = store.upsert_odds(&new_odds(match_id, bk.id, Some(0.0), 1.80)).await.unwrap();
        let second = store.upsert_odds(&new_odds(match_id, bk.id, Some(-0.0), 1.95)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.counts().await.unwrap().odds, 1);

        let line = store
            .best_odds(match_id, MarketKey::OverUnder, true, None, Some(-0.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.prices.home, 1.95);
    }

    #[tokio::test]
    async fn test_best_odds_priority_then_lowest_id() {
        let (store, match_id) = store_with_match().await;
        let low = store.upsert_bookmaker("alpha").await.unwrap();
        let high = store.upsert_bookmaker("beta").await.unwrap();
        let tied = store.upsert_bookmaker("gamma").await.unwrap();

        for (bk, home) in [(&low, 1.5), (&high, 1.6), (&tied, 1.7)] {
            store.upsert_odds(&new_odds(match_id, bk.id, None, home)).await.unwrap();
        }

        store.set_bookmaker_priority(high.id, 10).await.unwrap();
        let best = store
            .best_odds(match_id, MarketKey::OverUnder, true, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.bookmaker_id, high.id);
        assert_eq!(best.source, OddsSource::Store);

        store.set_bookmaker_priority(tied.id, 10).await.unwrap();
        let best = store
            .best_odds(match_id, MarketKey::OverUnder, true, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.bookmaker_id, high.id);

        let pinned = store
            .best_odds(match_id, MarketKey::OverUnder, true, Some(low.id), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pinned.prices.home, 1.5);

        assert!(store
            .best_odds(match_id, MarketKey::OverUnder, false, None, None)
            .await
            .unwrap()
            .is_none());
    }
}
