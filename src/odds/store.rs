use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use super::cache::{Clock, SystemClock, TtlCache};
use crate::db::{parameter_key, CatalogueStore, NewOdds, StoreError};
use crate::extract::ExtractedOdds;
use crate::models::{Bookmaker, Odds, OddsFormat, OddsPrices, OddsSnapshot, OddsSource};
use crate::taxonomy::MarketKey;

#[derive(Debug, thiserror::Error)]
pub enum OddsError {
    #[error("match {0} does not exist")]
    UnknownMatch(i64),

    #[error("invalid prices {0:?}")]
    InvalidPrices(OddsPrices),

    #[error("bookmaker name is empty")]
    EmptyBookmaker,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What to read back from the odds store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OddsQuery {
    pub match_id: i64,
    pub market_key: MarketKey,
    pub bookmaker_id: Option<i64>,
    pub parameter: Option<f64>,
    pub is_live: bool,
}

impl OddsQuery {
    pub fn new(match_id: i64, market_key: MarketKey) -> Self {
        Self {
            match_id,
            market_key,
            bookmaker_id: None,
            parameter: None,
            is_live: false,
        }
    }

    pub fn bookmaker(mut self, bookmaker_id: i64) -> Self {
        self.bookmaker_id = Some(bookmaker_id);
        self
    }

    pub fn parameter(mut self, parameter: f64) -> Self {
        self.parameter = Some(parameter);
        self
    }

    pub fn live(mut self) -> Self {
        self.is_live = true;
        self
    }
}

/// Cache slot for live odds: `odds:{match}:{market}[@{parameter}][:{bookmaker}]`
pub fn cache_key(
    match_id: i64,
    market_key: MarketKey,
    parameter: Option<f64>,
    bookmaker_id: Option<i64>,
) -> String {
    let mut key = format!("odds:{}:{}", match_id, market_key);
    if parameter.is_some() {
        key.push('@');
        key.push_str(&parameter_key(parameter));
    }
    if let Some(id) = bookmaker_id {
        key.push_str(&format!(":{}", id));
    }
    key
}

/// Durable odds with a TTL cache in front of live reads.
///
/// Every save hits the database. Live saves additionally refresh the cache,
/// so live reads within the TTL never touch the database.
pub struct OddsStore {
    catalogue: Arc<CatalogueStore>,
    cache: TtlCache<OddsSnapshot>,
}

impl OddsStore {
    pub fn new(catalogue: Arc<CatalogueStore>, live_ttl: Duration) -> Self {
        Self::with_clock(catalogue, live_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(catalogue: Arc<CatalogueStore>, live_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalogue,
            cache: TtlCache::with_clock(live_ttl, clock),
        }
    }

    pub fn catalogue(&self) -> &CatalogueStore {
        &self.catalogue
    }

    /// Save decimal prices for one `(match, bookmaker, market, parameter)`
    pub async fn save(
        &self,
        match_id: i64,
        bookmaker_name: &str,
        market_key: MarketKey,
        parameter: Option<f64>,
        prices: OddsPrices,
        is_live: bool,
    ) -> Result<Odds, OddsError> {
        self.save_with_format(
            bookmaker_name,
            NewOdds {
                match_id,
                bookmaker_id: 0,
                market_key,
                parameter,
                prices,
                format: OddsFormat::Decimal,
                is_live,
            },
        )
        .await
    }

    /// Save a cell produced by the extractor
    pub async fn save_extracted(
        &self,
        match_id: i64,
        extracted: &ExtractedOdds,
        is_live: bool,
    ) -> Result<Odds, OddsError> {
        self.save_with_format(
            &extracted.bookmaker,
            NewOdds {
                match_id,
                bookmaker_id: 0,
                market_key: extracted.market.key,
                parameter: extracted.market.parameter,
                prices: extracted.prices,
                format: extracted.format,
                is_live,
            },
        )
        .await
    }

    async fn save_with_format(&self, bookmaker_name: &str, mut new: NewOdds) -> Result<Odds, OddsError> {
        if !new.prices.is_valid() {
            return Err(OddsError::InvalidPrices(new.prices));
        }
        let bookmaker_name = bookmaker_name.trim();
        if bookmaker_name.is_empty() {
            return Err(OddsError::EmptyBookmaker);
        }
        if !self.catalogue.match_exists(new.match_id).await? {
            return Err(OddsError::UnknownMatch(new.match_id));
        }

        let bookmaker = self.catalogue.upsert_bookmaker(bookmaker_name).await?;
        new.bookmaker_id = bookmaker.id;
        let odds = self.catalogue.upsert_odds(&new).await?;

        if odds.is_live {
            self.refresh_live_cache(&odds, &bookmaker).await;
        }

        Ok(odds)
    }

    async fn refresh_live_cache(&self, odds: &Odds, bookmaker: &Bookmaker) {
        let key = cache_key(odds.match_id, odds.market_key, odds.parameter, Some(bookmaker.id));
        self.cache.set(key, snapshot(odds, bookmaker)).await;

        // The bookmaker-less slot holds whichever bookmaker wins arbitration
        self.refresh_best_slot(odds, None, odds.parameter).await;

        // Line-less reads rank every line of the market, same as the durable fallback
        if odds.parameter.is_some() {
            self.refresh_best_slot(odds, Some(bookmaker.id), None).await;
            self.refresh_best_slot(odds, None, None).await;
        }
    }

    async fn refresh_best_slot(&self, odds: &Odds, bookmaker_id: Option<i64>, parameter: Option<f64>) {
        match self
            .catalogue
            .best_odds(odds.match_id, odds.market_key, true, bookmaker_id, parameter)
            .await
        {
            Ok(Some(mut best)) => {
                best.source = OddsSource::Cache;
                let key = cache_key(odds.match_id, odds.market_key, parameter, bookmaker_id);
                self.cache.set(key, best).await;
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to refresh best live odds for match {}: {}", odds.match_id, e),
        }
    }

    /// Drop expired live entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let purged = self.cache.purge_expired().await;
        if purged > 0 {
            debug!("Purged {} expired live odds entries", purged);
        }
        purged
    }

    /// Read odds. Live reads check the cache first and fall back to the database.
    pub async fn get(&self, query: &OddsQuery) -> Result<Option<OddsSnapshot>, OddsError> {
        if query.is_live {
            let key = cache_key(query.match_id, query.market_key, query.parameter, query.bookmaker_id);
            if let Some(hit) = self.cache.get(&key).await {
                debug!("Live odds cache hit for {}", key);
                return Ok(Some(hit));
            }
        }

        let snapshot = self
            .catalogue
            .best_odds(
                query.match_id,
                query.market_key,
                query.is_live,
                query.bookmaker_id,
                query.parameter,
            )
            .await?;

        Ok(snapshot)
    }

    /// Like [`get`](Self::get), with prices scaled by the boost active at `at`
    pub async fn get_boosted(
        &self,
        query: &OddsQuery,
        at: DateTime<Utc>,
    ) -> Result<Option<OddsSnapshot>, OddsError> {
        let Some(mut snapshot) = self.get(query).await? else {
            return Ok(None);
        };

        if let Some(multiplier) = self.catalogue.active_boost(query.match_id, at).await? {
            snapshot.prices = snapshot.prices.boosted(multiplier);
        }

        Ok(Some(snapshot))
    }

    /// Save odds, logging and swallowing any failure
    pub async fn save_odds(
        &self,
        match_id: i64,
        market_key: MarketKey,
        bookmaker_name: &str,
        prices: OddsPrices,
        parameter: Option<f64>,
        is_live: bool,
    ) -> Option<Odds> {
        match self
            .save(match_id, bookmaker_name, market_key, parameter, prices, is_live)
            .await
        {
            Ok(odds) => Some(odds),
            Err(e) => {
                error!(
                    "Failed to save {} odds for match {} from {}: {}",
                    market_key, match_id, bookmaker_name, e
                );
                None
            }
        }
    }

    /// Read odds, treating failures as "no data"
    pub async fn get_odds(
        &self,
        match_id: i64,
        market_key: MarketKey,
        bookmaker_id: Option<i64>,
        is_live: bool,
    ) -> Option<OddsSnapshot> {
        let query = OddsQuery {
            match_id,
            market_key,
            bookmaker_id,
            parameter: None,
            is_live,
        };

        match self.get(&query).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to read {} odds for match {}: {}", market_key, match_id, e);
                None
            }
        }
    }
}

fn snapshot(odds: &Odds, bookmaker: &Bookmaker) -> OddsSnapshot {
    OddsSnapshot {
        match_id: odds.match_id,
        bookmaker_id: bookmaker.id,
        bookmaker_name: bookmaker.name.clone(),
        bookmaker_priority: bookmaker.priority,
        market_key: odds.market_key,
        parameter: odds.parameter,
        prices: odds.prices,
        format: odds.format,
        is_live: odds.is_live,
        updated_at: odds.updated_at,
        source: OddsSource::Cache,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::models::{MatchSighting, MatchStatus, Sport};
    use crate::odds::ManualClock;

    async fn setup(clock: Arc<ManualClock>) -> (Arc<OddsStore>, i64) {
        let catalogue = Arc::new(CatalogueStore::new("sqlite::memory:").await.unwrap());
        let league = catalogue
            .upsert_league("ATP Madrid", Sport::Tennis, "Spain", "/tennis/spain/atp-madrid")
            .await
            .unwrap();
        let home = catalogue.upsert_team("Alcaraz C.", league.id, Sport::Tennis).await.unwrap();
        let away = catalogue.upsert_team("Sinner J.", league.id, Sport::Tennis).await.unwrap();
        let sighting = MatchSighting {
            match_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            match_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            status: MatchStatus::Live,
            home_score: None,
            away_score: None,
        };
        let fixture = catalogue
            .upsert_match(league.id, Sport::Tennis, home.id, away.id, &sighting)
            .await
            .unwrap();

        let store = OddsStore::with_clock(catalogue, Duration::from_secs(5), clock);
        (Arc::new(store), fixture.id)
    }

    fn prices(home: f64, away: f64) -> OddsPrices {
        OddsPrices {
            home,
            draw: None,
            away: Some(away),
        }
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(7, MarketKey::OneXTwo, None, None), "odds:7:1x2");
        assert_eq!(cache_key(7, MarketKey::OverUnder, Some(2.5), Some(3)), "odds:7:over_under@2.5:3");
    }

    #[tokio::test]
    async fn test_live_read_goes_stale_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let (store, match_id) = setup(clock.clone()).await;

        let saved = store
            .save_odds(match_id, MarketKey::MatchWinner, "bet365", prices(1.60, 2.30), None, true)
            .await
            .unwrap();

        clock.advance(Duration::from_secs(3));
        let cached = store
            .get_odds(match_id, MarketKey::MatchWinner, None, true)
            .await
            .unwrap();
        assert_eq!(cached.source, OddsSource::Cache);
        assert_eq!(cached.prices, saved.prices);

        clock.advance(Duration::from_secs(3));
        let durable = store
            .get_odds(match_id, MarketKey::MatchWinner, None, true)
            .await
            .unwrap();
        assert_eq!(durable.source, OddsSource::Store);
        assert_eq!(durable.prices, saved.prices);
    }

    #[tokio::test]
    async fn test_live_line_market_read_hits_cache() {
        let clock = Arc::new(ManualClock::new());
        let (store, match_id) = setup(clock.clone()).await;

        let saved = store
            .save_odds(match_id, MarketKey::OverUnder, "pinnacle", prices(1.85, 1.95), Some(2.5), true)
            .await
            .unwrap();

        clock.advance(Duration::from_secs(3));
        let any_line = store
            .get_odds(match_id, MarketKey::OverUnder, None, true)
            .await
            .unwrap();
        assert_eq!(any_line.source, OddsSource::Cache);
        assert_eq!(any_line.parameter, Some(2.5));
        assert_eq!(any_line.prices, saved.prices);

        let pinned = store
            .get_odds(match_id, MarketKey::OverUnder, Some(saved.bookmaker_id), true)
            .await
            .unwrap();
        assert_eq!(pinned.source, OddsSource::Cache);
        assert_eq!(pinned.parameter, Some(2.5));

        let line = store
            .get(&OddsQuery::new(match_id, MarketKey::OverUnder).parameter(2.5).live())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.source, OddsSource::Cache);
    }

    #[tokio::test]
    async fn test_line_less_cache_follows_priority() {
        let (store, match_id) = setup(Arc::new(ManualClock::new())).await;

        let low = store
            .save(match_id, "alpha", MarketKey::OverUnder, Some(2.5), prices(1.85, 1.95), true)
            .await
            .unwrap();
        let high = store
            .save(match_id, "beta", MarketKey::OverUnder, Some(3.5), prices(2.10, 1.70), true)
            .await
            .unwrap();
        store
            .catalogue()
            .set_bookmaker_priority(high.bookmaker_id, 3)
            .await
            .unwrap();

        // A later save from the lower priority bookmaker still leaves the winner in place
        store
            .save(match_id, "alpha", MarketKey::OverUnder, Some(2.5), prices(1.80, 2.00), true)
            .await
            .unwrap();

        let best = store.get_odds(match_id, MarketKey::OverUnder, None, true).await.unwrap();
        assert_eq!(best.source, OddsSource::Cache);
        assert_eq!(best.bookmaker_id, high.bookmaker_id);
        assert_eq!(best.parameter, Some(3.5));

        let durable = store
            .catalogue()
            .best_odds(match_id, MarketKey::OverUnder, true, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(durable.bookmaker_id, best.bookmaker_id);
        assert_eq!(durable.parameter, best.parameter);

        let pinned = store
            .get_odds(match_id, MarketKey::OverUnder, Some(low.bookmaker_id), true)
            .await
            .unwrap();
        assert_eq!(pinned.prices.home, 1.80);
    }

    #[tokio::test]
    async fn test_purge_drops_expired_live_entries() {
        let clock = Arc::new(ManualClock::new());
        let (store, match_id) = setup(clock.clone()).await;
        store
            .save_odds(match_id, MarketKey::MatchWinner, "bet365", prices(1.60, 2.30), None, true)
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await, 0);

        clock.advance(Duration::from_secs(6));
        // Per-bookmaker slot and the best-of-market slot
        assert_eq!(store.purge_expired().await, 2);
        assert_eq!(store.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_saves_yield_one_row() {
        let (store, match_id) = setup(Arc::new(ManualClock::new())).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .save_odds(
                        match_id,
                        MarketKey::MatchWinner,
                        "pinnacle",
                        prices(1.50 + i as f64 / 100.0, 2.50),
                        None,
                        true,
                    )
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        let counts = store.catalogue().counts().await.unwrap();
        assert_eq!(counts.odds, 1);
        assert_eq!(counts.bookmakers, 1);
    }

    #[tokio::test]
    async fn test_priority_arbitration_and_tie_break() {
        let (store, match_id) = setup(Arc::new(ManualClock::new())).await;

        let first = store
            .save(match_id, "alpha", MarketKey::MatchWinner, None, prices(1.5, 2.5), false)
            .await
            .unwrap();
        let second = store
            .save(match_id, "beta", MarketKey::MatchWinner, None, prices(1.6, 2.4), false)
            .await
            .unwrap();

        let best = store.get_odds(match_id, MarketKey::MatchWinner, None, false).await.unwrap();
        assert_eq!(best.bookmaker_id, first.bookmaker_id);

        store
            .catalogue()
            .set_bookmaker_priority(second.bookmaker_id, 5)
            .await
            .unwrap();
        let best = store.get_odds(match_id, MarketKey::MatchWinner, None, false).await.unwrap();
        assert_eq!(best.bookmaker_id, second.bookmaker_id);
        assert_eq!(best.bookmaker_priority, 5);

        let pinned = store
            .get_odds(match_id, MarketKey::MatchWinner, Some(first.bookmaker_id), false)
            .await
            .unwrap();
        assert_eq!(pinned.prices.home, 1.5);
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_saved() {
        let (store, match_id) = setup(Arc::new(ManualClock::new())).await;

        assert!(store
            .save_odds(9999, MarketKey::MatchWinner, "bet365", prices(1.5, 2.5), None, false)
            .await
            .is_none());
        assert!(store
            .save_odds(match_id, MarketKey::MatchWinner, "bet365", prices(0.0, 2.5), None, false)
            .await
            .is_none());
        assert!(matches!(
            store
                .save(match_id, "  ", MarketKey::MatchWinner, None, prices(1.5, 2.5), false)
                .await,
            Err(OddsError::EmptyBookmaker)
        ));
        assert_eq!(store.catalogue().counts().await.unwrap().odds, 0);
        assert!(store.get_odds(match_id, MarketKey::MatchWinner, None, false).await.is_none());
    }

    #[tokio::test]
    async fn test_prematch_reads_skip_cache() {
        let (store, match_id) = setup(Arc::new(ManualClock::new())).await;
        store
            .save_odds(match_id, MarketKey::MatchWinner, "bet365", prices(1.5, 2.5), None, true)
            .await
            .unwrap();

        assert!(store.get_odds(match_id, MarketKey::MatchWinner, None, false).await.is_none());

        store
            .save_odds(match_id, MarketKey::MatchWinner, "unibet", prices(1.55, 2.45), None, false)
            .await
            .unwrap();
        let prematch = store.get_odds(match_id, MarketKey::MatchWinner, None, false).await.unwrap();
        assert_eq!(prematch.source, OddsSource::Store);
        assert!(!prematch.is_live);
    }

    #[tokio::test]
    async fn test_boosted_prices() {
        let (store, match_id) = setup(Arc::new(ManualClock::new())).await;
        store
            .save_odds(match_id, MarketKey::MatchWinner, "bet365", prices(2.0, 1.8), None, false)
            .await
            .unwrap();

        let now = Utc::now();
        store
            .catalogue()
            .add_boost_window(match_id, 1.5, now - chrono::Duration::minutes(5), now + chrono::Duration::minutes(5))
            .await
            .unwrap();

        let query = OddsQuery::new(match_id, MarketKey::MatchWinner);
        let boosted = store.get_boosted(&query, now).await.unwrap().unwrap();
        assert_eq!(boosted.prices.home, 3.0);

        let later = now + chrono::Duration::hours(1);
        let plain = store.get_boosted(&query, later).await.unwrap().unwrap();
        assert_eq!(plain.prices.home, 2.0);
    }
}
