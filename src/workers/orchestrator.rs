use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::fetcher::ListingFetcher;
use crate::api::{BrowserEngine, FetchError};
use crate::config::{Config, CrawlTarget};
use crate::db::StoreError;
use crate::extract::{
    extract_league_links, extract_rows, LeagueLink, RawMatchRow, LEAGUE_MENU_SELECTOR,
    LISTING_READY_SELECTOR,
};
use crate::matching::IdentityResolver;
use crate::models::{League, MatchSighting, Sport};
use crate::odds::OddsStore;

/// Why a league crawl stopped early
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Crawl knobs, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: String,
    pub targets: Vec<CrawlTarget>,
    pub page_timeout: Duration,
    pub max_workers: usize,
    pub max_pages: u32,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            targets: config.targets.clone(),
            page_timeout: config.page_timeout(),
            max_workers: config.max_workers,
            max_pages: config.max_pages,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/",
            self.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }
}

/// Outcome of one full crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub sports_processed: usize,
    pub sports_failed: usize,
    pub leagues_processed: usize,
    pub leagues_failed: usize,
    pub pages: usize,
    pub matches_processed: usize,
    pub rows_skipped: usize,
    pub odds_saved: usize,
}

impl RunReport {
    fn absorb(&mut self, league: &LeagueOutcome) {
        self.leagues_processed += 1;
        self.pages += league.pages;
        self.matches_processed += league.matches_processed;
        self.rows_skipped += league.rows_skipped;
        self.odds_saved += league.odds_saved;
    }
}

#[derive(Debug, Default)]
struct LeagueOutcome {
    pages: usize,
    matches_processed: usize,
    rows_skipped: usize,
    odds_saved: usize,
}

/// Drives one crawl across every configured sport and league.
///
/// Each league is one unit of work on a bounded pool. A league that fails
/// (timeout, navigation error, missing markup, store error) is logged and
/// contributes nothing; the run carries on. Only a page engine that cannot
/// start aborts the run.
pub struct Orchestrator {
    engine: Arc<dyn BrowserEngine>,
    resolver: Arc<IdentityResolver>,
    odds: Arc<OddsStore>,
    settings: Arc<CrawlSettings>,
    anchor_date: Option<NaiveDate>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        resolver: Arc<IdentityResolver>,
        odds: Arc<OddsStore>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            engine,
            resolver,
            odds,
            settings: Arc::new(settings),
            anchor_date: None,
        }
    }

    /// Resolve relative time labels against `date` instead of today
    pub fn with_anchor_date(mut self, date: NaiveDate) -> Self {
        self.anchor_date = Some(date);
        self
    }

    /// Run one full crawl to completion
    pub async fn run(&self) -> Result<RunReport, FetchError> {
        let anchor = self.anchor_date.unwrap_or_else(|| Utc::now().date_naive());
        let semaphore = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut report = RunReport::default();

        info!(
            "Starting crawl of {} sports (workers: {}, anchor: {})",
            self.settings.targets.len(),
            self.settings.max_workers,
            anchor
        );

        for target in &self.settings.targets {
            let leagues = match self.discover_leagues(target).await {
                Ok(leagues) => leagues,
                Err(e @ FetchError::EngineStart(_)) => return Err(e),
                Err(e) => {
                    error!("Failed to discover {} leagues: {}", target.sport, e);
                    report.sports_failed += 1;
                    continue;
                }
            };

            info!("Found {} {} leagues", leagues.len(), target.sport);
            report.sports_processed += 1;

            for link in leagues {
                let crawl = LeagueCrawl {
                    engine: self.engine.clone(),
                    resolver: self.resolver.clone(),
                    odds: self.odds.clone(),
                    settings: self.settings.clone(),
                    sport: target.sport,
                    link,
                    anchor,
                };
                let semaphore = semaphore.clone();

                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let name = crawl.link.name.clone();
                    (name, crawl.run().await)
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(outcome))) => {
                    info!(
                        "League {} done: {} pages, {} matches, {} odds",
                        name, outcome.pages, outcome.matches_processed, outcome.odds_saved
                    );
                    report.absorb(&outcome);
                    self.odds.purge_expired().await;
                }
                Ok((name, Err(e))) => {
                    error!("League {} failed: {}", name, e);
                    report.leagues_failed += 1;
                }
                Err(e) => {
                    error!("League task aborted: {}", e);
                    report.leagues_failed += 1;
                }
            }
        }

        info!(
            "Crawl complete: {} leagues processed, {} failed, {} matches, {} rows skipped, {} odds saved",
            report.leagues_processed,
            report.leagues_failed,
            report.matches_processed,
            report.rows_skipped,
            report.odds_saved
        );

        Ok(report)
    }

    async fn discover_leagues(&self, target: &CrawlTarget) -> Result<Vec<LeagueLink>, FetchError> {
        let page = self.engine.new_page().await?;
        let mut fetcher = ListingFetcher::new(page, self.settings.page_timeout, 1);
        let html = fetcher
            .open(&self.settings.url(&target.path), LEAGUE_MENU_SELECTOR)
            .await?;

        Ok(extract_league_links(&html, &target.path))
    }
}

/// One league's paginated crawl, owned by a worker task
struct LeagueCrawl {
    engine: Arc<dyn BrowserEngine>,
    resolver: Arc<IdentityResolver>,
    odds: Arc<OddsStore>,
    settings: Arc<CrawlSettings>,
    sport: Sport,
    link: LeagueLink,
    anchor: NaiveDate,
}

impl LeagueCrawl {
    async fn run(&self) -> Result<LeagueOutcome, CrawlError> {
        let league = self
            .resolver
            .resolve_league(&self.link.name, self.sport, &self.link.locator)
            .await?;

        let page = self.engine.new_page().await?;
        let mut fetcher = ListingFetcher::new(page, self.settings.page_timeout, self.settings.max_pages);
        let mut html = fetcher
            .open(&self.settings.url(&self.link.locator), LISTING_READY_SELECTOR)
            .await?;
        let mut outcome = LeagueOutcome::default();

        loop {
            outcome.pages += 1;

            let page = extract_rows(&html, self.sport, self.anchor);
            outcome.rows_skipped += page.skipped_rows;
            debug!(
                "{} page {}: {} rows, {} skipped rows, {} skipped cells",
                league.name,
                outcome.pages,
                page.rows.len(),
                page.skipped_rows,
                page.skipped_cells
            );

            for row in &page.rows {
                match self.store_row(&league, row).await {
                    Ok(saved) => {
                        outcome.matches_processed += 1;
                        outcome.odds_saved += saved;
                    }
                    Err(e) => {
                        warn!("Skipping {} vs {} in {}: {}", row.home, row.away, league.name, e);
                        outcome.rows_skipped += 1;
                    }
                }
            }

            match fetcher.next_page(LISTING_READY_SELECTOR).await? {
                Some(next) => html = next,
                None => break,
            }
        }

        Ok(outcome)
    }

    /// Resolve a row's identities and save its odds, returning how many were saved
    async fn store_row(&self, league: &League, row: &RawMatchRow) -> Result<usize, StoreError> {
        let home = self.resolver.resolve_team(&row.home, league).await?;
        let away = self.resolver.resolve_team(&row.away, league).await?;
        let sighting = MatchSighting {
            match_date: row.kickoff.date(),
            match_time: row.kickoff.time(),
            status: row.status,
            home_score: row.home_score,
            away_score: row.away_score,
        };
        let fixture = self.resolver.resolve_match(&home, &away, league, &sighting).await?;

        let mut saved = 0;
        for odds in &row.odds {
            match self.odds.save_extracted(fixture.id, odds, fixture.is_live()).await {
                Ok(_) => saved += 1,
                Err(e) => warn!(
                    "Odds not saved for match {} ({} from {}): {}",
                    fixture.id, odds.market.key, odds.bookmaker, e
                ),
            }
        }

        Ok(saved)
    }
}
