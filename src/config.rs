use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::models::Sport;

/// A sport to crawl and the listing path its leagues live under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub sport: Sport,
    pub path: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Listing site root
    pub base_url: String,

    /// SQLite database path
    pub database_url: String,

    /// Seconds a live odds entry stays in the cache
    pub live_odds_cache_timeout: u64,

    /// Budget in seconds for each navigation or markup wait
    pub page_timeout_secs: u64,

    /// Leagues crawled at the same time
    pub max_workers: usize,

    /// Pagination guard per league
    pub max_pages: u32,

    pub targets: Vec<CrawlTarget>,

    pub user_agent: Option<String>,

    /// Optional JSON file of team aliases
    pub team_aliases_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let max_workers: usize = env::var("CRAWL_MAX_WORKERS")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .context("CRAWL_MAX_WORKERS must be a valid number")?;
        if max_workers == 0 {
            bail!("CRAWL_MAX_WORKERS must be at least 1");
        }

        Ok(Config {
            base_url: env::var("ODDS_BASE_URL")
                .unwrap_or_else(|_| "https://www.oddsportal.com".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/odds.db".to_string()),

            live_odds_cache_timeout: env::var("LIVE_ODDS_CACHE_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("LIVE_ODDS_CACHE_TIMEOUT must be a valid number")?,

            page_timeout_secs: env::var("PAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("PAGE_TIMEOUT_SECS must be a valid number")?,

            max_workers,

            max_pages: env::var("CRAWL_MAX_PAGES")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("CRAWL_MAX_PAGES must be a valid number")?,

            targets: parse_targets(
                &env::var("CRAWL_SPORTS")
                    .unwrap_or_else(|_| "football:soccer,basketball:basketball,hockey:hockey".to_string()),
            )?,

            user_agent: env::var("CRAWL_USER_AGENT").ok().filter(|v| !v.trim().is_empty()),

            team_aliases_path: env::var("TEAM_ALIASES_PATH").ok().filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn live_odds_ttl(&self) -> Duration {
        Duration::from_secs(self.live_odds_cache_timeout)
    }
}

/// Parse `sport:path` pairs, e.g. `football:soccer,hockey:hockey`
pub fn parse_targets(raw: &str) -> Result<Vec<CrawlTarget>> {
    let mut targets = Vec::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((sport, path)) = pair.split_once(':') else {
            bail!("CRAWL_SPORTS entry {:?} must look like sport:path", pair);
        };
        let sport: Sport = sport
            .parse()
            .with_context(|| format!("CRAWL_SPORTS entry {:?} names an unknown sport", pair))?;
        let path = path.trim().trim_matches('/');
        if path.is_empty() {
            bail!("CRAWL_SPORTS entry {:?} has an empty path", pair);
        }

        targets.push(CrawlTarget {
            sport,
            path: path.to_string(),
        });
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets("football:soccer, basketball:/basketball/ ,").unwrap();
        assert_eq!(
            targets,
            vec![
                CrawlTarget {
                    sport: Sport::Football,
                    path: "soccer".to_string()
                },
                CrawlTarget {
                    sport: Sport::Basketball,
                    path: "basketball".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_targets_rejects_bad_entries() {
        assert!(parse_targets("curling:curling").is_err());
        assert!(parse_targets("football").is_err());
        assert!(parse_targets("football:").is_err());
        assert!(parse_targets("").unwrap().is_empty());
    }
}
