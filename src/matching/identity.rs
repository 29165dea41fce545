use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::{CatalogueStore, StoreError};
use crate::extract::league_info;
use crate::models::{League, Match, MatchSighting, Sport, Team};

/// Team alias configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamAliases {
    pub teams: Vec<TeamAliasEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAliasEntry {
    /// Name stored in the catalogue
    pub canonical: String,
    /// Spellings seen on listings (abbreviations, sponsor names, ...)
    pub aliases: Vec<String>,
}

impl TeamAliases {
    /// Load aliases from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read team aliases file")?;
        serde_json::from_str(&content).context("Failed to parse team aliases JSON")
    }
}

/// Get-or-create-or-update of leagues, teams and matches by natural key.
///
/// Names are whitespace-collapsed (and team aliases applied) before they reach
/// the store, so "Man  Utd" and "Manchester United" land on the same row.
pub struct IdentityResolver {
    store: Arc<CatalogueStore>,

    /// Map of lowercased alias -> canonical name
    aliases: HashMap<String, String>,
}

impl IdentityResolver {
    /// Create a new resolver with no aliases
    pub fn new(store: Arc<CatalogueStore>) -> Self {
        Self {
            store,
            aliases: HashMap::new(),
        }
    }

    pub fn with_aliases(store: Arc<CatalogueStore>, config: TeamAliases) -> Self {
        let mut resolver = Self::new(store);
        for entry in config.teams {
            let canonical = collapse_whitespace(&entry.canonical);
            resolver.add_alias(&canonical, &canonical);
            for alias in entry.aliases {
                resolver.add_alias(&alias, &canonical);
            }
        }

        info!("Loaded {} team alias mappings", resolver.aliases.len());
        resolver
    }

    /// Add a new alias mapping
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias_key(alias), collapse_whitespace(canonical));
    }

    /// Catalogue form of a team name as seen on a listing
    pub fn team_name(&self, name: &str) -> String {
        let collapsed = collapse_whitespace(name);
        self.aliases
            .get(&collapsed.to_lowercase())
            .cloned()
            .unwrap_or(collapsed)
    }

    /// Resolve a league by `(name, sport)`, refreshing its locator and the country derived from it
    pub async fn resolve_league(&self, name: &str, sport: Sport, locator: &str) -> Result<League, StoreError> {
        let name = collapse_whitespace(name);
        let (country, _) = league_info(locator);

        let league = self.store.upsert_league(&name, sport, &country, locator).await?;
        debug!("Resolved league {} ({}) -> {}", league.name, sport, league.id);
        Ok(league)
    }

    /// Resolve a team by `(name, league)`
    pub async fn resolve_team(&self, name: &str, league: &League) -> Result<Team, StoreError> {
        let name = self.team_name(name);
        self.store.upsert_team(&name, league.id, league.sport).await
    }

    /// Resolve a match by `(home, away, date)`; status, time and known scores follow the sighting
    pub async fn resolve_match(
        &self,
        home: &Team,
        away: &Team,
        league: &League,
        sighting: &MatchSighting,
    ) -> Result<Match, StoreError> {
        let fixture = self
            .store
            .upsert_match(league.id, league.sport, home.id, away.id, sighting)
            .await?;

        debug!(
            "Resolved match {} vs {} on {} -> {} ({})",
            home.name,
            away.name,
            sighting.match_date,
            fixture.id,
            fixture.status.as_str()
        );
        Ok(fixture)
    }
}

fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn alias_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::models::MatchStatus;

    async fn resolver() -> IdentityResolver {
        let store = CatalogueStore::new("sqlite::memory:").await.unwrap();
        IdentityResolver::new(Arc::new(store))
    }

    fn sighting(status: MatchStatus) -> MatchSighting {
        MatchSighting {
            match_date: NaiveDate::from_ymd_opt(2024, 5, 4).unwrap(),
            match_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            status,
            home_score: None,
            away_score: None,
        }
    }

    #[tokio::test]
    async fn test_team_name_aliases() {
        let mut resolver = resolver().await;
        resolver.add_alias("Man Utd", "Manchester United");
        resolver.add_alias("man united", "Manchester United");

        assert_eq!(resolver.team_name("MAN   UTD"), "Manchester United");
        assert_eq!(resolver.team_name(" Arsenal "), "Arsenal"); // Unknown team stays as-is
        assert_eq!(resolver.team_name("Manchester  United"), "Manchester United");
        assert_eq!(resolver.team_name("Man City"), "Man City");
    }

    #[tokio::test]
    async fn test_aliases_from_config() {
        let store = Arc::new(CatalogueStore::new("sqlite::memory:").await.unwrap());
        let config: TeamAliases = serde_json::from_str(
            r#"{"teams": [{"canonical": "Paris Saint-Germain", "aliases": ["PSG", "Paris SG"]}]}"#,
        )
        .unwrap();
        let resolver = IdentityResolver::with_aliases(store, config);

        assert_eq!(resolver.team_name("psg"), "Paris Saint-Germain");
        assert_eq!(resolver.team_name("Paris  SG"), "Paris Saint-Germain");
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let resolver = resolver().await;

        let league = resolver
            .resolve_league("Premier  League", Sport::Football, "/soccer/england/premier-league")
            .await
            .unwrap();
        assert_eq!(league.name, "Premier League");
        assert_eq!(league.country, "England");

        let again = resolver
            .resolve_league("Premier League", Sport::Football, "/soccer/england/premier-league")
            .await
            .unwrap();
        assert_eq!(league.id, again.id);

        let home = resolver.resolve_team("Arsenal", &league).await.unwrap();
        let home_again = resolver.resolve_team("Arsenal ", &league).await.unwrap();
        let away = resolver.resolve_team("Chelsea", &league).await.unwrap();
        assert_eq!(home.id, home_again.id);

        let first = resolver
            .resolve_match(&home, &away, &league, &sighting(MatchStatus::Scheduled))
            .await
            .unwrap();
        let second = resolver
            .resolve_match(&home, &away, &league, &sighting(MatchStatus::Live))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, MatchStatus::Live);
    }

    #[tokio::test]
    async fn test_same_team_name_in_two_leagues() {
        let resolver = resolver().await;
        let cup = resolver
            .resolve_league("FA Cup", Sport::Football, "/soccer/england/fa-cup")
            .await
            .unwrap();
        let league = resolver
            .resolve_league("Premier League", Sport::Football, "/soccer/england/premier-league")
            .await
            .unwrap();

        let a = resolver.resolve_team("Arsenal", &cup).await.unwrap();
        let b = resolver.resolve_team("Arsenal", &league).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_creates_one_row() {
        let resolver = Arc::new(resolver().await);
        let league = resolver
            .resolve_league("La Liga", Sport::Football, "/soccer/spain/laliga")
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            let league = league.clone();
            handles.push(tokio::spawn(async move {
                let home = resolver.resolve_team("Real Madrid", &league).await.unwrap();
                let away = resolver.resolve_team("Barcelona", &league).await.unwrap();
                resolver
                    .resolve_match(&home, &away, &league, &sighting(MatchStatus::Scheduled))
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let counts = resolver.store.counts().await.unwrap();
        assert_eq!(counts.teams, 2);
        assert_eq!(counts.matches, 1);
    }
}
