use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::info;

use super::retry::{with_retry, StoreError};
use crate::models::{CatalogueCounts, League, Match, MatchSighting, MatchStatus, Sport, Team};
use crate::taxonomy;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS leagues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        sport TEXT NOT NULL,
        country TEXT NOT NULL,
        locator TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (name, sport)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        league_id INTEGER NOT NULL REFERENCES leagues (id) ON DELETE CASCADE,
        sport TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (name, league_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        league_id INTEGER NOT NULL REFERENCES leagues (id) ON DELETE CASCADE,
        sport TEXT NOT NULL,
        home_team_id INTEGER NOT NULL REFERENCES teams (id) ON DELETE CASCADE,
        away_team_id INTEGER NOT NULL REFERENCES teams (id) ON DELETE CASCADE,
        match_date TEXT NOT NULL,
        match_time TEXT NOT NULL,
        status TEXT NOT NULL,
        home_score INTEGER,
        away_score INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (home_team_id, away_team_id, match_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bookmakers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        oddsportal_name TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        priority INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS market_types (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sport TEXT NOT NULL,
        market_key TEXT NOT NULL,
        name TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        UNIQUE (sport, market_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS odds (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        match_id INTEGER NOT NULL REFERENCES matches (id) ON DELETE CASCADE,
        bookmaker_id INTEGER NOT NULL REFERENCES bookmakers (id) ON DELETE CASCADE,
        market_key TEXT NOT NULL,
        parameter REAL,
        parameter_key TEXT NOT NULL,
        home_odds REAL NOT NULL CHECK (home_odds > 0),
        draw_odds REAL CHECK (draw_odds IS NULL OR draw_odds > 0),
        away_odds REAL CHECK (away_odds IS NULL OR away_odds > 0),
        odds_format TEXT NOT NULL,
        is_live BOOLEAN NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (match_id, bookmaker_id, market_key, parameter_key)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_odds_match_market
    ON odds (match_id, market_key, is_live)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS boost_windows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        match_id INTEGER NOT NULL REFERENCES matches (id) ON DELETE CASCADE,
        multiplier REAL NOT NULL CHECK (multiplier > 0),
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_boost_windows_match
    ON boost_windows (match_id)
    "#,
];

/// SQLite store for the odds catalogue: leagues, teams, matches, bookmakers and odds.
///
/// Every natural key is backed by a UNIQUE constraint and written with a single
/// `INSERT .. ON CONFLICT .. DO UPDATE .. RETURNING`, so concurrent resolvers
/// never create duplicates.
pub struct CatalogueStore {
    pub(super) pool: Pool<Sqlite>,
}

impl CatalogueStore {
    /// Create a new store and initialize the database
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Create data directory if needed
        if let Some(path) = database_url.strip_prefix("sqlite:") {
            let path = path.trim_start_matches("//");
            if !in_memory {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .context("Failed to create database directory")?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        // An in-memory database lives and dies with its connection
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init_schema().await?;
        store.seed_market_types().await?;

        info!("Catalogue store initialized");
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize catalogue schema")?;
        }
        Ok(())
    }

    /// Register every sport's market catalogue
    async fn seed_market_types(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for sport in Sport::ALL {
            for (key, name) in taxonomy::catalogue(sport) {
                sqlx::query(
                    r#"
                    INSERT INTO market_types (sport, market_key, name)
                    VALUES (?, ?, ?)
                    ON CONFLICT (sport, market_key) DO UPDATE SET name = excluded.name
                    "#,
                )
                .bind(sport.as_str())
                .bind(key.as_str())
                .bind(*name)
                .execute(&mut *tx)
                .await
                .context("Failed to seed market types")?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert a league or refresh its country and locator
    pub async fn upsert_league(
        &self,
        name: &str,
        sport: Sport,
        country: &str,
        locator: &str,
    ) -> Result<League, StoreError> {
        let now = timestamp(Utc::now());
        let now = now.as_str();

        let row: LeagueRow = with_retry("upsert league", || async move {
            sqlx::query_as(
                r#"
                INSERT INTO leagues (name, sport, country, locator, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (name, sport) DO UPDATE SET
                    country = excluded.country,
                    locator = excluded.locator,
                    updated_at = excluded.updated_at
                RETURNING id, name, sport, country, locator
                "#,
            )
            .bind(name)
            .bind(sport.as_str())
            .bind(country)
            .bind(locator)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
        })
        .await?;

        row.try_into()
    }

    /// Insert a team if `(name, league)` is new, otherwise return the existing row
    pub async fn upsert_team(&self, name: &str, league_id: i64, sport: Sport) -> Result<Team, StoreError> {
        let now = timestamp(Utc::now());
        let now = now.as_str();

        let row: TeamRow = with_retry("upsert team", || async move {
            sqlx::query_as(
                r#"
                INSERT INTO teams (name, league_id, sport, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (name, league_id) DO UPDATE SET name = excluded.name
                RETURNING id, name, league_id, sport
                "#,
            )
            .bind(name)
            .bind(league_id)
            .bind(sport.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await
        })
        .await?;

        row.try_into()
    }

    /// Insert a match or overwrite its status, time and (known) scores
    pub async fn upsert_match(
        &self,
        league_id: i64,
        sport: Sport,
        home_team_id: i64,
        away_team_id: i64,
        sighting: &MatchSighting,
    ) -> Result<Match, StoreError> {
        let now = timestamp(Utc::now());
        let now = now.as_str();
        let match_date = sighting.match_date.format("%Y-%m-%d").to_string();
        let match_date = match_date.as_str();
        let match_time = sighting.match_time.format("%H:%M:%S").to_string();
        let match_time = match_time.as_str();

        let row: MatchRow = with_retry("upsert match", || async move {
            sqlx::query_as(
                r#"
                INSERT INTO matches (
                    league_id, sport, home_team_id, away_team_id, match_date, match_time,
                    status, home_score, away_score, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (home_team_id, away_team_id, match_date) DO UPDATE SET
                    league_id = excluded.league_id,
                    sport = excluded.sport,
                    match_time = excluded.match_time,
                    status = excluded.status,
                    home_score = COALESCE(excluded.home_score, matches.home_score),
                    away_score = COALESCE(excluded.away_score, matches.away_score),
                    updated_at = excluded.updated_at
                RETURNING id, league_id, sport, home_team_id, away_team_id, match_date,
                    match_time, status, home_score, away_score, updated_at
                "#,
            )
            .bind(league_id)
            .bind(sport.as_str())
            .bind(home_team_id)
            .bind(away_team_id)
            .bind(match_date)
            .bind(match_time)
            .bind(sighting.status.as_str())
            .bind(sighting.home_score)
            .bind(sighting.away_score)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
        })
        .await?;

        row.try_into()
    }

    pub async fn get_match(&self, match_id: i64) -> Result<Option<Match>, StoreError> {
        let row: Option<MatchRow> = sqlx::query_as(
            r#"
            SELECT id, league_id, sport, home_team_id, away_team_id, match_date,
                match_time, status, home_score, away_score, updated_at
            FROM matches WHERE id = ?
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Match::try_from).transpose()
    }

    pub async fn match_exists(&self, match_id: i64) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM matches WHERE id = ?)")
            .bind(match_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 != 0)
    }

    /// Register a boost window for a match, returning its id
    pub async fn add_boost_window(
        &self,
        match_id: i64,
        multiplier: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO boost_windows (match_id, multiplier, start_time, end_time)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(match_id)
        .bind(multiplier)
        .bind(timestamp(start_time))
        .bind(timestamp(end_time))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Largest multiplier of the windows covering `at`
    pub async fn active_boost(&self, match_id: i64, at: DateTime<Utc>) -> Result<Option<f64>, StoreError> {
        let at = timestamp(at);
        let row: (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT MAX(multiplier) FROM boost_windows
            WHERE match_id = ? AND start_time <= ? AND end_time >= ?
            "#,
        )
        .bind(match_id)
        .bind(&at)
        .bind(&at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Row counts of the catalogue tables
    pub async fn counts(&self) -> Result<CatalogueCounts, StoreError> {
        Ok(CatalogueCounts {
            leagues: self.count("leagues").await?,
            teams: self.count("teams").await?,
            matches: self.count("matches").await?,
            bookmakers: self.count("bookmakers").await?,
            odds: self.count("odds").await?,
        })
    }

    async fn count(&self, table: &'static str) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Market keys registered for a sport
    pub async fn market_types(&self, sport: Sport) -> Result<Vec<(String, String)>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT market_key, name FROM market_types WHERE sport = ? AND is_active ORDER BY id",
        )
        .bind(sport.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Canonical text form for stored timestamps; sorts chronologically
pub(super) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(super) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(super) fn parse_sport(value: &str) -> Result<Sport, StoreError> {
    value.parse().map_err(|_| StoreError::Corrupt {
        column: "sport",
        value: value.to_string(),
    })
}

/// Database row representation
#[derive(sqlx::FromRow)]
struct LeagueRow {
    id: i64,
    name: String,
    sport: String,
    country: String,
    locator: String,
}

impl TryFrom<LeagueRow> for League {
    type Error = StoreError;

    fn try_from(row: LeagueRow) -> Result<Self, Self::Error> {
        Ok(League {
            id: row.id,
            sport: parse_sport(&row.sport)?,
            name: row.name,
            country: row.country,
            locator: row.locator,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: i64,
    name: String,
    league_id: i64,
    sport: String,
}

impl TryFrom<TeamRow> for Team {
    type Error = StoreError;

    fn try_from(row: TeamRow) -> Result<Self, Self::Error> {
        Ok(Team {
            id: row.id,
            sport: parse_sport(&row.sport)?,
            name: row.name,
            league_id: row.league_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: i64,
    league_id: i64,
    sport: String,
    home_team_id: i64,
    away_team_id: i64,
    match_date: String,
    match_time: String,
    status: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
    updated_at: String,
}

impl TryFrom<MatchRow> for Match {
    type Error = StoreError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        let match_date =
            NaiveDate::parse_from_str(&row.match_date, "%Y-%m-%d").map_err(|_| StoreError::Corrupt {
                column: "match_date",
                value: row.match_date.clone(),
            })?;
        let match_time =
            NaiveTime::parse_from_str(&row.match_time, "%H:%M:%S").map_err(|_| StoreError::Corrupt {
                column: "match_time",
                value: row.match_time.clone(),
            })?;

        Ok(Match {
            id: row.id,
            league_id: row.league_id,
            sport: parse_sport(&row.sport)?,
            home_team_id: row.home_team_id,
            away_team_id: row.away_team_id,
            match_date,
            match_time,
            status: MatchStatus::parse(&row.status),
            home_score: row.home_score,
            away_score: row.away_score,
            updated_at: parse_timestamp(&row.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> CatalogueStore {
        CatalogueStore::new("sqlite::memory:").await.unwrap()
    }

    fn sighting(status: MatchStatus) -> MatchSighting {
        MatchSighting {
            match_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            match_time: NaiveTime::from_hms_opt(20, 45, 0).unwrap(),
            status,
            home_score: None,
            away_score: None,
        }
    }

    #[tokio::test]
    async fn test_league_upsert_is_keyed_by_name_and_sport() {
        let store = store().await;

        let first = store
            .upsert_league("Premier League", Sport::Football, "England", "/soccer/england/premier-league")
            .await
            .unwrap();
        let second = store
            .upsert_league("Premier League", Sport::Football, "England", "/soccer/england/premier-league-2024")
            .await
            .unwrap();
        let other_sport = store
            .upsert_league("Premier League", Sport::Basketball, "England", "/basketball/england/premier-league")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.locator, "/soccer/england/premier-league-2024");
        assert_ne!(first.id, other_sport.id);
        assert_eq!(store.counts().await.unwrap().leagues, 2);
    }

    #[tokio::test]
    async fn test_match_upsert_overwrites_status_and_keeps_scores() {
        let store = store().await;
        let league = store
            .upsert_league("Serie A", Sport::Football, "Italy", "/soccer/italy/serie-a")
            .await
            .unwrap();
        let home = store.upsert_team("Milan", league.id, Sport::Football).await.unwrap();
        let away = store.upsert_team("Inter", league.id, Sport::Football).await.unwrap();

        let mut live = sighting(MatchStatus::Live);
        live.home_score = Some(1);
        live.away_score = Some(0);
        let first = store
            .upsert_match(league.id, Sport::Football, home.id, away.id, &live)
            .await
            .unwrap();
        let second = store
            .upsert_match(league.id, Sport::Football, home.id, away.id, &sighting(MatchStatus::Finished))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, MatchStatus::Finished);
        assert_eq!(second.home_score, Some(1));
        assert_eq!(store.counts().await.unwrap().matches, 1);
        assert_eq!(store.get_match(first.id).await.unwrap().unwrap().status, MatchStatus::Finished);
    }

    #[tokio::test]
    async fn test_market_types_seeded() {
        let store = store().await;
        let football = store.market_types(Sport::Football).await.unwrap();
        assert!(football.contains(&("over_under".to_string(), "Over/Under".to_string())));

        let basketball = store.market_types(Sport::Basketball).await.unwrap();
        assert!(basketball.contains(&("over_under".to_string(), "Over/Under Points".to_string())));
    }

    #[tokio::test]
    async fn test_active_boost_window() {
        let store = store().await;
        let league = store
            .upsert_league("Serie A", Sport::Football, "Italy", "/soccer/italy/serie-a")
            .await
            .unwrap();
        let home = store.upsert_team("Roma", league.id, Sport::Football).await.unwrap();
        let away = store.upsert_team("Lazio", league.id, Sport::Football).await.unwrap();
        let fixture = store
            .upsert_match(league.id, Sport::Football, home.id, away.id, &sighting(MatchStatus::Scheduled))
            .await
            .unwrap();

        let start = Utc::now() - chrono::Duration::hours(1);
        let end = Utc::now() + chrono::Duration::hours(1);
        store.add_boost_window(fixture.id, 1.10, start, end).await.unwrap();
        store.add_boost_window(fixture.id, 1.25, start, end).await.unwrap();

        assert_eq!(store.active_boost(fixture.id, Utc::now()).await.unwrap(), Some(1.25));
        assert_eq!(
            store
                .active_boost(fixture.id, end + chrono::Duration::minutes(1))
                .await
                .unwrap(),
            None
        );
    }
}
