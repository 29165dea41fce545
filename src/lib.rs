//! Odds ingestion: crawl fixture listings, normalise their markets and keep
//! an idempotent catalogue of leagues, teams, matches, bookmakers and odds.

pub mod api;
pub mod config;
pub mod db;
pub mod extract;
pub mod matching;
pub mod models;
pub mod odds;
pub mod taxonomy;
pub mod workers;
