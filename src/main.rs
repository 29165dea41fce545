use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use odds_ingest::api::HttpBrowser;
use odds_ingest::config::Config;
use odds_ingest::db::CatalogueStore;
use odds_ingest::matching::{IdentityResolver, TeamAliases};
use odds_ingest::odds::OddsStore;
use odds_ingest::workers::{CrawlSettings, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "odds_ingest=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting odds-ingest");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded ({} sports)", config.targets.len());

    // Initialize database
    let catalogue = Arc::new(CatalogueStore::new(&config.database_url).await?);
    info!("Database initialized");

    let resolver = Arc::new(load_identity_resolver(&config, Arc::clone(&catalogue))?);
    let odds = Arc::new(OddsStore::new(Arc::clone(&catalogue), config.live_odds_ttl()));

    // The only fatal crawl failure: no engine, no run
    let engine = HttpBrowser::launch(config.user_agent.as_deref(), config.page_timeout())
        .context("Failed to start page engine")?;

    let orchestrator = Orchestrator::new(
        Arc::new(engine),
        resolver,
        odds,
        CrawlSettings::from_config(&config),
    );
    let report = orchestrator.run().await.context("Crawl aborted")?;
    let counts = catalogue.counts().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&counts)?);

    info!("Shutting down odds-ingest");
    Ok(())
}

/// Load team aliases from the configured JSON file, if any
fn load_identity_resolver(config: &Config, catalogue: Arc<CatalogueStore>) -> Result<IdentityResolver> {
    match &config.team_aliases_path {
        Some(path) => {
            let aliases = TeamAliases::load_from_file(Path::new(path))?;
            Ok(IdentityResolver::with_aliases(catalogue, aliases))
        }
        None => {
            info!("No team aliases file configured, using names as listed");
            Ok(IdentityResolver::new(catalogue))
        }
    }
}
