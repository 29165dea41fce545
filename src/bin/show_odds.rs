use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use odds_ingest::config::Config;
use odds_ingest::db::CatalogueStore;
use odds_ingest::odds::{OddsQuery, OddsStore};
use odds_ingest::taxonomy::MarketKey;

const USAGE: &str = "usage: show_odds <match_id> <market_key> [--bookmaker ID] [--live]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "show_odds=info,odds_ingest=warn,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let query = parse_args(&args)?;

    let config = Config::from_env()?;
    let catalogue = Arc::new(CatalogueStore::new(&config.database_url).await?);
    let store = OddsStore::new(catalogue, config.live_odds_ttl());

    match store.get(&query).await? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("no odds"),
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<OddsQuery> {
    let (Some(match_id), Some(market_key)) = (args.first(), args.get(1)) else {
        bail!(USAGE);
    };

    let match_id: i64 = match_id.parse().context("match_id must be a number")?;
    let market_key: MarketKey = market_key.parse()?;
    let mut query = OddsQuery::new(match_id, market_key);

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--live" => query = query.live(),
            "--bookmaker" => {
                let id = rest.next().context("--bookmaker needs an id")?;
                query = query.bookmaker(id.parse().context("bookmaker id must be a number")?);
            }
            other => bail!("unexpected argument {:?}\n{}", other, USAGE),
        }
    }

    Ok(query)
}
