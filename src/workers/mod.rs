pub mod fetcher;
pub mod orchestrator;

pub use fetcher::ListingFetcher;
pub use orchestrator::{CrawlError, CrawlSettings, Orchestrator, RunReport};
