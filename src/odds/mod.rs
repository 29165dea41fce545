//! Odds persistence with a TTL cache in front of live reads.

pub mod cache;
pub mod store;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use store::{cache_key, OddsError, OddsQuery, OddsStore};
