//! Per-sport market taxonomy: raw listing labels to canonical market keys.

pub mod markets;
pub mod rules;

pub use markets::{catalogue, MarketKey, UnknownMarketKey};
pub use rules::{normalize_market_id, resolve, rule_for, MarketRule, ParamExtractor, ResolvedMarket};
