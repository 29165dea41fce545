pub mod catalogue;
pub mod odds;
pub mod retry;

pub use catalogue::CatalogueStore;
pub use odds::{parameter_key, NewOdds};
pub use retry::{with_retry, StoreError, MAX_UPSERT_ATTEMPTS};
