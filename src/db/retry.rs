use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Attempts per upsert before giving up on a contended key
pub const MAX_UPSERT_ATTEMPTS: u32 = 5;

const BACKOFF_STEP: Duration = Duration::from_millis(25);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{operation} still contended after {attempts} attempts")]
    Conflict {
        operation: &'static str,
        attempts: u32,
    },

    #[error("corrupt {column} value {value:?}")]
    Corrupt { column: &'static str, value: String },
}

/// Lock contention and uniqueness races are worth another attempt
fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation()
                || matches!(
                    db.code().as_deref(),
                    Some("5") | Some("6") | Some("261") | Some("262") | Some("517")
                )
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// Run `attempt` until it succeeds, fails with a non-contention error,
/// or [`MAX_UPSERT_ATTEMPTS`] is used up.
pub async fn with_retry<T, F, Fut>(operation: &'static str, mut attempt: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    for n in 1..=MAX_UPSERT_ATTEMPTS {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if is_contention(&e) => {
                warn!("{} contended (attempt {}/{}): {}", operation, n, MAX_UPSERT_ATTEMPTS, e);
                sleep(BACKOFF_STEP * n).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StoreError::Conflict {
        operation,
        attempts: MAX_UPSERT_ATTEMPTS,
    })
}
