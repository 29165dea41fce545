use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::api::{FetchError, PageDriver};
use crate::extract::NEXT_PAGE_SELECTOR;

/// Run one page operation under the page-load budget
async fn within<T>(
    budget: Duration,
    what: &str,
    operation: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match timeout(budget, operation).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            what: what.to_string(),
            after: budget,
        }),
    }
}

/// Walks one paginated listing on a single page, in pagination order
pub struct ListingFetcher {
    page: Box<dyn PageDriver>,
    page_timeout: Duration,
    max_pages: u32,
    pages_loaded: u32,
}

impl ListingFetcher {
    pub fn new(page: Box<dyn PageDriver>, page_timeout: Duration, max_pages: u32) -> Self {
        Self {
            page,
            page_timeout,
            max_pages,
            pages_loaded: 0,
        }
    }

    pub fn pages_loaded(&self) -> u32 {
        self.pages_loaded
    }

    /// Navigate to `url` and return its markup once `ready_selector` shows up
    pub async fn open(&mut self, url: &str, ready_selector: &str) -> Result<String, FetchError> {
        debug!("Opening {}", url);
        within(self.page_timeout, url, self.page.goto(url)).await?;
        self.settle(ready_selector).await
    }

    /// Follow the "next page" control. `None` when there is none, or when the
    /// page budget for this listing is spent.
    pub async fn next_page(&mut self, ready_selector: &str) -> Result<Option<String>, FetchError> {
        if self.pages_loaded >= self.max_pages {
            warn!("Stopping pagination after {} pages", self.pages_loaded);
            return Ok(None);
        }

        let clicked = within(self.page_timeout, "next page", self.page.click(NEXT_PAGE_SELECTOR)).await?;
        if !clicked {
            return Ok(None);
        }

        self.settle(ready_selector).await.map(Some)
    }

    async fn settle(&mut self, ready_selector: &str) -> Result<String, FetchError> {
        within(self.page_timeout, ready_selector, self.page.wait_for_selector(ready_selector)).await?;
        within(self.page_timeout, "network idle", self.page.wait_for_network_idle()).await?;
        let html = within(self.page_timeout, "page content", self.page.content()).await?;

        self.pages_loaded += 1;
        Ok(html)
    }
}
