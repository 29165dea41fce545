use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::extract::{has_selector, link_href};

/// Transport-level failures. Each one ends the crawl of the league it occurred in.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("expected markup {0:?} not found")]
    MissingMarkup(String),

    #[error("page engine could not be started: {0}")]
    EngineStart(String),
}

/// Something that can open pages. Starting it is the only fatal step of a run.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, FetchError>;
}

/// One open page, driven step by step
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, url: &str) -> Result<(), FetchError>;

    /// Resolve once `selector` matches, or fail with [`FetchError::MissingMarkup`]
    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), FetchError>;

    async fn content(&mut self) -> Result<String, FetchError>;

    /// Follow the control matching `selector`. `Ok(false)` when there is none.
    async fn click(&mut self, selector: &str) -> Result<bool, FetchError>;

    async fn wait_for_network_idle(&mut self) -> Result<(), FetchError>;
}

/// Plain HTTP engine: pages are fetched whole, clicks follow link targets
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn launch(user_agent: Option<&str>, request_timeout: Duration) -> Result<Self, FetchError> {
        let mut builder = Client::builder().timeout(request_timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::EngineStart(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserEngine for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, FetchError> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            current: None,
            html: String::new(),
        }))
    }
}

pub struct HttpPage {
    client: Client,
    current: Option<Url>,
    html: String,
}

#[async_trait]
impl PageDriver for HttpPage {
    async fn goto(&mut self, url: &str) -> Result<(), FetchError> {
        let target = Url::parse(url).map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!("Fetching {}", target);

        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        self.html = response.text().await.map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        self.current = Some(target);
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), FetchError> {
        if has_selector(&self.html, selector) {
            Ok(())
        } else {
            Err(FetchError::MissingMarkup(selector.to_string()))
        }
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        Ok(self.html.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<bool, FetchError> {
        let Some(href) = link_href(&self.html, selector) else {
            return Ok(false);
        };

        let target = match &self.current {
            Some(base) => base.join(&href),
            None => Url::parse(&href),
        }
        .map_err(|e| FetchError::Navigation {
            url: href.clone(),
            reason: e.to_string(),
        })?;

        self.goto(target.as_str()).await?;
        Ok(true)
    }

    async fn wait_for_network_idle(&mut self) -> Result<(), FetchError> {
        // Whole responses are already in hand
        Ok(())
    }
}
