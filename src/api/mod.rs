//! Page fetching. The only place that talks to the network.

pub mod browser;

pub use browser::{BrowserEngine, FetchError, HttpBrowser, HttpPage, PageDriver};
