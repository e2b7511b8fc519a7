//! # fareflow-pages
//!
//! Page objects for the booking UI. Each screen of the flow gets one object
//! wrapping its locators behind screen-level actions; underneath them sit
//! locator utilities with fallback candidates, retry, and heuristic selector
//! recovery for when the frontend moves an element out from under a run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fareflow_pages::{PageContext, SearchPage};
//!
//! # async fn run(page: &eoka::Page, scenario: &fareflow_scenario::Scenario) -> fareflow_pages::Result<()> {
//! let ctx = PageContext::default();
//! let search = SearchPage::new(page, &ctx);
//! search.open("https://booking.staging.example-air.com", 30_000).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod locate;
pub mod passenger_form;
pub mod recover;
pub mod results;
pub mod search;
pub mod summary;

pub use auth::{Credentials, LoginPage, SessionCookies};
pub use locate::{Locator, RetryPolicy};
pub use passenger_form::PassengerPage;
pub use recover::{CandidateElement, HeuristicOracle, SelectorOracle};
pub use results::{FlightChoice, Leg, ResultsPage, ResultsState};
pub use search::SearchPage;
pub use summary::{BookingSummaryPage, PaymentDetails, SummaryDetails};

/// Result type for page interactions.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while driving the UI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("locator failed: {0}")]
    Locator(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected page state: {0}")]
    PageState(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared knobs every page object reads: element wait budget, retry policy,
/// and whether selector recovery may kick in after the retries run dry.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub element_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub recovery: bool,
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            element_timeout_ms: 10_000,
            retry: RetryPolicy::default(),
            recovery: true,
        }
    }
}
