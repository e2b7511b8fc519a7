//! # fareflow
//!
//! Data-driven booking-flow automation for the airline web UI. Scenarios
//! come from CSV fixtures, the flow is driven through a real browser via
//! page objects, and every scenario reports how far it got.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fareflow::{Runner, SuiteConfig};
//! use fareflow_scenario::Scenario;
//!
//! # #[tokio::main]
//! # async fn main() -> fareflow::Result<()> {
//! let config = SuiteConfig::load("configs/suite.example.yaml")?;
//! let scenarios = Scenario::load_csv("scenarios/smoke.csv")?;
//!
//! let runner = Runner::new(config).await?;
//! runner.authenticate().await?;
//! let report = runner.run_suite(&scenarios).await;
//! println!("{report}");
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod flow;
pub mod params;
pub mod report;
pub mod runner;

pub use config::{AuthMode, SuiteConfig};
pub use flow::Flow;
pub use params::{ParamDef, Params};
pub use report::{ScenarioResult, SuiteReport};
pub use runner::Runner;

/// Result type for suite orchestration.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running a suite.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario error: {0}")]
    Scenario(#[from] fareflow_scenario::Error),

    #[error("page error: {0}")]
    Page(#[from] fareflow_pages::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("flow failed: {0}")]
    Flow(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use fareflow_scenario::{BookingStage, Scenario};

    #[test]
    fn example_suite_config_loads() {
        let config = SuiteConfig::load("configs/suite.example.yaml").unwrap();
        assert_eq!(config.name, "Booking smoke suite");
        assert!(config.base_url.starts_with("https://"));
        assert!(config.browser.headless);
    }

    #[test]
    fn smoke_fixture_loads_and_covers_every_stage() {
        let scenarios = Scenario::load_csv("scenarios/smoke.csv").unwrap();
        assert!(scenarios.len() >= 5);
        for stage in [
            BookingStage::Search,
            BookingStage::Results,
            BookingStage::PassengerInfo,
            BookingStage::BookingSummary,
            BookingStage::Booking,
        ] {
            assert!(
                scenarios.iter().any(|s| s.stage == stage),
                "smoke fixture misses stage {stage}"
            );
        }
    }
}
