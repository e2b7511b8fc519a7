//! # fareflow-scenario
//!
//! Typed scenario records for booking-flow runs. Scenarios live in CSV
//! fixtures, one booking attempt per row, and expand into the passenger
//! manifests the form layer types into the UI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fareflow_scenario::Scenario;
//!
//! # fn main() -> fareflow_scenario::Result<()> {
//! let scenarios = Scenario::load_csv("scenarios/smoke.csv")?;
//! for s in &scenarios {
//!     println!("{}: {} -> {} ({})", s.id, s.origin, s.destination, s.stage);
//! }
//! # Ok(())
//! # }
//! ```

mod passengers;
mod scenario;

pub use passengers::{Passenger, PaxCounts, PaxType};
pub use scenario::{BookingStage, CabinClass, Scenario, TravelDate, TripType};

/// Result type for scenario loading and expansion.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading or validating scenario fixtures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid scenario: {0}")]
    Scenario(String),

    #[error("invalid date: {0}")]
    Date(String),

    #[error("invalid passenger spec: {0}")]
    Passengers(String),
}
