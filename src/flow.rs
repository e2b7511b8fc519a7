//! The booking flow state machine.
//!
//! Stages run in flow order and stop at the scenario's target stage. The
//! struct keeps `reached` and `pnr` outside the `Result` so the runner can
//! report how far a failing scenario got.

use crate::config::SuiteConfig;
use crate::{Error, Result};
use eoka::Page;
use fareflow_pages::{
    BookingSummaryPage, PageContext, PassengerPage, ResultsPage, ResultsState, SearchPage,
};
use fareflow_pages::results::Leg;
use fareflow_scenario::{BookingStage, Scenario, TripType};
use tracing::info;

/// One pass through the flow for a single scenario.
pub struct Flow<'a> {
    page: &'a Page,
    ctx: &'a PageContext,
    config: &'a SuiteConfig,
    scenario: &'a Scenario,
    /// Last stage that completed.
    pub reached: Option<BookingStage>,
    /// Record locator, when the flow ran all the way to payment.
    pub pnr: Option<String>,
}

impl<'a> Flow<'a> {
    pub fn new(
        page: &'a Page,
        ctx: &'a PageContext,
        config: &'a SuiteConfig,
        scenario: &'a Scenario,
    ) -> Self {
        Self {
            page,
            ctx,
            config,
            scenario,
            reached: None,
            pnr: None,
        }
    }

    fn done_after(&mut self, stage: BookingStage) -> bool {
        self.reached = Some(stage);
        info!("scenario {}: completed {stage}", self.scenario.id);
        self.scenario.stage <= stage
    }

    /// Drive the flow up to the scenario's target stage.
    pub async fn run(&mut self) -> Result<()> {
        let today = chrono::Local::now().date_naive();
        let (depart, ret) = self.scenario.resolved_dates(today)?;
        let manifest = self.scenario.passenger_manifest(today)?;

        let search = SearchPage::new(self.page, self.ctx);
        search.open(&self.config.base_url, self.config.timeouts.navigation_ms).await?;
        search.fill_search(self.scenario, depart, ret).await?;
        search.submit().await?;
        if self.done_after(BookingStage::Search) {
            return Ok(());
        }

        let results = ResultsPage::new(self.page, self.ctx);
        match results.wait_until_loaded(self.config.timeouts.results_ms).await? {
            ResultsState::Loaded(_) => {}
            ResultsState::Empty => {
                return Err(Error::Flow(format!(
                    "no availability {} -> {} on {depart}",
                    self.scenario.origin, self.scenario.destination
                )));
            }
        }
        results.select_flight(Leg::Outbound, self.config.selection).await?;
        if self.scenario.trip_type == TripType::RoundTrip {
            results.select_flight(Leg::Return, self.config.selection).await?;
        }
        results.continue_to_passengers().await?;
        if self.done_after(BookingStage::Results) {
            return Ok(());
        }

        let passengers = PassengerPage::new(self.page, self.ctx);
        passengers.wait_until_loaded(self.config.timeouts.element_ms).await?;
        passengers.fill_passengers(&manifest).await?;
        passengers
            .fill_contact(&self.config.contact.email, &self.config.contact.phone)
            .await?;
        passengers.continue_to_summary().await?;
        if self.done_after(BookingStage::PassengerInfo) {
            return Ok(());
        }

        let summary = BookingSummaryPage::new(self.page, self.ctx);
        summary.wait_until_loaded(self.config.timeouts.element_ms).await?;
        summary.verify(self.scenario, manifest.len()).await?;
        if self.done_after(BookingStage::BookingSummary) {
            return Ok(());
        }

        let pnr = summary
            .complete_booking(&self.config.payment, self.config.timeouts.confirmation_ms)
            .await?;
        info!("scenario {}: booked, PNR {pnr}", self.scenario.id);
        self.pnr = Some(pnr);
        self.done_after(BookingStage::Booking);
        Ok(())
    }
}
