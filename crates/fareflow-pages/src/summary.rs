//! Booking summary and payment: verify the itinerary, pay, capture the PNR.

use crate::results::parse_price;
use crate::{locate, Error, Locator, PageContext, Result};
use eoka::Page;
use fareflow_scenario::Scenario;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

/// What the summary panel showed when it was verified.
#[derive(Debug, Clone)]
pub struct SummaryDetails {
    pub route_text: String,
    pub traveller_count: usize,
    pub total_cents: Option<u32>,
}

/// Card data typed into the payment form. Defaults are the acquirer's
/// sandbox test card.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
    #[serde(default = "PaymentDetails::default_card_number")]
    pub card_number: String,
    #[serde(default = "PaymentDetails::default_holder")]
    pub holder: String,
    #[serde(default = "PaymentDetails::default_expiry")]
    pub expiry: String,
    #[serde(default = "PaymentDetails::default_cvv")]
    pub cvv: String,
}

impl PaymentDetails {
    fn default_card_number() -> String {
        "4111111111111111".into()
    }
    fn default_holder() -> String {
        "QA TESTCARD".into()
    }
    fn default_expiry() -> String {
        "12/30".into()
    }
    fn default_cvv() -> String {
        "737".into()
    }
}

impl Default for PaymentDetails {
    fn default() -> Self {
        Self {
            card_number: Self::default_card_number(),
            holder: Self::default_holder(),
            expiry: Self::default_expiry(),
            cvv: Self::default_cvv(),
        }
    }
}

const SUMMARY_PANEL: &str = "#booking-summary, [data-testid=\"booking-summary\"]";
const TRAVELLER_ROW: &str = ".traveller-row, [data-testid=\"traveller-row\"]";
const CONFIRMATION_PANEL: &str = "#booking-confirmation, [data-testid=\"booking-confirmation\"]";
const PAYMENT_ERROR: &str = ".payment-error, [data-testid=\"payment-error\"]";

pub struct BookingSummaryPage<'a> {
    page: &'a Page,
    ctx: &'a PageContext,
}

impl<'a> BookingSummaryPage<'a> {
    pub fn new(page: &'a Page, ctx: &'a PageContext) -> Self {
        Self { page, ctx }
    }

    fn route_line() -> Locator {
        Locator::new("summary route", "#summary-route").or("[data-testid=\"summary-route\"]")
    }

    fn total_price() -> Locator {
        Locator::new("summary total", "#summary-total").or("[data-testid=\"summary-total\"]")
    }

    fn card_number() -> Locator {
        Locator::new("card number", "#card-number").or("input[name=\"cardNumber\"]")
    }

    fn card_holder() -> Locator {
        Locator::new("card holder", "#card-holder").or("input[name=\"cardHolder\"]")
    }

    fn card_expiry() -> Locator {
        Locator::new("card expiry", "#card-expiry").or("input[name=\"cardExpiry\"]")
    }

    fn card_cvv() -> Locator {
        Locator::new("card cvv", "#card-cvv").or("input[name=\"cardCvv\"]")
    }

    fn terms_checkbox() -> Locator {
        Locator::new("terms checkbox", "#accept-terms").or("input[name=\"acceptTerms\"]")
    }

    fn pay_button() -> Locator {
        Locator::new("pay button", "#pay-now").or("[data-testid=\"pay-now\"]")
    }

    pub async fn wait_until_loaded(&self, timeout_ms: u64) -> Result<()> {
        locate::wait_for_any(self.page, &[SUMMARY_PANEL], timeout_ms)
            .await
            .map(|_| ())
            .map_err(|_| Error::Timeout("booking summary did not render".into()))
    }

    /// Read what the summary panel shows.
    pub async fn details(&self) -> Result<SummaryDetails> {
        let route_text = locate::read_text(self.page, self.ctx, &Self::route_line()).await?;
        let js = format!(
            "document.querySelectorAll({}).length",
            serde_json::to_string(TRAVELLER_ROW).unwrap()
        );
        let traveller_count: usize = self.page.evaluate(&js).await?;
        let total_text = locate::read_text(self.page, self.ctx, &Self::total_price()).await?;
        Ok(SummaryDetails {
            route_text,
            traveller_count,
            total_cents: parse_price(&total_text),
        })
    }

    /// Check the summary against what the scenario asked for.
    pub async fn verify(&self, scenario: &Scenario, manifest_len: usize) -> Result<SummaryDetails> {
        let details = self.details().await?;
        let route = details.route_text.to_uppercase();
        if !route.contains(&scenario.origin) || !route.contains(&scenario.destination) {
            return Err(Error::PageState(format!(
                "summary route '{}' does not mention {} and {}",
                details.route_text, scenario.origin, scenario.destination
            )));
        }
        if details.traveller_count != manifest_len {
            return Err(Error::PageState(format!(
                "summary lists {} travellers, manifest has {manifest_len}",
                details.traveller_count
            )));
        }
        if details.total_cents.is_none() {
            return Err(Error::PageState("summary total is not a readable price".into()));
        }
        info!(
            "summary verified: {} travellers, total {:?} cents",
            details.traveller_count, details.total_cents
        );
        Ok(details)
    }

    /// Fill payment, accept terms, confirm, and wait for the PNR.
    pub async fn complete_booking(
        &self,
        payment: &PaymentDetails,
        confirmation_timeout_ms: u64,
    ) -> Result<String> {
        locate::fill(self.page, self.ctx, &Self::card_number(), &payment.card_number).await?;
        locate::fill(self.page, self.ctx, &Self::card_holder(), &payment.holder).await?;
        locate::fill(self.page, self.ctx, &Self::card_expiry(), &payment.expiry).await?;
        locate::fill(self.page, self.ctx, &Self::card_cvv(), &payment.cvv).await?;
        self.accept_terms().await?;
        locate::click(self.page, self.ctx, &Self::pay_button()).await?;

        debug!("payment submitted, awaiting confirmation");
        let landed = locate::wait_for_any(
            self.page,
            &[CONFIRMATION_PANEL, PAYMENT_ERROR],
            confirmation_timeout_ms,
        )
        .await
        .map_err(|_| Error::Timeout("no confirmation after payment".into()))?;

        if landed == 1 {
            let reason: String = self
                .page
                .evaluate(&format!(
                    "(document.querySelector({})?.textContent || '').trim()",
                    serde_json::to_string(PAYMENT_ERROR).unwrap()
                ))
                .await?;
            return Err(Error::PageState(format!("payment declined: {reason}")));
        }

        let confirmation: String = self
            .page
            .evaluate(&format!(
                "(document.querySelector({})?.textContent || '').trim()",
                serde_json::to_string(CONFIRMATION_PANEL).unwrap()
            ))
            .await?;
        extract_pnr(&confirmation).ok_or_else(|| {
            Error::PageState(format!(
                "confirmation shown but no record locator in: {confirmation}"
            ))
        })
    }

    /// Tick the checkbox only if it is not already ticked; clicking a ticked
    /// box would untick it.
    async fn accept_terms(&self) -> Result<()> {
        let locator = Self::terms_checkbox();
        let sel = locate::resolve(self.page, &locator).await?;
        let js = format!(
            "!!document.querySelector({})?.checked",
            serde_json::to_string(&sel).unwrap()
        );
        let checked: bool = self.page.evaluate(&js).await?;
        if !checked {
            locate::click(self.page, self.ctx, &locator).await?;
        }
        Ok(())
    }
}

/// Pull the six-character record locator out of confirmation text. PNRs are
/// uppercase alphanumerics starting with a letter.
pub fn extract_pnr(text: &str) -> Option<String> {
    let re = Regex::new(r"\b[A-Z][A-Z0-9]{5}\b").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}
