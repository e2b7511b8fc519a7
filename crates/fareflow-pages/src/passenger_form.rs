//! The passenger-details form: one field group per traveller plus contact.

use crate::{locate, Error, Locator, PageContext, Result};
use eoka::Page;
use fareflow_scenario::Passenger;
use tracing::{debug, info};

pub struct PassengerPage<'a> {
    page: &'a Page,
    ctx: &'a PageContext,
}

impl<'a> PassengerPage<'a> {
    pub fn new(page: &'a Page, ctx: &'a PageContext) -> Self {
        Self { page, ctx }
    }

    fn title_select(index: usize) -> Locator {
        Locator::new(
            format!("passenger {index} title"),
            format!("#pax-{index}-title"),
        )
        .or(format!("select[name=\"passengers[{index}].title\"]"))
    }

    fn first_name(index: usize) -> Locator {
        Locator::new(
            format!("passenger {index} first name"),
            format!("#pax-{index}-first-name"),
        )
        .or(format!("input[name=\"passengers[{index}].firstName\"]"))
    }

    fn last_name(index: usize) -> Locator {
        Locator::new(
            format!("passenger {index} last name"),
            format!("#pax-{index}-last-name"),
        )
        .or(format!("input[name=\"passengers[{index}].lastName\"]"))
    }

    fn date_of_birth(index: usize) -> Locator {
        Locator::new(
            format!("passenger {index} date of birth"),
            format!("#pax-{index}-dob"),
        )
        .or(format!("input[name=\"passengers[{index}].dateOfBirth\"]"))
    }

    fn loyalty_input(index: usize) -> Locator {
        Locator::new(
            format!("passenger {index} loyalty number"),
            format!("#pax-{index}-loyalty"),
        )
        .or(format!("input[name=\"passengers[{index}].loyaltyNumber\"]"))
    }

    fn contact_email() -> Locator {
        Locator::new("contact email", "#contact-email").or("input[name=\"contactEmail\"]")
    }

    fn contact_phone() -> Locator {
        Locator::new("contact phone", "#contact-phone").or("input[name=\"contactPhone\"]")
    }

    fn continue_button() -> Locator {
        Locator::new("passenger continue", "#passengers-continue")
            .or("[data-testid=\"passengers-continue\"]")
            .or("button[type=\"submit\"]")
    }

    /// Wait for the first traveller's field group to render.
    pub async fn wait_until_loaded(&self, timeout_ms: u64) -> Result<()> {
        let first = Self::first_name(0);
        let candidates: Vec<&str> = first.candidates().iter().map(String::as_str).collect();
        locate::wait_for_any(self.page, &candidates, timeout_ms)
            .await
            .map(|_| ())
            .map_err(|_| Error::Timeout("passenger form did not render".into()))
    }

    /// Fill every traveller's field group from the manifest.
    pub async fn fill_passengers(&self, manifest: &[Passenger]) -> Result<()> {
        info!("filling details for {} travellers", manifest.len());
        for (index, passenger) in manifest.iter().enumerate() {
            debug!("passenger {index}: {passenger}");
            locate::select_value(self.page, self.ctx, &Self::title_select(index), &passenger.title)
                .await?;
            locate::fill(self.page, self.ctx, &Self::first_name(index), &passenger.first_name)
                .await?;
            locate::fill(self.page, self.ctx, &Self::last_name(index), &passenger.last_name)
                .await?;
            locate::set_value(
                self.page,
                self.ctx,
                &Self::date_of_birth(index),
                &passenger.date_of_birth.format("%Y-%m-%d").to_string(),
            )
            .await?;
            if let Some(ref number) = passenger.loyalty_number {
                self.fill_loyalty(index, number).await?;
            }
        }
        Ok(())
    }

    /// The loyalty field only renders for programmes the fare participates
    /// in, so its absence is not a failure.
    async fn fill_loyalty(&self, index: usize, number: &str) -> Result<()> {
        let locator = Self::loyalty_input(index);
        for candidate in locator.candidates() {
            if locate::is_visible(self.page, candidate).await? {
                return locate::fill(self.page, self.ctx, &locator, number).await;
            }
        }
        debug!("no loyalty field for passenger {index}; skipping");
        Ok(())
    }

    pub async fn fill_contact(&self, email: &str, phone: &str) -> Result<()> {
        locate::fill(self.page, self.ctx, &Self::contact_email(), email).await?;
        locate::fill(self.page, self.ctx, &Self::contact_phone(), phone).await
    }

    pub async fn continue_to_summary(&self) -> Result<()> {
        locate::click(self.page, self.ctx, &Self::continue_button()).await
    }
}
