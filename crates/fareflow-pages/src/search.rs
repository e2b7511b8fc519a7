//! The flight-search form: trip type, route, dates, travellers, cabin.

use crate::{locate, Error, Locator, PageContext, Result};
use chrono::NaiveDate;
use eoka::Page;
use fareflow_scenario::{PaxType, Scenario, TripType};
use tracing::{debug, info};

/// How many stepper clicks to attempt before assuming the widget is wedged.
const MAX_STEPPER_CLICKS: u32 = 12;

/// Shorter than the element budget: deployments without an autocomplete
/// list should not stall every airport field.
const AUTOCOMPLETE_TIMEOUT_MS: u64 = 4_000;

pub struct SearchPage<'a> {
    page: &'a Page,
    ctx: &'a PageContext,
}

impl<'a> SearchPage<'a> {
    pub fn new(page: &'a Page, ctx: &'a PageContext) -> Self {
        Self { page, ctx }
    }

    fn trip_type_radio(trip: TripType) -> Locator {
        match trip {
            TripType::OneWay => Locator::new("one-way radio", "#trip-type-oneway")
                .or("input[name=\"tripType\"][value=\"ONE_WAY\"]"),
            TripType::RoundTrip => Locator::new("round-trip radio", "#trip-type-roundtrip")
                .or("input[name=\"tripType\"][value=\"ROUND_TRIP\"]"),
        }
    }

    fn airport_input(field: &str) -> Locator {
        Locator::new(
            format!("{field} airport"),
            format!("#search-{field}"),
        )
        .or(format!("input[name=\"{field}\"]"))
        .or(format!("[data-testid=\"search-{field}\"] input"))
    }

    fn date_input(field: &str) -> Locator {
        Locator::new(format!("{field} date"), format!("#search-{field}-date"))
            .or(format!("input[name=\"{field}Date\"]"))
    }

    fn pax_stepper(pax: PaxType) -> (Locator, Locator) {
        let kind = match pax {
            PaxType::Adult => "adults",
            PaxType::Child => "children",
            PaxType::Infant => "infants",
        };
        let count = Locator::new(format!("{kind} count"), format!("#pax-{kind}"))
            .or(format!("input[name=\"{kind}\"]"));
        let plus = Locator::new(format!("{kind} increment"), format!("#pax-{kind}-plus"))
            .or(format!("[data-testid=\"{kind}-increment\"]"));
        (count, plus)
    }

    fn cabin_select() -> Locator {
        Locator::new("cabin select", "#search-cabin").or("select[name=\"cabinClass\"]")
    }

    fn promo_input() -> Locator {
        Locator::new("promo code", "#search-promo").or("input[name=\"promoCode\"]")
    }

    fn search_button() -> Locator {
        Locator::new("search button", "#search-submit")
            .or("button[type=\"submit\"]")
            .or("[data-testid=\"search-submit\"]")
    }

    /// Navigate to the search form and wait for it to render.
    pub async fn open(&self, base_url: &str, navigation_timeout_ms: u64) -> Result<()> {
        let url = format!("{}/booking/search", base_url.trim_end_matches('/'));
        info!("opening search form at {url}");
        self.page.goto(&url).await?;
        let origin = Self::airport_input("origin");
        let candidates: Vec<&str> = origin.candidates().iter().map(String::as_str).collect();
        locate::wait_for_any(self.page, &candidates, navigation_timeout_ms)
            .await
            .map_err(|_| Error::Timeout("search form did not render".into()))?;
        Ok(())
    }

    /// Fill the whole form from a scenario with its dates already resolved.
    pub async fn fill_search(
        &self,
        scenario: &Scenario,
        depart: NaiveDate,
        ret: Option<NaiveDate>,
    ) -> Result<()> {
        self.set_trip_type(scenario.trip_type).await?;
        self.fill_airport("origin", &scenario.origin).await?;
        self.fill_airport("destination", &scenario.destination).await?;
        self.set_date("depart", depart).await?;
        if let Some(back) = ret {
            self.set_date("return", back).await?;
        }
        self.set_travellers(scenario).await?;
        locate::select_value(
            self.page,
            self.ctx,
            &Self::cabin_select(),
            scenario.cabin.form_value(),
        )
        .await?;
        if let Some(ref code) = scenario.promo_code {
            locate::fill(self.page, self.ctx, &Self::promo_input(), code).await?;
        }
        Ok(())
    }

    /// Submit the search. The results page owns the wait that follows.
    pub async fn submit(&self) -> Result<()> {
        locate::click(self.page, self.ctx, &Self::search_button()).await
    }

    async fn set_trip_type(&self, trip: TripType) -> Result<()> {
        debug!("trip type: {trip}");
        locate::click(self.page, self.ctx, &Self::trip_type_radio(trip)).await
    }

    /// Type into the airport field and pick the suggestion carrying the
    /// requested code from the autocomplete list.
    async fn fill_airport(&self, field: &str, code: &str) -> Result<()> {
        debug!("{field}: {code}");
        let input = Self::airport_input(field);
        locate::fill(self.page, self.ctx, &input, code).await?;

        let list = "[role=\"listbox\"] [role=\"option\"], .autocomplete-item";
        let timeout = AUTOCOMPLETE_TIMEOUT_MS.min(self.ctx.element_timeout_ms);
        if locate::wait_for_any(self.page, &[list], timeout).await.is_err() {
            // Some deployments skip the suggestion list for exact codes.
            return Ok(());
        }

        let js = format!(
            r#"(() => {{
                const code = {code};
                const options = document.querySelectorAll({list});
                for (const opt of options) {{
                    if ((opt.textContent || '').toUpperCase().includes(code)) {{
                        opt.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#,
            code = serde_json::to_string(code).unwrap(),
            list = serde_json::to_string(list).unwrap(),
        );
        let picked: bool = self.page.evaluate(&js).await?;
        if !picked {
            return Err(Error::PageState(format!(
                "autocomplete offered no entry for '{code}'"
            )));
        }
        Ok(())
    }

    async fn set_date(&self, field: &str, date: NaiveDate) -> Result<()> {
        let value = date.format("%Y-%m-%d").to_string();
        debug!("{field} date: {value}");
        locate::set_value(self.page, self.ctx, &Self::date_input(field), &value).await
    }

    /// Drive the three stepper widgets up from whatever they show to the
    /// scenario's counts. Steppers only go up from their floor here; the
    /// form resets to 1 ADT / 0 CHD / 0 INF on load.
    async fn set_travellers(&self, scenario: &Scenario) -> Result<()> {
        let targets = [
            (PaxType::Adult, scenario.pax.adults),
            (PaxType::Child, scenario.pax.children),
            (PaxType::Infant, scenario.pax.infants),
        ];
        for (pax, target) in targets {
            let (count, plus) = Self::pax_stepper(pax);
            self.step_up_to(&count, &plus, target).await?;
        }
        Ok(())
    }

    async fn step_up_to(&self, count: &Locator, plus: &Locator, target: u32) -> Result<()> {
        let mut clicks = 0;
        loop {
            let current: u32 = locate::read_value(self.page, self.ctx, count)
                .await?
                .trim()
                .parse()
                .unwrap_or(0);
            if current >= target {
                return Ok(());
            }
            if clicks >= MAX_STEPPER_CLICKS {
                return Err(Error::PageState(format!(
                    "{} stuck at {current} after {clicks} clicks (wanted {target})",
                    count.name()
                )));
            }
            locate::click(self.page, self.ctx, plus).await?;
            clicks += 1;
            self.page.wait(100).await;
        }
    }
}
