//! The flight-results list: availability, fare selection, leg handling.

use crate::{locate, Error, PageContext, Result};
use eoka::Page;
use serde::Deserialize;
use tracing::{debug, info};

/// What the results page settled into after a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsState {
    /// Flight cards rendered; payload is the card count.
    Loaded(usize),
    /// The no-availability marker rendered instead.
    Empty,
}

/// Which flight to take from a leg's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightChoice {
    First,
    Cheapest,
    /// Zero-based position in the list.
    Index(usize),
}

impl Default for FlightChoice {
    fn default() -> Self {
        Self::First
    }
}

/// Outbound or return leg of a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Outbound,
    Return,
}

impl Leg {
    fn section(&self) -> &'static str {
        match self {
            Self::Outbound => "#outbound-list, [data-testid=\"outbound-flights\"]",
            Self::Return => "#return-list, [data-testid=\"return-flights\"]",
        }
    }
}

const FLIGHT_CARD: &str = ".flight-card, [data-testid=\"flight-card\"]";
const NO_RESULTS: &str = ".no-results, [data-testid=\"no-flights\"]";
const SELECT_BUTTON: &str = ".select-fare, [data-testid=\"select-flight\"], button";
const PRICE: &str = ".fare-price, [data-testid=\"fare-price\"]";
const CONTINUE_BUTTON: &str = "#results-continue, [data-testid=\"results-continue\"]";

pub struct ResultsPage<'a> {
    page: &'a Page,
    ctx: &'a PageContext,
}

impl<'a> ResultsPage<'a> {
    pub fn new(page: &'a Page, ctx: &'a PageContext) -> Self {
        Self { page, ctx }
    }

    /// Wait for the search to settle into either flight cards or the
    /// no-availability marker.
    pub async fn wait_until_loaded(&self, timeout_ms: u64) -> Result<ResultsState> {
        let which = locate::wait_for_any(self.page, &[FLIGHT_CARD, NO_RESULTS], timeout_ms)
            .await
            .map_err(|_| Error::Timeout("results never settled".into()))?;
        if which == 1 {
            info!("no availability for this search");
            return Ok(ResultsState::Empty);
        }
        let count = self.flight_count(Leg::Outbound).await?;
        info!("{count} flights available");
        Ok(ResultsState::Loaded(count))
    }

    /// Cards in the given leg's section. One-way deployments render the
    /// outbound list without a section wrapper, so fall back to a bare count.
    pub async fn flight_count(&self, leg: Leg) -> Result<usize> {
        let js = format!(
            r#"(() => {{
                const section = document.querySelector({section});
                const root = section || document;
                return root.querySelectorAll({card}).length;
            }})()"#,
            section = serde_json::to_string(leg.section()).unwrap(),
            card = serde_json::to_string(FLIGHT_CARD).unwrap(),
        );
        let count: usize = self.page.evaluate(&js).await?;
        Ok(count)
    }

    /// Select a flight in the leg per the choice, clicking its fare button.
    pub async fn select_flight(&self, leg: Leg, choice: FlightChoice) -> Result<()> {
        let count = self.flight_count(leg).await?;
        if count == 0 {
            return Err(Error::PageState(format!("no cards in {leg:?} leg")));
        }
        let index = match choice {
            FlightChoice::First => 0,
            FlightChoice::Index(i) if i < count => i,
            FlightChoice::Index(i) => {
                return Err(Error::PageState(format!(
                    "flight #{i} requested but only {count} listed"
                )));
            }
            FlightChoice::Cheapest => self.cheapest_index(leg).await?,
        };
        debug!("selecting {leg:?} flight #{index} ({choice:?})");

        let js = format!(
            r#"(() => {{
                const section = document.querySelector({section});
                const root = section || document;
                const card = root.querySelectorAll({card})[{index}];
                if (!card) return false;
                const btn = card.querySelector({btn});
                (btn || card).click();
                return true;
            }})()"#,
            section = serde_json::to_string(leg.section()).unwrap(),
            card = serde_json::to_string(FLIGHT_CARD).unwrap(),
            btn = serde_json::to_string(SELECT_BUTTON).unwrap(),
            index = index,
        );
        let clicked: bool = self.page.evaluate(&js).await?;
        if !clicked {
            return Err(Error::PageState(format!("card #{index} vanished mid-selection")));
        }
        self.page.wait(300).await;
        Ok(())
    }

    /// Continue to passenger entry. Some deployments auto-advance after the
    /// last leg is picked, so a missing button is not an error.
    pub async fn continue_to_passengers(&self) -> Result<()> {
        for candidate in CONTINUE_BUTTON.split(", ") {
            if self.page.try_click(candidate).await? {
                return Ok(());
            }
        }
        debug!("no continue button; assuming auto-advance");
        Ok(())
    }

    async fn cheapest_index(&self, leg: Leg) -> Result<usize> {
        let js = format!(
            r#"(() => {{
                const section = document.querySelector({section});
                const root = section || document;
                const cards = root.querySelectorAll({card});
                const prices = [];
                for (const card of cards) {{
                    const el = card.querySelector({price});
                    prices.push(el ? el.textContent.trim() : '');
                }}
                return JSON.stringify(prices);
            }})()"#,
            section = serde_json::to_string(leg.section()).unwrap(),
            card = serde_json::to_string(FLIGHT_CARD).unwrap(),
            price = serde_json::to_string(PRICE).unwrap(),
        );
        let json: String = self.page.evaluate(&js).await?;
        let texts: Vec<String> = serde_json::from_str(&json)?;
        let cheapest = texts
            .iter()
            .enumerate()
            .filter_map(|(i, t)| parse_price(t).map(|cents| (i, cents)))
            .min_by_key(|(_, cents)| *cents)
            .map(|(i, _)| i);
        cheapest.ok_or_else(|| Error::PageState("no card carried a readable price".into()))
    }
}

/// Normalize a displayed fare ("€1,234.56", "EUR 1.234,56", "$89") to cents.
///
/// When both separators appear, whichever comes last is the decimal point;
/// a lone separator is decimal only when exactly two digits follow it.
pub fn parse_price(text: &str) -> Option<u32> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let kept = kept.trim_matches(|c| c == '.' || c == ',');
    if kept.is_empty() || !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = kept.rfind('.');
    let last_comma = kept.rfind(',');
    let decimal_pos = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(p), None) | (None, Some(p)) => {
            if kept.len() - p - 1 == 2 {
                Some(p)
            } else {
                None
            }
        }
        (None, None) => None,
    };

    let (whole_part, frac_part) = match decimal_pos {
        Some(p) => (&kept[..p], &kept[p + 1..]),
        None => (kept, ""),
    };
    let whole: String = whole_part.chars().filter(|c| c.is_ascii_digit()).collect();
    let frac: String = frac_part.chars().filter(|c| c.is_ascii_digit()).collect();
    if frac_part.len() != frac.len() {
        return None; // separator inside the fraction
    }

    let whole: u32 = whole.parse().ok()?;
    let cents: u32 = match frac.len() {
        0 => 0,
        2 => frac.parse().ok()?,
        _ => return None,
    };
    whole.checked_mul(100)?.checked_add(cents)
}
