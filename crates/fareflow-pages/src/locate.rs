//! Locator resolution and retry-aware interaction helpers.
//!
//! A [`Locator`] is a named, ordered list of selector candidates. Resolution
//! walks the candidates and picks the first one matching a visible element;
//! the interaction helpers wrap that in a retry loop and, as a last resort,
//! hand the locator to the recovery scan.

use crate::{recover, Error, PageContext, Result};
use eoka::Page;
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

/// A named element locator: primary selector plus fallbacks, tried in order.
#[derive(Debug, Clone)]
pub struct Locator {
    name: String,
    candidates: Vec<String>,
}

impl Locator {
    pub fn new(name: impl Into<String>, primary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: vec![primary.into()],
        }
    }

    /// Add a fallback candidate, tried when the ones before it don't match
    /// a visible element.
    pub fn or(mut self, alternate: impl Into<String>) -> Self {
        self.candidates.push(alternate.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.candidates.join(" | "))
    }
}

/// Attempt/delay policy for transient element races.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, delay_ms: 400 }
    }
}

fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap()
}

/// Whether the selector matches an element that is actually rendered.
pub async fn is_visible(page: &Page, selector: &str) -> Result<bool> {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            if (rect.width < 2 || rect.height < 2) return false;
            const style = getComputedStyle(el);
            return style.display !== 'none'
                && style.visibility !== 'hidden'
                && parseFloat(style.opacity) >= 0.1;
        }})()"#,
        sel = js_str(selector)
    );
    Ok(page.evaluate(&js).await?)
}

/// Whether the selector matches anything at all, visible or not.
pub async fn exists(page: &Page, selector: &str) -> Result<bool> {
    let js = format!("!!document.querySelector({})", js_str(selector));
    Ok(page.evaluate(&js).await?)
}

/// Resolve a locator to the first candidate matching a visible element.
pub async fn resolve(page: &Page, locator: &Locator) -> Result<String> {
    for candidate in locator.candidates() {
        if is_visible(page, candidate).await? {
            return Ok(candidate.clone());
        }
    }
    Err(Error::Locator(format!("no visible match for {locator}")))
}

/// Poll until any of the selectors matches, returning its index.
pub async fn wait_for_any(page: &Page, selectors: &[&str], timeout_ms: u64) -> Result<usize> {
    let started = Instant::now();
    loop {
        for (i, sel) in selectors.iter().enumerate() {
            if is_visible(page, sel).await? {
                return Ok(i);
            }
        }
        if started.elapsed().as_millis() as u64 >= timeout_ms {
            return Err(Error::Timeout(format!(
                "none of [{}] appeared within {timeout_ms}ms",
                selectors.join(", ")
            )));
        }
        page.wait(150).await;
    }
}

/// Click through the locator, retrying per policy and falling back to the
/// recovery scan once the retry budget is spent.
pub async fn click(page: &Page, ctx: &PageContext, locator: &Locator) -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=ctx.retry.attempts {
        if attempt > 1 {
            debug!("click {}: attempt {attempt}", locator.name());
            page.wait(ctx.retry.delay_ms).await;
        }
        match resolve(page, locator).await {
            Ok(sel) => match page.click(&sel).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = Some(Error::from(e)),
            },
            Err(e) => last_err = Some(e),
        }
    }
    if let Some(sel) = recovered(page, ctx, locator).await? {
        page.click(&sel).await?;
        return Ok(());
    }
    Err(last_err.unwrap_or_else(|| Error::Locator(locator.to_string())))
}

/// Clear-and-fill through the locator, with retry and recovery.
pub async fn fill(page: &Page, ctx: &PageContext, locator: &Locator, value: &str) -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=ctx.retry.attempts {
        if attempt > 1 {
            debug!("fill {}: attempt {attempt}", locator.name());
            page.wait(ctx.retry.delay_ms).await;
        }
        match resolve(page, locator).await {
            Ok(sel) => match page.fill(&sel, value).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = Some(Error::from(e)),
            },
            Err(e) => last_err = Some(e),
        }
    }
    if let Some(sel) = recovered(page, ctx, locator).await? {
        page.fill(&sel, value).await?;
        return Ok(());
    }
    Err(last_err.unwrap_or_else(|| Error::Locator(locator.to_string())))
}

/// Set an input's value directly and fire input/change events. Date inputs
/// go through here: typing into them opens the datepicker popup, which then
/// steals the keystrokes.
pub async fn set_value(page: &Page, ctx: &PageContext, locator: &Locator, value: &str) -> Result<()> {
    let sel = resolve_or_recover(page, ctx, locator).await?;
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.value = {val};
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#,
        sel = js_str(&sel),
        val = js_str(value)
    );
    let ok: bool = page.evaluate(&js).await?;
    if !ok {
        return Err(Error::Locator(format!("{locator} vanished before set_value")));
    }
    Ok(())
}

/// Select a `<select>` option by value or visible text, dispatching a
/// bubbling change event so framework listeners notice.
pub async fn select_value(
    page: &Page,
    ctx: &PageContext,
    locator: &Locator,
    value: &str,
) -> Result<()> {
    let sel = resolve_or_recover(page, ctx, locator).await?;
    let js = format!(
        r#"(() => {{
            const sel = document.querySelector({sel});
            if (!sel) return 'element_not_found';
            const opt = Array.from(sel.options).find(o => o.value === {val} || o.text === {val});
            if (!opt) return 'option_not_found';
            sel.value = opt.value;
            sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';
        }})()"#,
        sel = js_str(&sel),
        val = js_str(value)
    );
    let outcome: String = page.evaluate(&js).await?;
    match outcome.as_str() {
        "ok" => Ok(()),
        "element_not_found" => Err(Error::Locator(format!("{locator} not found for select"))),
        "option_not_found" => Err(Error::PageState(format!(
            "option '{value}' missing in {locator}"
        ))),
        other => Err(Error::PageState(format!("select failed: {other}"))),
    }
}

/// Trimmed text content of the located element.
pub async fn read_text(page: &Page, ctx: &PageContext, locator: &Locator) -> Result<String> {
    let sel = resolve_or_recover(page, ctx, locator).await?;
    let js = format!(
        "(document.querySelector({})?.textContent || '').trim()",
        js_str(&sel)
    );
    Ok(page.evaluate(&js).await?)
}

/// Current value of the located form element.
pub async fn read_value(page: &Page, ctx: &PageContext, locator: &Locator) -> Result<String> {
    let sel = resolve_or_recover(page, ctx, locator).await?;
    let js = format!("(document.querySelector({})?.value || '')", js_str(&sel));
    Ok(page.evaluate(&js).await?)
}

async fn resolve_or_recover(page: &Page, ctx: &PageContext, locator: &Locator) -> Result<String> {
    match resolve(page, locator).await {
        Ok(sel) => Ok(sel),
        Err(e) => match recovered(page, ctx, locator).await? {
            Some(sel) => Ok(sel),
            None => Err(e),
        },
    }
}

async fn recovered(page: &Page, ctx: &PageContext, locator: &Locator) -> Result<Option<String>> {
    if !ctx.recovery {
        return Ok(None);
    }
    let suggestion = recover::recover_selector(page, locator).await?;
    if let Some(ref sel) = suggestion {
        warn!("recovered {}: substituting '{sel}'", locator.name());
    }
    Ok(suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_orders_candidates() {
        let loc = Locator::new("cabin select", "#cabin")
            .or("select[name=\"cabinClass\"]")
            .or("[data-testid=\"cabin-class\"]");
        assert_eq!(loc.name(), "cabin select");
        assert_eq!(
            loc.candidates(),
            &[
                "#cabin".to_string(),
                "select[name=\"cabinClass\"]".to_string(),
                "[data-testid=\"cabin-class\"]".to_string(),
            ]
        );
    }

    #[test]
    fn locator_display_lists_fallbacks() {
        let loc = Locator::new("search button", "#search-btn").or("button[type=\"submit\"]");
        let shown = loc.to_string();
        assert!(shown.contains("search button"));
        assert!(shown.contains("#search-btn | button[type=\"submit\"]"));
    }

    #[test]
    fn retry_policy_default_is_bounded() {
        let p = RetryPolicy::default();
        assert!(p.attempts >= 1);
        assert!(p.delay_ms > 0);
    }
}
