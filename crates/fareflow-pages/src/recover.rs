//! Heuristic selector recovery.
//!
//! When every candidate of a locator fails, the page gets scanned for
//! visible interactive elements and their identifying attributes. Candidates
//! are scored by token overlap with the failed locator, and the best match
//! above a floor is offered as a substitute. [`SelectorOracle`] is the seam
//! for plugging a smarter proposer (the original design reserved a slot for
//! an external language-model service here; only the heuristic ships).

use crate::{Locator, Result};
use async_trait::async_trait;
use eoka::Page;
use serde::Deserialize;
use tracing::debug;

/// Minimum score a candidate needs before it is trusted as a substitute.
const MIN_SCORE: u32 = 4;

/// One interactive element found by the recovery scan.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateElement {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub test_id: Option<String>,
    pub text: String,
    /// Synthesized unique CSS selector for this element.
    pub selector: String,
}

/// Enumerates visible interactive elements with the attributes the scorer
/// cares about. Selector synthesis prefers stable handles (id, name,
/// data-testid) over positional paths.
const SCAN_JS: &str = r#"
(() => {
    const INTERACTIVE = 'a, button, input, select, textarea, [role="button"], [onclick]';
    const results = [];
    const seen = new Set();

    for (const el of document.querySelectorAll(INTERACTIVE)) {
        const rect = el.getBoundingClientRect();
        if (rect.width < 2 || rect.height < 2) continue;
        const style = getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden' || parseFloat(style.opacity) < 0.1) continue;

        const tag = el.tagName.toLowerCase();
        let text = (el.textContent || '').trim().replace(/\s+/g, ' ');
        if (text.length > 60) text = text.substring(0, 60);

        let selector;
        if (el.id) {
            selector = '#' + CSS.escape(el.id);
        } else if (el.name) {
            selector = tag + '[name=' + JSON.stringify(el.name) + ']';
        } else if (el.getAttribute('data-testid')) {
            selector = '[data-testid=' + JSON.stringify(el.getAttribute('data-testid')) + ']';
        } else {
            const parts = [];
            let node = el;
            while (node && node !== document.body && parts.length < 4) {
                let s = node.tagName.toLowerCase();
                if (node.id) {
                    parts.unshift('#' + CSS.escape(node.id));
                    break;
                }
                const parent = node.parentElement;
                if (parent) {
                    const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                    if (siblings.length > 1) {
                        s += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
                    }
                }
                parts.unshift(s);
                node = parent;
            }
            selector = parts.join(' > ');
        }

        if (seen.has(selector)) continue;
        seen.add(selector);

        results.push({
            tag,
            id: el.id || null,
            name: el.name || null,
            placeholder: el.getAttribute('placeholder'),
            aria_label: el.getAttribute('aria-label'),
            test_id: el.getAttribute('data-testid'),
            text,
            selector,
        });
    }
    return JSON.stringify(results);
})()
"#;

/// Run the recovery scan.
pub async fn scan(page: &Page) -> Result<Vec<CandidateElement>> {
    let json: String = page.evaluate(SCAN_JS).await?;
    Ok(serde_json::from_str(&json)?)
}

/// Lowercased alphanumeric runs of at least two characters. camelCase runs
/// split at the case boundary so `departDate` and `depart-date` compare equal.
pub fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for run in s.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut word = String::new();
        let mut prev_lower = false;
        for c in run.chars() {
            if c.is_ascii_uppercase() && prev_lower {
                push_token(&mut tokens, &mut word);
            }
            prev_lower = c.is_ascii_lowercase();
            word.push(c.to_ascii_lowercase());
        }
        push_token(&mut tokens, &mut word);
    }
    tokens
}

fn push_token(tokens: &mut Vec<String>, word: &mut String) {
    if word.len() >= 2 {
        tokens.push(std::mem::take(word));
    } else {
        word.clear();
    }
}

/// Score a candidate against the tokens of a failed locator. Stable handles
/// weigh more than visible text.
pub fn score(needle_tokens: &[String], candidate: &CandidateElement) -> u32 {
    fn overlap(needle: &[String], field: Option<&str>, weight: u32) -> u32 {
        let Some(field) = field else { return 0 };
        let field_tokens = tokenize(field);
        needle
            .iter()
            .filter(|t| field_tokens.iter().any(|f| f == *t))
            .count() as u32
            * weight
    }

    overlap(needle_tokens, candidate.test_id.as_deref(), 5)
        + overlap(needle_tokens, candidate.id.as_deref(), 5)
        + overlap(needle_tokens, candidate.name.as_deref(), 4)
        + overlap(needle_tokens, candidate.aria_label.as_deref(), 3)
        + overlap(needle_tokens, candidate.placeholder.as_deref(), 3)
        + overlap(needle_tokens, Some(&candidate.text), 2)
        + overlap(needle_tokens, Some(&candidate.tag), 1)
}

/// Tokens describing what the locator was looking for: every candidate
/// selector plus the locator's human name.
pub fn locator_tokens(locator: &Locator) -> Vec<String> {
    let mut tokens = tokenize(locator.name());
    for candidate in locator.candidates() {
        tokens.extend(tokenize(candidate));
    }
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Proposes a substitute selector for a locator that failed to resolve.
#[async_trait]
pub trait SelectorOracle: Send + Sync {
    async fn propose(
        &self,
        locator: &Locator,
        candidates: &[CandidateElement],
    ) -> Result<Option<String>>;
}

/// Token-overlap scorer. The only oracle that ships; remote proposers plug
/// in through [`SelectorOracle`].
#[derive(Debug, Default)]
pub struct HeuristicOracle;

#[async_trait]
impl SelectorOracle for HeuristicOracle {
    async fn propose(
        &self,
        locator: &Locator,
        candidates: &[CandidateElement],
    ) -> Result<Option<String>> {
        let needle = locator_tokens(locator);
        let best = candidates
            .iter()
            .map(|c| (score(&needle, c), c))
            .max_by_key(|(s, _)| *s);
        match best {
            Some((s, c)) if s >= MIN_SCORE => {
                debug!("recovery scored '{}' at {s} for {}", c.selector, locator.name());
                Ok(Some(c.selector.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Scan the page and ask the given oracle for a substitute.
pub async fn recover_with(
    page: &Page,
    locator: &Locator,
    oracle: &dyn SelectorOracle,
) -> Result<Option<String>> {
    let candidates = scan(page).await?;
    if candidates.is_empty() {
        return Ok(None);
    }
    oracle.propose(locator, &candidates).await
}

/// Scan-and-score with the shipped heuristic oracle.
pub async fn recover_selector(page: &Page, locator: &Locator) -> Result<Option<String>> {
    recover_with(page, locator, &HeuristicOracle).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: Option<&str>, name: Option<&str>, text: &str, selector: &str) -> CandidateElement {
        CandidateElement {
            tag: "input".into(),
            id: id.map(String::from),
            name: name.map(String::from),
            placeholder: None,
            aria_label: None,
            test_id: None,
            text: text.into(),
            selector: selector.into(),
        }
    }

    #[test]
    fn tokenize_splits_separators_and_camel_case() {
        assert_eq!(
            tokenize("#pax-0-firstName input[name=\"origin\"]"),
            vec!["pax", "first", "name", "input", "name", "origin"]
        );
        assert_eq!(tokenize("departDate"), vec!["depart", "date"]);
        // single characters drop out
        assert_eq!(tokenize("a b cd"), vec!["cd"]);
    }

    #[test]
    fn stable_handles_outscore_text() {
        let needle = tokenize("origin airport input");
        let by_id = candidate(Some("origin-airport"), None, "", "#origin-airport");
        let by_text = candidate(None, None, "origin airport", "div > input:nth-of-type(3)");
        assert!(score(&needle, &by_id) > score(&needle, &by_text));
    }

    #[test]
    fn locator_tokens_include_name_and_all_candidates() {
        let loc = Locator::new("promo code", "#promo").or("input[name=\"promoCode\"]");
        let tokens = locator_tokens(&loc);
        assert!(tokens.contains(&"promo".to_string()));
        assert!(tokens.contains(&"code".to_string()));
        assert!(tokens.contains(&"input".to_string()));
    }

    #[tokio::test]
    async fn heuristic_oracle_rejects_weak_matches() {
        let loc = Locator::new("departure date", "#depart-date");
        let unrelated = vec![candidate(Some("newsletter-signup"), None, "Subscribe", "#newsletter-signup")];
        let picked = HeuristicOracle.propose(&loc, &unrelated).await.unwrap();
        assert!(picked.is_none());
    }

    #[tokio::test]
    async fn heuristic_oracle_picks_renamed_field() {
        let loc = Locator::new("departure date", "#depart-date").or("input[name=\"departDate\"]");
        let candidates = vec![
            candidate(Some("newsletter-signup"), None, "Subscribe", "#newsletter-signup"),
            candidate(None, Some("departureDate"), "", "input[name=\"departureDate\"]"),
        ];
        let picked = HeuristicOracle.propose(&loc, &candidates).await.unwrap();
        assert_eq!(picked.as_deref(), Some("input[name=\"departureDate\"]"));
    }
}
