//! Integration tests for the page layer, driven against fixture pages.
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test --test booking_form -- --ignored

use eoka::Browser;
use fareflow_pages::{locate, recover, HeuristicOracle, Locator, PageContext, RetryPolicy, SelectorOracle};
use fareflow_pages::PassengerPage;
use fareflow_scenario::PaxCounts;

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

fn test_ctx() -> PageContext {
    PageContext {
        element_timeout_ms: 2_000,
        retry: RetryPolicy { attempts: 2, delay_ms: 100 },
        recovery: true,
    }
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn locator_falls_back_past_missing_primary() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    page.goto(
        r##"data:text/html,
        <style>body { margin: 0; padding: 20px; }</style>
        <input name="origin" placeholder="From">
    "##,
    )
    .await
    .expect("Failed to navigate");

    let locator = Locator::new("origin airport", "#search-origin").or("input[name=\"origin\"]");
    let resolved = locate::resolve(&page, &locator).await.expect("Failed to resolve");
    assert_eq!(resolved, "input[name=\"origin\"]");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn fill_and_select_dispatch_change_events() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    page.goto(
        r##"data:text/html,
        <input id="search-promo">
        <select id="search-cabin">
            <option value="ECONOMY">Economy</option>
            <option value="BUSINESS">Business</option>
        </select>
        <span id="echo"></span>
        <script>
            document.getElementById('search-cabin').addEventListener('change', e => {
                document.getElementById('echo').textContent = e.target.value;
            });
        </script>
    "##,
    )
    .await
    .expect("Failed to navigate");

    let ctx = test_ctx();
    locate::fill(&page, &ctx, &Locator::new("promo code", "#search-promo"), "SUMMER25")
        .await
        .expect("Failed to fill");
    locate::select_value(&page, &ctx, &Locator::new("cabin select", "#search-cabin"), "BUSINESS")
        .await
        .expect("Failed to select");

    let promo: String = page
        .evaluate("document.getElementById('search-promo').value")
        .await
        .expect("Failed to read promo");
    assert_eq!(promo, "SUMMER25");

    // The change listener proves the event bubbled.
    let echo: String = page
        .evaluate("document.getElementById('echo').textContent")
        .await
        .expect("Failed to read echo");
    assert_eq!(echo, "BUSINESS");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn recovery_scan_finds_renamed_field() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    // The frontend renamed #search-depart-date to departureDate.
    page.goto(
        r##"data:text/html,
        <input name="departureDate" placeholder="Departure date">
        <button id="newsletter-signup">Subscribe</button>
    "##,
    )
    .await
    .expect("Failed to navigate");

    let locator =
        Locator::new("depart date", "#search-depart-date").or("input[name=\"departDate\"]");
    let candidates = recover::scan(&page).await.expect("Failed to scan");
    assert!(candidates.len() >= 2, "scan found {} elements", candidates.len());

    let picked = HeuristicOracle
        .propose(&locator, &candidates)
        .await
        .expect("Oracle failed");
    assert_eq!(picked.as_deref(), Some("input[name=\"departureDate\"]"));

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn passenger_form_filled_from_manifest() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    page.goto(
        r##"data:text/html,
        <select id="pax-0-title">
            <option value="Mr">Mr</option>
            <option value="Ms">Ms</option>
        </select>
        <input id="pax-0-first-name">
        <input id="pax-0-last-name">
        <input id="pax-0-dob" type="date">
    "##,
    )
    .await
    .expect("Failed to navigate");

    let today = chrono::Local::now().date_naive();
    let manifest = PaxCounts::parse("1 ADT").expect("bad pax spec").expand(today);

    let ctx = test_ctx();
    let form = PassengerPage::new(&page, &ctx);
    form.wait_until_loaded(2_000).await.expect("form not ready");
    form.fill_passengers(&manifest).await.expect("Failed to fill passengers");

    let first: String = page
        .evaluate("document.getElementById('pax-0-first-name').value")
        .await
        .expect("Failed to read first name");
    assert_eq!(first, manifest[0].first_name);

    let dob: String = page
        .evaluate("document.getElementById('pax-0-dob').value")
        .await
        .expect("Failed to read dob");
    assert_eq!(dob, manifest[0].date_of_birth.format("%Y-%m-%d").to_string());

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn wait_for_any_reports_which_selector_won() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    page.goto(r##"data:text/html,<div class="no-results">No flights found</div>"##)
        .await
        .expect("Failed to navigate");

    let which = locate::wait_for_any(&page, &[".flight-card", ".no-results"], 2_000)
        .await
        .expect("Failed to wait");
    assert_eq!(which, 1);

    let timeout = locate::wait_for_any(&page, &[".flight-card"], 500).await;
    assert!(timeout.is_err());

    browser.close().await.expect("Failed to close browser");
}
