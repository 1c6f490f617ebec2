//! Element location and the small UI chores every flow shares
//!
//! `locate` resolves a logical target through its ordered selector strategy.
//! The remaining helpers wrap interactions that the site makes awkward:
//! clicks that may be intercepted, stray alert dialogs, an interstitial
//! announcement modal and cookie/newsletter overlays.

use crate::browser::{LocatorStrategy, PageDriver, Selector};
use crate::config::Config;
use std::time::Duration;
use tokio::time::Instant;

/// Share of `timeout` each of `strategies` selectors gets, never below
/// `floor`.
pub fn strategy_budget(timeout: Duration, strategies: usize, floor: Duration) -> Duration {
    if strategies == 0 {
        return floor;
    }
    (timeout / strategies as u32).max(floor)
}

/// Try each selector of `strategy` in order, polling each one for up to its
/// share of `timeout` until an actionable element shows up.
///
/// Absence is not an error here: callers decide whether a missing element
/// is fatal (login field) or simply means the feature is not on the page.
pub async fn locate<D: PageDriver>(
    driver: &D,
    strategy: &LocatorStrategy,
    timeout: Duration,
    config: &Config,
) -> Option<D::Element> {
    let timings = &config.timings;
    let share = strategy_budget(timeout, strategy.len(), timings.min_strategy_budget);

    for selector in strategy.selectors() {
        if let Some(element) = poll_actionable(driver, selector, share, timings.locate_poll).await {
            log::debug!("{} located via {}", strategy.target(), selector);
            return Some(element);
        }
        log::debug!("{} not found via {} within {:?}", strategy.target(), selector, share);
    }

    None
}

async fn poll_actionable<D: PageDriver>(
    driver: &D,
    selector: &Selector,
    budget: Duration,
    poll: Duration,
) -> Option<D::Element> {
    let start = Instant::now();

    loop {
        if let Ok(candidates) = driver.find_all(selector).await {
            for candidate in candidates {
                if driver.is_actionable(&candidate).await.unwrap_or(false) {
                    return Some(candidate);
                }
            }
        }

        if start.elapsed() >= budget {
            return None;
        }

        tokio::time::sleep(poll).await;
    }
}

/// Wait until at least one element matches `selector`.
pub async fn wait_for_present<D: PageDriver>(
    driver: &D,
    selector: &Selector,
    timeout: Duration,
    poll: Duration,
) -> Option<Vec<D::Element>> {
    let start = Instant::now();

    loop {
        if let Ok(found) = driver.find_all(selector).await {
            if !found.is_empty() {
                return Some(found);
            }
        }

        if start.elapsed() >= timeout {
            return None;
        }

        tokio::time::sleep(poll).await;
    }
}

/// Wait until nothing matches `selector`. Returns false on timeout.
pub async fn wait_for_gone<D: PageDriver>(
    driver: &D,
    selector: &Selector,
    timeout: Duration,
    poll: Duration,
) -> bool {
    let start = Instant::now();

    loop {
        if matches!(driver.find_all(selector).await, Ok(found) if found.is_empty()) {
            return true;
        }

        if start.elapsed() >= timeout {
            return false;
        }

        tokio::time::sleep(poll).await;
    }
}

/// Wait until `element` becomes actionable. Returns false on timeout.
pub async fn wait_actionable<D: PageDriver>(
    driver: &D,
    element: &D::Element,
    timeout: Duration,
    poll: Duration,
) -> bool {
    let start = Instant::now();

    loop {
        if driver.is_actionable(element).await.unwrap_or(false) {
            return true;
        }

        if start.elapsed() >= timeout {
            return false;
        }

        tokio::time::sleep(poll).await;
    }
}

/// Accept a JavaScript alert if one is showing or appears within `wait`.
pub async fn accept_dialog<D: PageDriver>(driver: &D, wait: Duration) -> bool {
    match driver.accept_dialog(wait).await {
        Ok(Some(message)) => {
            println!("⚠️  Alert detected: {}", message);
            println!("✅ Alert closed.");
            true
        }
        Ok(None) => false,
        Err(e) => {
            log::debug!("Dialog check failed: {}", e);
            false
        }
    }
}

/// How `click_with_scroll` behaves around the click itself.
#[derive(Debug, Clone, Copy)]
pub struct ClickOptions {
    /// Wait for the element to become actionable before clicking.
    pub wait_actionable: bool,
    /// Pause after the click.
    pub settle_after: Duration,
}

/// Scroll `element` into view (shifted to clear the fixed header), optionally
/// wait for it to be actionable, then click it. An intercepted or failed
/// native click falls back to a script click.
pub async fn click_with_scroll<D: PageDriver>(
    driver: &D,
    element: &D::Element,
    options: ClickOptions,
    config: &Config,
) -> crate::error::Result<()> {
    let timings = &config.timings;

    driver.scroll_into_view(element, config.scroll_offset).await?;
    tokio::time::sleep(timings.scroll_settle).await;

    if options.wait_actionable
        && !wait_actionable(driver, element, timings.actionable_wait, timings.locate_poll).await
    {
        let href = driver
            .attribute(element, "href")
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "unknown".to_string());
        println!("⚠️  Timeout waiting for clickable element: {}", href);
    }

    if let Err(e) = driver.click(element).await {
        log::debug!("Native click failed ({}), using script click", e);
        driver.script_click(element).await?;
    }

    tokio::time::sleep(options.settle_after).await;
    Ok(())
}

/// Close the announcement modal if it pops up. Silent when absent.
pub async fn close_interstitial<D: PageDriver>(driver: &D, config: &Config) -> bool {
    let timings = &config.timings;
    let modal_selector = Selector::css(config.selectors.interstitial_modal.clone());

    let Some(modal) = wait_for_present(driver, &modal_selector, timings.modal_appear, timings.locate_poll)
        .await
        .and_then(|found| found.into_iter().next())
    else {
        return false;
    };

    let close = match driver
        .find_in(&modal, &config.selectors.interstitial_close)
        .await
    {
        Ok(buttons) => buttons.into_iter().next(),
        Err(_) => None,
    };

    let Some(close) = close else {
        log::debug!("Interstitial modal has no close button");
        return false;
    };

    if driver.script_click(&close).await.is_err() {
        return false;
    }

    if wait_for_gone(driver, &modal_selector, timings.modal_dismiss, timings.locate_poll).await {
        println!("ℹ️  Modal closed.");
        true
    } else {
        false
    }
}

/// Remove known cookie/newsletter overlays in one sweep. Failures are
/// ignored; the sweep is best effort.
pub async fn clear_overlays<D: PageDriver>(driver: &D, config: &Config) -> usize {
    let removed = match driver.remove_elements(&config.selectors.overlays_group()).await {
        Ok(n) => n,
        Err(e) => {
            log::debug!("Overlay sweep failed: {}", e);
            0
        }
    };
    if removed > 0 {
        log::debug!("Removed {} overlay element(s)", removed);
    }
    tokio::time::sleep(config.timings.overlay_settle).await;
    removed
}
