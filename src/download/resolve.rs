//! Download link discovery and resolution choice

use crate::browser::{LocatorStrategy, PageDriver, Selector};
use crate::config::Config;
use crate::locator::{locate, wait_for_present};
use regex::Regex;
use std::sync::LazyLock;

/// A download button as shown on the video page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub label: String,
    pub url: String,
}

impl DownloadLink {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// The link picked for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    /// `None` when neither the label nor the URL names a resolution.
    pub resolution: Option<String>,
    pub url: String,
    /// Matched one of the preferred resolutions rather than falling back.
    pub preferred: bool,
}

/// `NNNp`/`NNNNp` resolution marker.
static RESOLUTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3,4}p)").expect("valid resolution pattern"));

/// First `NNNp`/`NNNNp` marker in `url`, e.g. `720p` or `1080p`.
pub fn infer_resolution(url: &str) -> Option<String> {
    RESOLUTION_PATTERN
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Pick a link by `priority`, matching each preferred resolution against the
/// candidate labels case-insensitively. Without a preferred match the first
/// candidate wins and its resolution is read from its URL.
pub fn select_link(candidates: &[DownloadLink], priority: &[String]) -> Option<ResolvedLink> {
    for wanted in priority {
        let wanted_lower = wanted.to_lowercase();
        if let Some(link) = candidates
            .iter()
            .find(|link| link.label.to_lowercase().contains(&wanted_lower))
        {
            return Some(ResolvedLink {
                resolution: Some(wanted.clone()),
                url: link.url.clone(),
                preferred: true,
            });
        }
    }

    candidates.first().map(|link| ResolvedLink {
        resolution: infer_resolution(&link.url),
        url: link.url.clone(),
        preferred: false,
    })
}

/// Expand the download options panel of the open video and read its links.
///
/// Returns an empty list when the panel or its links never show up.
pub async fn collect_links<D: PageDriver>(driver: &D, config: &Config) -> Vec<DownloadLink> {
    let selectors = &config.selectors;
    let timings = &config.timings;

    let toggle_strategy =
        LocatorStrategy::new("download options", vec![selectors.download_toggle.clone()]);
    let Some(toggle) = locate(driver, &toggle_strategy, timings.download_toggle_wait, config).await
    else {
        println!("⚠️  Download options not found on this page.");
        return Vec::new();
    };

    let container = Selector::css(selectors.download_container.clone());
    let expanded = matches!(driver.find_all(&container).await, Ok(found) if !found.is_empty());

    if !expanded {
        if let Err(e) = driver.click(&toggle).await {
            log::debug!("Native click on download options failed ({}), using script click", e);
            if let Err(e) = driver.script_click(&toggle).await {
                println!("⚠️  Could not open download options: {}", e);
                return Vec::new();
            }
        }
        tokio::time::sleep(timings.download_expand_settle).await;

        if wait_for_present(driver, &container, timings.download_links_wait, timings.locate_poll)
            .await
            .is_none()
        {
            println!("⚠️  Download links never appeared.");
            return Vec::new();
        }
    }

    let buttons = match driver
        .find_all(&Selector::css(selectors.download_links.clone()))
        .await
    {
        Ok(buttons) => buttons,
        Err(e) => {
            log::warn!("Could not read download links: {}", e);
            return Vec::new();
        }
    };

    let mut links = Vec::new();
    for button in &buttons {
        let url = match driver.attribute(button, "href").await {
            Ok(Some(href)) if !href.trim().is_empty() => href,
            _ => continue,
        };
        let label = driver
            .text(button)
            .await
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        links.push(DownloadLink { label, url });
    }

    log::debug!("{} download link(s) found", links.len());
    links
}

/// Collect the links of the open video and pick one, narrating the choice.
pub async fn resolve_link<D: PageDriver>(driver: &D, config: &Config) -> Option<ResolvedLink> {
    let links = collect_links(driver, config).await;
    let resolved = select_link(&links, &config.resolution_priority)?;

    let label = resolved.resolution.as_deref().unwrap_or("unknown");
    if resolved.preferred {
        println!("🎯 Link found with preferred resolution {}", label);
    } else {
        println!(
            "⚠️  No link in the preferred resolutions. Using {}, the first valid link.",
            label
        );
    }

    Some(resolved)
}
