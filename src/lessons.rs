//! Lesson hierarchy walker
//!
//! The listing page shows one collapsible header per lesson. Expanding a
//! header renders that lesson's videos; the walker hands each one to a
//! [`VideoVisitor`] and collapses the header again before moving on.

use crate::browser::{PageDriver, Selector};
use crate::config::Config;
use crate::locator::{click_with_scroll, close_interstitial, wait_for_present, ClickOptions};
use async_trait::async_trait;

const UNTITLED: &str = "(untitled)";

/// One lesson section as found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonInfo {
    /// 1-based position in page order.
    pub position: usize,
    pub title: String,
    pub subtitle: String,
}

/// One video inside an expanded lesson.
#[derive(Debug, Clone)]
pub struct VideoEntry<E> {
    /// 1-based index within the lesson.
    pub index: usize,
    /// Number of videos in the lesson.
    pub total: usize,
    pub title: String,
    /// Only valid while the listing that produced it is loaded.
    pub element: E,
}

/// Per-video action run by the walker.
#[async_trait]
pub trait VideoVisitor<D: PageDriver>: Send {
    async fn visit(&mut self, driver: &D, lesson: &LessonInfo, video: VideoEntry<D::Element>);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub lessons: usize,
    pub videos: usize,
    /// Lessons whose header could not be expanded.
    pub skipped_lessons: usize,
}

/// Walk every lesson header on the current page.
///
/// Headers are snapshotted once up front; sections added or removed while
/// walking are not picked up.
pub async fn walk_lessons<D, V>(driver: &D, config: &Config, visitor: &mut V) -> WalkSummary
where
    D: PageDriver,
    V: VideoVisitor<D>,
{
    let mut summary = WalkSummary::default();
    let header_selector = Selector::css(config.selectors.lesson_header.clone());

    let headers = match driver.find_all(&header_selector).await {
        Ok(headers) => headers,
        Err(e) => {
            println!("⚠️  Could not list lessons: {}", e);
            return summary;
        }
    };

    if headers.is_empty() {
        println!("⚠️  No lessons found on the page.");
        return summary;
    }

    log::info!("Found {} lesson header(s)", headers.len());

    for (offset, header) in headers.iter().enumerate() {
        let lesson = read_lesson_info(driver, header, offset + 1, config).await;
        println!("📖 {}", lesson.title);
        println!("📝 {}", lesson.subtitle);

        close_interstitial(driver, config).await;

        let expand = ClickOptions {
            wait_actionable: true,
            settle_after: config.timings.expand_settle,
        };
        if let Err(e) = click_with_scroll(driver, header, expand, config).await {
            println!("⚠️  Could not expand lesson '{}': {}", lesson.title, e);
            summary.skipped_lessons += 1;
            continue;
        }
        summary.lessons += 1;

        let videos = collect_videos(driver, config).await;
        let total = videos.len();

        for (offset, (title, element)) in videos.into_iter().enumerate() {
            let entry = VideoEntry {
                index: offset + 1,
                total,
                title,
                element,
            };
            visitor.visit(driver, &lesson, entry).await;
            summary.videos += 1;
        }

        let collapse = ClickOptions {
            wait_actionable: false,
            settle_after: config.timings.collapse_settle,
        };
        if let Err(e) = click_with_scroll(driver, header, collapse, config).await {
            log::warn!("Could not collapse lesson '{}': {}", lesson.title, e);
        }
    }

    summary
}

async fn read_lesson_info<D: PageDriver>(
    driver: &D,
    header: &D::Element,
    position: usize,
    config: &Config,
) -> LessonInfo {
    let title = first_text(driver, header, &config.selectors.lesson_title)
        .await
        .unwrap_or_else(|| {
            log::debug!("Lesson {} has no title element", position);
            UNTITLED.to_string()
        });
    let subtitle = first_text(driver, header, &config.selectors.lesson_subtitle)
        .await
        .unwrap_or_default();

    LessonInfo {
        position,
        title,
        subtitle,
    }
}

/// Trimmed text of the first descendant matching `css`.
async fn first_text<D: PageDriver>(driver: &D, parent: &D::Element, css: &str) -> Option<String> {
    let found = driver.find_in(parent, css).await.ok()?;
    let first = found.into_iter().next()?;
    driver
        .text(&first)
        .await
        .ok()
        .map(|text| text.trim().to_string())
}

/// Titles and handles of every video item currently rendered.
async fn collect_videos<D: PageDriver>(driver: &D, config: &Config) -> Vec<(String, D::Element)> {
    println!("⏳ Collecting video list...");

    let selector = Selector::css(config.selectors.video_items_group());
    let Some(items) = wait_for_present(
        driver,
        &selector,
        config.timings.video_list_wait,
        config.timings.locate_poll,
    )
    .await
    else {
        println!("⚠️  No videos found in this lesson.");
        return Vec::new();
    };

    let mut videos = Vec::with_capacity(items.len());
    for item in items {
        let title = match first_text(driver, &item, &config.selectors.video_title).await {
            Some(title) => title,
            None => {
                let raw = driver.text(&item).await.unwrap_or_default();
                let raw = raw.trim();
                if raw.is_empty() {
                    UNTITLED.to_string()
                } else {
                    raw.to_string()
                }
            }
        };
        videos.push((title, item));
    }

    println!("🎥 {} videos found.", videos.len());
    videos
}
