//! Video downloads
//!
//! For each video: open it, expand the download options, pick a link by the
//! configured resolution priority and stream it to the destination directory.

pub mod fetch;
pub mod filename;
pub mod resolve;

pub use fetch::{FetchOutcome, Fetcher, TransferProgress};
pub use filename::{build_filename, sanitize};
pub use resolve::{select_link, DownloadLink, ResolvedLink};

use crate::browser::PageDriver;
use crate::config::Config;
use crate::lessons::{LessonInfo, VideoEntry, VideoVisitor};
use crate::locator::{clear_overlays, click_with_scroll, ClickOptions};
use async_trait::async_trait;
use std::path::PathBuf;

/// What happened to one video in download mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
    NoLink,
    Failed(String),
}

/// One processed video, in walk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub lesson: String,
    pub subtitle: String,
    pub index: usize,
    pub title: String,
    pub outcome: DownloadOutcome,
}

/// Visitor that downloads every video it is handed.
pub struct DownloadAction<'a> {
    config: &'a Config,
    fetcher: Fetcher,
    entries: Vec<DownloadEntry>,
}

impl<'a> DownloadAction<'a> {
    pub fn new(config: &'a Config, fetcher: Fetcher) -> Self {
        Self {
            config,
            fetcher,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[DownloadEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DownloadEntry> {
        self.entries
    }

    /// Resolve and fetch the link of the video page that is currently open.
    async fn download_open_video<D: PageDriver>(
        &self,
        driver: &D,
        lesson: &LessonInfo,
        video: &VideoEntry<D::Element>,
    ) -> DownloadOutcome {
        let config = self.config;

        clear_overlays(driver, config).await;

        let Some(link) = resolve::resolve_link(driver, config).await else {
            println!("❌ No video link found.");
            return DownloadOutcome::NoLink;
        };

        let name = build_filename(
            &lesson.title,
            &lesson.subtitle,
            video.index,
            &video.title,
            link.resolution.as_deref(),
            &link.url,
        );
        let dest = config.download_dir.join(&name);

        if dest.exists() {
            println!("✔️  Already exists: {}", name);
            return DownloadOutcome::AlreadyPresent(dest);
        }

        println!("⬇️  Downloading: {}", name);
        match self.fetcher.fetch(&link.url, &dest).await {
            Ok(FetchOutcome::Downloaded { bytes }) => {
                log::debug!("{} bytes written to {}", bytes, dest.display());
                println!("✅ Download finished: {}", name);
                DownloadOutcome::Downloaded(dest)
            }
            Ok(FetchOutcome::AlreadyPresent) => {
                println!("✔️  Already exists: {}", name);
                DownloadOutcome::AlreadyPresent(dest)
            }
            Err(e) => {
                println!("❌ Download failed: {}", e);
                DownloadOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl<'a, D: PageDriver> VideoVisitor<D> for DownloadAction<'a> {
    async fn visit(&mut self, driver: &D, lesson: &LessonInfo, video: VideoEntry<D::Element>) {
        println!("▶️  {}/{} - {}", video.index, video.total, video.title);

        let open = ClickOptions {
            wait_actionable: true,
            settle_after: self.config.timings.expand_settle,
        };
        let outcome = match click_with_scroll(driver, &video.element, open, self.config).await {
            Ok(()) => {
                let outcome = self.download_open_video(driver, lesson, &video).await;
                if let Err(e) = driver.go_back().await {
                    log::warn!("Back navigation failed: {}", e);
                }
                outcome
            }
            Err(e) => {
                println!("❌ Could not open video: {}", e);
                DownloadOutcome::Failed(e.to_string())
            }
        };

        self.entries.push(DownloadEntry {
            lesson: lesson.title.clone(),
            subtitle: lesson.subtitle.clone(),
            index: video.index,
            title: video.title,
            outcome,
        });
    }
}
