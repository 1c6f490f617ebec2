//! Video duration prober
//!
//! Opens each video, gets the player to load metadata by starting muted
//! playback, reads the media duration and returns to the listing. Every video
//! produces exactly one [`DurationRecord`]; failures become sentinel outcomes.

use crate::browser::{PageDriver, Selector};
use crate::config::Config;
use crate::error::Result;
use crate::lessons::{LessonInfo, VideoEntry, VideoVisitor};
use crate::locator::{wait_actionable, wait_for_present};
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::fmt;
use tokio::time::Instant;

/// Format whole seconds as `HH:MM:SS` (one hour or more) or `MM:SS`.
///
/// Fractions are rounded to the nearest second. Non-finite and negative
/// inputs have no representation and yield `None`.
pub fn format_duration(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let total = seconds.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        Some(format!("{:02}:{:02}:{:02}", hours, minutes, secs))
    } else {
        Some(format!("{:02}:{:02}", minutes, secs))
    }
}

/// What probing one video produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationOutcome {
    Measured(String),
    /// The video item could not be scrolled to or clicked.
    OpenFailed,
    /// No player appeared after opening the video.
    NoPlayer,
    /// The player never reported a usable duration.
    Unavailable,
    /// The page failed while starting playback or reading the duration.
    ProbeFailed,
}

impl DurationOutcome {
    pub fn is_measured(&self) -> bool {
        matches!(self, DurationOutcome::Measured(_))
    }
}

impl fmt::Display for DurationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationOutcome::Measured(value) => f.write_str(value),
            DurationOutcome::OpenFailed => f.write_str("OPEN FAILED"),
            DurationOutcome::NoPlayer => f.write_str("NO PLAYER"),
            DurationOutcome::Unavailable => f.write_str("DURATION N/A"),
            DurationOutcome::ProbeFailed => f.write_str("DURATION ERROR"),
        }
    }
}

impl Serialize for DurationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of the duration report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationRecord {
    #[serde(rename = "Lesson")]
    pub lesson: String,
    #[serde(rename = "Subtitle")]
    pub subtitle: String,
    #[serde(rename = "Video")]
    pub index: usize,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Duration")]
    pub duration: DurationOutcome,
}

/// Open one video and measure it. Always leaves the browser back on the
/// listing, except when the video could not be opened in the first place.
pub async fn probe<D: PageDriver>(
    driver: &D,
    element: &D::Element,
    config: &Config,
) -> DurationOutcome {
    let timings = &config.timings;

    if let Err(reason) = open_video(driver, element, config).await {
        log::debug!("Could not open video: {}", reason);
        return DurationOutcome::OpenFailed;
    }

    let player = Selector::css(config.selectors.video_player.clone());
    if wait_for_present(driver, &player, timings.player_wait, timings.locate_poll)
        .await
        .is_none()
    {
        back_to_listing(driver).await;
        return DurationOutcome::NoPlayer;
    }

    let measured = read_duration(driver, config).await;
    back_to_listing(driver).await;

    match measured {
        Ok(Some(seconds)) => format_duration(seconds)
            .map(DurationOutcome::Measured)
            .unwrap_or(DurationOutcome::Unavailable),
        Ok(None) => DurationOutcome::Unavailable,
        Err(e) => {
            log::debug!("Duration probe failed: {}", e);
            DurationOutcome::ProbeFailed
        }
    }
}

async fn open_video<D: PageDriver>(
    driver: &D,
    element: &D::Element,
    config: &Config,
) -> std::result::Result<(), String> {
    let timings = &config.timings;

    driver
        .scroll_into_view(element, 0)
        .await
        .map_err(|e| e.to_string())?;

    if !wait_actionable(driver, element, timings.actionable_wait, timings.locate_poll).await {
        return Err("video item never became clickable".to_string());
    }

    driver.click(element).await.map_err(|e| e.to_string())
}

/// Start muted playback and poll for a duration until the budget runs out.
async fn read_duration<D: PageDriver>(driver: &D, config: &Config) -> Result<Option<f64>> {
    let timings = &config.timings;

    driver.start_muted_playback().await?;

    let start = Instant::now();
    loop {
        if let Some(seconds) = driver.media_duration().await? {
            return Ok(Some(seconds));
        }

        if start.elapsed() >= timings.duration_budget {
            return Ok(None);
        }

        tokio::time::sleep(timings.duration_poll).await;
    }
}

async fn back_to_listing<D: PageDriver>(driver: &D) {
    if let Err(e) = driver.go_back().await {
        log::warn!("Back navigation failed: {}", e);
    }
}

/// Visitor that probes every video and keeps the records in walk order.
pub struct DurationProber<'a> {
    config: &'a Config,
    records: Vec<DurationRecord>,
}

impl<'a> DurationProber<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[DurationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DurationRecord> {
        self.records
    }
}

#[async_trait]
impl<'a, D: PageDriver> VideoVisitor<D> for DurationProber<'a> {
    async fn visit(&mut self, driver: &D, lesson: &LessonInfo, video: VideoEntry<D::Element>) {
        let duration = probe(driver, &video.element, self.config).await;
        println!(
            "   🕒 Video {}/{}: {} - {}",
            video.index, video.total, video.title, duration
        );

        self.records.push(DurationRecord {
            lesson: lesson.title.clone(),
            subtitle: lesson.subtitle.clone(),
            index: video.index,
            title: video.title,
            duration,
        });
    }
}
