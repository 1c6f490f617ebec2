//! End-to-end runs
//!
//! Login, make sure the lesson listing is open, then walk it with either the
//! duration prober or the downloader.

use crate::auth::{Authenticator, OperatorPrompt};
use crate::browser::PageDriver;
use crate::config::{Config, Credentials};
use crate::download::{DownloadAction, DownloadEntry, DownloadOutcome, Fetcher};
use crate::duration::{DurationProber, DurationRecord};
use crate::error::{Error, Result};
use crate::lessons::{walk_lessons, WalkSummary};
use crate::locator::accept_dialog;
use crate::report;
use std::future::Future;
use std::sync::Arc;

/// What the run does with each video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Record every video's duration to the report file.
    Durations,
    /// Download every video in the best available resolution.
    Downloads,
}

impl Mode {
    /// Parse the interactive menu answer. Anything but `1` or `2` is rejected.
    pub fn from_menu_choice(input: &str) -> Result<Self> {
        match input.trim() {
            "1" => Ok(Mode::Durations),
            "2" => Ok(Mode::Downloads),
            other => Err(Error::InvalidChoice(other.to_string())),
        }
    }
}

pub fn print_menu() {
    println!("🧠 Choose what to do:");
    println!("1 - Extract video durations");
    println!("2 - Download every video (highest available resolution)");
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunReport {
    Durations {
        walk: WalkSummary,
        records: Vec<DurationRecord>,
    },
    Downloads {
        walk: WalkSummary,
        entries: Vec<DownloadEntry>,
    },
}

/// Go to the lesson listing unless the browser is already on it.
pub async fn ensure_listing_page<D: PageDriver>(driver: &D, config: &Config) -> Result<()> {
    let current = driver.current_url().await.unwrap_or_default();

    if !current.starts_with(&config.site_root) || !current.contains(&config.listing_marker) {
        println!("🔎 Going to the lessons URL...");
        driver.goto(&config.lessons_url).await?;
        accept_dialog(driver, config.timings.dialog_wait).await;
        tokio::time::sleep(config.timings.listing_settle).await;
    }

    Ok(())
}

/// Probe every video and save the report.
pub async fn run_durations<D: PageDriver>(
    driver: &D,
    config: &Config,
) -> Result<(WalkSummary, Vec<DurationRecord>)> {
    let mut prober = DurationProber::new(config);
    let walk = walk_lessons(driver, config, &mut prober).await;
    let records = prober.into_records();

    println!("🎥 {} videos found in total.", records.len());
    report::save(&config.output_file, &records)?;

    Ok((walk, records))
}

/// Download every video into the configured directory.
pub async fn run_downloads<D: PageDriver>(
    driver: &D,
    config: &Config,
    fetcher: Fetcher,
) -> Result<(WalkSummary, Vec<DownloadEntry>)> {
    println!("📥 Starting video downloads...");
    tokio::fs::create_dir_all(&config.download_dir).await?;

    let mut action = DownloadAction::new(config, fetcher);
    let walk = walk_lessons(driver, config, &mut action).await;
    let entries = action.into_entries();

    let downloaded = entries
        .iter()
        .filter(|e| matches!(e.outcome, DownloadOutcome::Downloaded(_)))
        .count();
    let present = entries
        .iter()
        .filter(|e| matches!(e.outcome, DownloadOutcome::AlreadyPresent(_)))
        .count();
    log::info!(
        "{} downloaded, {} already present, {} skipped",
        downloaded,
        present,
        entries.len() - downloaded - present
    );
    println!("🎥 {} videos processed in total.", entries.len());

    Ok((walk, entries))
}

/// Full run: login, listing, then the selected mode.
pub async fn run<D: PageDriver>(
    driver: &D,
    config: &Config,
    mode: Mode,
    credentials: &Credentials,
    prompt: Arc<dyn OperatorPrompt>,
) -> Result<RunReport> {
    let mut auth = Authenticator::new(driver, config, prompt);
    let login = auth.login(credentials).await?;
    log::info!("Logged in ({:?})", login);

    ensure_listing_page(driver, config).await?;
    tokio::time::sleep(config.timings.walk_settle).await;

    match mode {
        Mode::Durations => {
            let (walk, records) = run_durations(driver, config).await?;
            Ok(RunReport::Durations { walk, records })
        }
        Mode::Downloads => {
            let fetcher = Fetcher::new(
                config.timings.http_connect_timeout,
                config.timings.http_read_timeout,
            )?;
            let (walk, entries) = run_downloads(driver, config, fetcher).await?;
            Ok(RunReport::Downloads { walk, entries })
        }
    }
}

/// Same as [`run`], but abandoned with [`Error::Interrupted`] as soon as
/// `interrupt` completes. The driver is left for the caller to close.
pub async fn run_until<D, I>(
    driver: &D,
    config: &Config,
    mode: Mode,
    credentials: &Credentials,
    prompt: Arc<dyn OperatorPrompt>,
    interrupt: I,
) -> Result<RunReport>
where
    D: PageDriver,
    I: Future<Output = ()>,
{
    tokio::select! {
        report = run(driver, config, mode, credentials, prompt) => report,
        () = interrupt => {
            println!("⚠️  Interrupted, stopping the run.");
            Err(Error::Interrupted)
        }
    }
}
