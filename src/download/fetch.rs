//! Streaming HTTP fetch with progress reporting

use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

/// Bytes written to disk per block.
pub const BLOCK_SIZE: usize = 1024 * 1024;

const MIB: f64 = 1024.0 * 1024.0;

/// Snapshot of a running transfer, taken after every written block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    pub transferred: u64,
    /// `None` when the server sent no content length.
    pub total: Option<u64>,
    pub elapsed: Duration,
}

impl TransferProgress {
    /// Percentage done, or 0 when the total is unknown.
    pub fn percent(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => self.transferred as f64 / total as f64 * 100.0,
            _ => 0.0,
        }
    }

    /// Average throughput in MiB/s since the transfer started.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.transferred as f64 / MIB / secs
        } else {
            0.0
        }
    }

    pub fn elapsed_label(&self) -> String {
        let secs = self.elapsed.as_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

impl fmt::Display for TransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({} MB of {} MB) [{}, {:.2}MB/s]",
            self.percent(),
            self.transferred / BLOCK_SIZE as u64,
            self.total.unwrap_or(0) / BLOCK_SIZE as u64,
            self.elapsed_label(),
            self.rate()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: u64 },
    /// The destination already existed; nothing was requested.
    AlreadyPresent,
}

/// Sequential downloader.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// `read_timeout` bounds every wait for more body bytes, so a stalled
    /// transfer fails instead of hanging the run.
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url` into `dest`, drawing a progress line on the terminal.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("⬇️  Download: {msg}")
                .map_err(|e| Error::Other(e.to_string()))?,
        );

        let result = self
            .fetch_with_progress(url, dest, |progress| bar.set_message(progress.to_string()))
            .await;

        match &result {
            Ok(FetchOutcome::Downloaded { .. }) => bar.finish(),
            _ => bar.finish_and_clear(),
        }
        result
    }

    /// Download `url` into `dest`, calling `on_progress` after every block.
    ///
    /// An existing `dest` is left alone and no request is made. A transfer
    /// that fails midway leaves whatever was written so far on disk.
    pub async fn fetch_with_progress<F>(
        &self,
        url: &str,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<FetchOutcome>
    where
        F: FnMut(&TransferProgress),
    {
        if tokio::fs::try_exists(dest).await? {
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length();

        let mut file = File::create(dest).await?;
        let mut pending: Vec<u8> = Vec::with_capacity(BLOCK_SIZE);
        let mut transferred: u64 = 0;
        let start = Instant::now();

        while let Some(chunk) = response.chunk().await? {
            pending.extend_from_slice(&chunk);

            while pending.len() >= BLOCK_SIZE {
                let block: Vec<u8> = pending.drain(..BLOCK_SIZE).collect();
                file.write_all(&block).await?;
                transferred += block.len() as u64;
                on_progress(&TransferProgress {
                    transferred,
                    total,
                    elapsed: start.elapsed(),
                });
            }
        }

        if !pending.is_empty() {
            file.write_all(&pending).await?;
            transferred += pending.len() as u64;
            on_progress(&TransferProgress {
                transferred,
                total,
                elapsed: start.elapsed(),
            });
        }

        file.flush().await?;
        Ok(FetchOutcome::Downloaded { bytes: transferred })
    }
}
