//! Batch and retry orchestration.
//!
//! Downloads run strictly in sequence. Any per-task failure is recorded and
//! the batch moves on; only startup and configuration problems may abort a
//! run. After the batch, recorded failures can be retried a bounded number
//! of passes.

use crate::downloader::{DownloadTask, Downloader};
use crate::duplicates::{self, DuplicateState, Resolution};
use crate::errors::Result;
use crate::prompt::Prompter;
use crate::tags::TagWriter;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Pause after each successful download to stay under remote throttling.
const POST_DOWNLOAD_PAUSE: Duration = Duration::from_millis(100);
/// Pause between retry passes.
const RETRY_PASS_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct FailedTask {
    pub task: DownloadTask,
    /// Path the duplicate resolution chose for the failed attempt. Retries
    /// write here, so a path picked by `AppendNumber` stays picked.
    pub resolved: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<FailedTask>,
}

pub struct Orchestrator {
    downloader: Box<dyn Downloader>,
    tag_writer: Box<dyn TagWriter>,
    extension: String,
}

impl Orchestrator {
    pub fn new(
        downloader: Box<dyn Downloader>,
        tag_writer: Box<dyn TagWriter>,
        extension: String,
    ) -> Self {
        Self {
            downloader,
            tag_writer,
            extension,
        }
    }

    /// Collapses repeated tracks (same canonical URL) to their first
    /// occurrence, preserving order.
    pub fn dedupe(tasks: Vec<DownloadTask>) -> Vec<DownloadTask> {
        let mut seen = HashSet::new();
        tasks
            .into_iter()
            .filter(|task| seen.insert(task.track.url.clone()))
            .collect()
    }

    /// Runs every task in sequence. Failure of one task never aborts the
    /// batch.
    pub async fn run_batch(
        &self,
        tasks: Vec<DownloadTask>,
        state: &mut DuplicateState,
        interactive: bool,
        prompter: &mut dyn Prompter,
    ) -> BatchReport {
        let tasks = Self::dedupe(tasks);
        let mut report = BatchReport::default();

        let bar = ProgressBar::new(tasks.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{pos:>3}/{len:3}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for task in tasks {
            bar.set_message(task.track.title.clone());
            let target = task.target_path(&self.extension);

            // Prompting mid-batch would fight the progress bar.
            let resolution =
                bar.suspend(|| duplicates::resolve(state, &target, interactive, prompter));

            match resolution {
                Ok(Resolution::Skip) => {
                    info!("Skipping '{}'; file already exists.", task.track.title);
                    report.skipped += 1;
                }
                Ok(Resolution::Proceed(path)) => match self.download_one(&task, &path).await {
                    Ok(()) => report.succeeded += 1,
                    Err(e) => {
                        warn!("Download failed for '{}': {}", task.track.title, e);
                        report.failures.push(FailedTask {
                            task,
                            resolved: path,
                            reason: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    warn!("Could not resolve duplicate for '{}': {}", task.track.title, e);
                    report.failures.push(FailedTask {
                        task,
                        resolved: target,
                        reason: e.to_string(),
                    });
                }
            }

            bar.inc(1);
        }

        bar.finish_and_clear();
        info!(
            "Batch done: {} downloaded, {} skipped, {} failed.",
            report.succeeded,
            report.skipped,
            report.failures.len()
        );

        report
    }

    /// Single-task path: fetch, persist, tag, throttle.
    async fn download_one(&self, task: &DownloadTask, target: &std::path::Path) -> Result<()> {
        info!(
            "Downloading '{}' via {} backend",
            task.track.title,
            self.downloader.name()
        );

        let audio = self.downloader.fetch_audio(&task.track).await?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, &audio.bytes)?;

        // A track that could not be tagged counts as failed and gets
        // retried like any other failure.
        self.tag_writer
            .write_tags(target, &task.track, audio.cover.as_deref())?;

        tokio::time::sleep(POST_DOWNLOAD_PAUSE).await;
        Ok(())
    }

    /// Re-attempts failed tasks for up to `attempts` passes, stopping early
    /// once everything has succeeded. Each retry writes to the path the
    /// failed attempt had already resolved to, without prompting again.
    pub async fn retry_failures(
        &self,
        mut failures: Vec<FailedTask>,
        attempts: u32,
    ) -> Vec<FailedTask> {
        for attempt in 1..=attempts {
            if failures.is_empty() {
                break;
            }

            info!(
                "Retry attempt {} of {} ({} tracks remaining)",
                attempt,
                attempts,
                failures.len()
            );

            let mut remaining = Vec::new();
            for failed in failures {
                match self.download_one(&failed.task, &failed.resolved).await {
                    Ok(()) => info!("Recovered '{}' on retry.", failed.task.track.title),
                    Err(e) => remaining.push(FailedTask {
                        reason: e.to_string(),
                        ..failed
                    }),
                }
            }

            failures = remaining;
            if !failures.is_empty() {
                tokio::time::sleep(RETRY_PASS_PAUSE).await;
            }
        }

        failures
    }
}
