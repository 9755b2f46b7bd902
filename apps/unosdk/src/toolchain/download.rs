//! HTTP downloads of toolchain archives.
//!
//! Downloads stream into a sibling `.part` file and are renamed into place only after
//! the whole body has been written, so a failed or interrupted transfer never
//! leaves a truncated archive at `dest`. Failed attempts are retried with
//! exponential backoff and jitter.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::errors::SdkError;

/// Fetches a remote artifact to a local file.
pub trait Downloader {
    /// Downloads `url` to `dest`. On success `dest` holds the complete body.
    fn download(&self, url: &str, dest: &Path) -> impl Future<Output = Result<(), SdkError>> + Send;
}

/// Progress event emitted during downloads.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Response headers received.
    Started {
        url: String,
        /// Content length, or 0 when the server does not send one.
        total: u64,
    },
    Progress {
        downloaded: u64,
        /// Bytes per second since the transfer started.
        speed: u64,
    },
    /// A failed attempt is about to be retried.
    Retrying { attempt: u32, max_attempts: u32 },
    Completed,
    Failed { error: String },
}

/// Receives [`ProgressEvent`]s; shared across retries.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BASE_RETRY_DELAY_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 300;
const PROGRESS_INTERVAL_MS: u128 = 250;

/// [`Downloader`] over HTTPS using reqwest.
#[derive(Clone)]
pub struct HttpDownloader {
    max_attempts: u32,
    timeout: Duration,
    progress: Option<ProgressCallback>,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            progress: None,
        }
    }
}

impl HttpDownloader {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    async fn attempt(&self, url: &str, dest: &Path) -> Result<(), SdkError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SdkError::download_with_source("failed to create HTTP client", Box::new(e)))?;

        let response = client.get(url).send().await.map_err(|e| {
            SdkError::download_with_source(format!("failed to connect to {url}"), Box::new(e))
        })?;

        if !response.status().is_success() {
            return Err(SdkError::download(format!(
                "HTTP error {}: {url}",
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        self.emit(ProgressEvent::Started {
            url: url.to_string(),
            total,
        });

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| SdkError::io(format!("failed to create {}", dest.display()), e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start = Instant::now();
        let mut last_update = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                SdkError::download_with_source(format!("failed to read body of {url}"), Box::new(e))
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| SdkError::io(format!("failed to write {}", dest.display()), e))?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
                self.emit(ProgressEvent::Progress {
                    downloaded,
                    speed: bytes_per_second(downloaded, start.elapsed()),
                });
                last_update = now;
            }
        }

        file.flush()
            .await
            .map_err(|e| SdkError::io(format!("failed to flush {}", dest.display()), e))?;

        if total > 0 && downloaded != total {
            return Err(SdkError::download(format!(
                "incomplete download of {url}: got {downloaded} of {total} bytes"
            )));
        }

        self.emit(ProgressEvent::Progress {
            downloaded,
            speed: bytes_per_second(downloaded, start.elapsed()),
        });
        Ok(())
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), SdkError> {
        let part = dest.with_extension("part");

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SdkError::io(format!("failed to create {}", parent.display()), e))?;
        }

        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                self.emit(ProgressEvent::Retrying {
                    attempt: attempt + 1,
                    max_attempts: self.max_attempts,
                });
                tokio::time::sleep(Duration::from_millis(calculate_retry_delay(attempt))).await;
            }

            match self.attempt(url, &part).await {
                Ok(()) => {
                    tokio::fs::rename(&part, dest).await.map_err(|e| {
                        SdkError::io(
                            format!("failed to rename {} to {}", part.display(), dest.display()),
                            e,
                        )
                    })?;
                    self.emit(ProgressEvent::Completed);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(url, attempt, error = %e, "download attempt failed");
                    let _ = tokio::fs::remove_file(&part).await;
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| {
            SdkError::download(format!(
                "download failed after {} attempts",
                self.max_attempts
            ))
        });
        self.emit(ProgressEvent::Failed {
            error: error.to_string(),
        });
        Err(error)
    }
}

/// Renders progress events as a single updating line on stderr.
#[must_use]
pub fn terminal_progress() -> ProgressCallback {
    let state = Arc::new(std::sync::Mutex::new(0u64));
    Arc::new(move |event| {
        let mut stderr = std::io::stderr();
        match event {
            ProgressEvent::Started { url, total } => {
                tracing::debug!(%url, total, "download started");
                if let Ok(mut slot) = state.lock() {
                    *slot = total;
                }
            }
            ProgressEvent::Progress { downloaded, speed } => {
                let total = state.lock().map(|t| *t).unwrap_or(0);
                let _ = write!(
                    stderr,
                    "\r{}/{} ({}%) {}     ",
                    format_bytes(downloaded),
                    format_bytes(total),
                    percent(downloaded, total),
                    format_speed(speed)
                );
                let _ = stderr.flush();
            }
            ProgressEvent::Retrying {
                attempt,
                max_attempts,
            } => {
                let _ = writeln!(stderr, "\nRetrying download (attempt {attempt}/{max_attempts})...");
            }
            ProgressEvent::Completed => {
                let _ = writeln!(stderr);
            }
            ProgressEvent::Failed { error } => {
                let _ = writeln!(stderr);
                tracing::debug!(%error, "download failed");
            }
        }
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn bytes_per_second(downloaded: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (downloaded as f64 / secs) as u64
    } else {
        0
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn percent(downloaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (downloaded as f64 / total as f64 * 100.0).min(100.0) as u8
}

fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_speed(speed: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let speed = speed as f64;
    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

/// Exponential backoff (1s, 2s, 4s, ...) with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt.min(6));
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}
