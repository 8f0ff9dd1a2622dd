// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Streaming archive downloads with cooperative cancellation.

use crate::config::{PROGRESS_STEP_BYTES, USER_AGENT};
use crate::error::{InstallError, InstallResult};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Progress callback: bytes written so far and the total, when the server sent one.
pub type ProgressFn = dyn Fn(u64, Option<u64>) + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub bytes: u64,
    /// Lowercase hex SHA-256 of what was written.
    pub sha256: String,
}

/// Downloads a URL to a local file.
///
/// On any error, including cancellation, nothing is left at `dest`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
        progress: &ProgressFn,
    ) -> InstallResult<FetchOutcome>;
}

/// Plain HTTPS GET through reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
    inactivity_timeout: Duration,
}

impl HttpFetcher {
    /// `timeout` bounds both connection setup and the gap between two chunks.
    pub fn new(timeout: Duration) -> InstallResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| InstallError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            inactivity_timeout: timeout,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
        progress: &ProgressFn,
    ) -> InstallResult<FetchOutcome> {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        crate::debug::log(&format!("GET {}", url));

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InstallError::Cancelled),
            sent = timeout(self.inactivity_timeout, self.client.get(url).send()) => match sent {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(InstallError::Network(format!("Failed to start download: {}", e))),
                Err(_) => {
                    return Err(InstallError::Network(format!(
                        "No response from server within {} seconds",
                        self.inactivity_timeout.as_secs()
                    )))
                }
            },
        };

        if !response.status().is_success() {
            return Err(InstallError::Network(format!(
                "Download failed: HTTP {}",
                response.status()
            )));
        }

        let total = response.content_length();
        crate::debug::log(&format!("Response OK, content length: {:?}", total));

        write_stream(
            response.bytes_stream(),
            dest,
            total,
            cancel,
            self.inactivity_timeout,
            progress,
        )
        .await
    }
}

/// Write a chunk stream to `dest`, checking `cancel` between chunks.
///
/// A partially written file is deleted before any error is returned.
pub async fn write_stream<S, B, E>(
    stream: S,
    dest: &Path,
    total: Option<u64>,
    cancel: &CancellationToken,
    inactivity: Duration,
    progress: &ProgressFn,
) -> InstallResult<FetchOutcome>
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", parent), e))?;
    }

    let mut file = File::create(dest)
        .await
        .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", dest), e))?;

    let result = pump(stream, &mut file, dest, total, cancel, inactivity, progress).await;

    if result.is_err() {
        drop(file);
        let _ = tokio::fs::remove_file(dest).await;
    }
    result
}

async fn pump<S, B, E>(
    stream: S,
    file: &mut File,
    dest: &Path,
    total: Option<u64>,
    cancel: &CancellationToken,
    inactivity: Duration,
    progress: &ProgressFn,
) -> InstallResult<FetchOutcome>
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let mut stream = std::pin::pin!(stream);
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut last_reported: u64 = 0;

    progress(0, total);

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InstallError::Cancelled),
            next = timeout(inactivity, stream.next()) => match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return Err(InstallError::Network(format!("Download error: {}", e))),
                Ok(None) => break,
                Err(_) => {
                    return Err(InstallError::Network(format!(
                        "No data received for {} seconds ({} bytes downloaded)",
                        inactivity.as_secs(),
                        downloaded
                    )))
                }
            },
        };

        let bytes = chunk.as_ref();
        file.write_all(bytes)
            .await
            .map_err(|e| InstallError::filesystem(format!("Failed to write {:?}", dest), e))?;
        hasher.update(bytes);
        downloaded += bytes.len() as u64;

        if downloaded - last_reported >= PROGRESS_STEP_BYTES {
            progress(downloaded, total);
            last_reported = downloaded;
        }
    }

    file.flush()
        .await
        .map_err(|e| InstallError::filesystem(format!("Failed to flush {:?}", dest), e))?;

    if let Some(expected) = total {
        if downloaded != expected {
            return Err(InstallError::Network(format!(
                "Connection closed early: received {} of {} bytes",
                downloaded, expected
            )));
        }
    }

    if last_reported != downloaded {
        progress(downloaded, total);
    }

    Ok(FetchOutcome {
        bytes: downloaded,
        sha256: format!("{:x}", hasher.finalize()),
    })
}
