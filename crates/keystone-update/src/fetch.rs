//! Streaming archive download with progress tracking
//!
//! The response body flows through a gzip decoder and a tar extractor
//! without ever being buffered whole:
//!
//! ```text
//! reqwest byte stream -> StreamReader -> SyncIoBridge -> GzDecoder -> tar::Archive -> dest
//! ```
//!
//! The extractor runs on a blocking task and pulls from the network only
//! as fast as it can write, so memory stays bounded regardless of archive
//! size. Completion is reported once the last entry is on disk, not when
//! the response ends.
//!
//! Only gzip-compressed tar archives are accepted. Plain tar, zlib, bzip2,
//! xz and zip bodies fail in the extraction stage.

use flate2::read::GzDecoder;
use futures_util::StreamExt;
use keystone_core::types::NetworkConfig;
use keystone_core::TrustPolicy;
use reqwest::header::{HeaderMap, HeaderValue, CONNECTION};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tar::Archive;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::events::{EventSink, UpdateEvent};

/// Number of progress reports per download when the length is known
const PROGRESS_STEPS: u64 = 100;

/// Turns byte arrivals into progress deltas of at least 1% of the declared
/// length each.
///
/// With an unknown (zero) length no deltas are produced; bytes are still
/// counted so [`pending`](Self::pending) stays meaningful.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    threshold: Option<u64>,
    pending: u64,
}

impl ProgressTracker {
    /// Create a tracker for a download of `total_bytes`
    pub fn new(total_bytes: u64) -> Self {
        let threshold = (total_bytes > 0).then(|| (total_bytes / PROGRESS_STEPS).max(1));
        Self {
            threshold,
            pending: 0,
        }
    }

    /// Record `bytes` received; returns the delta to report, if any
    pub fn record(&mut self, bytes: u64) -> Option<u64> {
        self.pending += bytes;
        let threshold = self.threshold?;
        if self.pending >= threshold {
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }

    /// Bytes received since the last reported delta
    pub fn pending(&self) -> u64 {
        self.pending
    }
}

/// Outcome of a completed download and extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Declared content length (0 when unknown)
    pub total_bytes: u64,

    /// Bytes actually received
    pub received_bytes: u64,

    /// Archive entries written
    pub entries: u64,
}

/// HTTP client for release archives
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
}

impl ArchiveFetcher {
    /// Create a fetcher from network settings
    pub fn new(network: &NetworkConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let mut builder = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(network.connect_timeout_secs))
            .timeout(Duration::from_secs(network.download_timeout_secs));

        if network.tls == TrustPolicy::AcceptInvalidCerts {
            warn!("TLS certificate validation is disabled for release downloads");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Send the request and wait for response headers.
    ///
    /// Non-success statuses are rejected here rather than left to fail as
    /// a decompression error further down the pipeline.
    pub async fn open(&self, url: &str) -> Result<ArchiveDownload, FetchError> {
        info!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let total_bytes = response.content_length().unwrap_or(0);
        debug!("Response {} with declared length {}", status, total_bytes);

        Ok(ArchiveDownload {
            response,
            total_bytes,
        })
    }

    /// Download `url` and extract it into `dest`, emitting
    /// `DownloadStarted` and `DownloadProgressed` events
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<ExtractSummary, FetchError> {
        let download = self.open(url).await?;
        events.emit(UpdateEvent::DownloadStarted {
            total_bytes: download.total_bytes(),
        });
        download.extract_into(dest, events, cancel).await
    }
}

/// An accepted response whose body has not been read yet
#[derive(Debug)]
pub struct ArchiveDownload {
    response: reqwest::Response,
    total_bytes: u64,
}

impl ArchiveDownload {
    /// Declared content length, 0 when absent or unparseable
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Stream the body through gzip and tar into `dest`
    pub async fn extract_into(
        self,
        dest: &Path,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<ExtractSummary, FetchError> {
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(FetchError::Extraction)?;

        let total_bytes = self.total_bytes;
        let received = Arc::new(AtomicU64::new(0));
        let transport_failure: Arc<OnceLock<String>> = Arc::default();

        let stream = {
            let mut tracker = ProgressTracker::new(total_bytes);
            let events = events.clone();
            let cancel = cancel.clone();
            let received = Arc::clone(&received);
            let transport_failure = Arc::clone(&transport_failure);

            self.response.bytes_stream().map(move |chunk| {
                if cancel.is_cancelled() {
                    // Not ErrorKind::Interrupted: std readers retry those.
                    return Err(io::Error::other("download cancelled"));
                }
                match chunk {
                    Ok(bytes) => {
                        let len = bytes.len() as u64;
                        received.fetch_add(len, Ordering::Relaxed);
                        if let Some(delta) = tracker.record(len) {
                            events.emit(UpdateEvent::DownloadProgressed { delta_bytes: delta });
                        }
                        Ok(bytes)
                    }
                    Err(err) => {
                        let _ = transport_failure.set(err.to_string());
                        Err(io::Error::other(err))
                    }
                }
            })
        };

        let reader = SyncIoBridge::new(StreamReader::new(Box::pin(stream)));
        let target: PathBuf = dest.to_path_buf();
        let result = tokio::task::spawn_blocking(move || unpack(reader, &target)).await?;

        match result {
            Ok(entries) => {
                let received_bytes = received.load(Ordering::Relaxed);
                info!(
                    "Extracted {} entries ({} bytes received) into {:?}",
                    entries, received_bytes, dest
                );
                Ok(ExtractSummary {
                    total_bytes,
                    received_bytes,
                    entries,
                })
            }
            Err(_) if cancel.is_cancelled() => Err(FetchError::Cancelled),
            Err(err) => match transport_failure.get() {
                Some(message) => Err(FetchError::Transport(message.clone())),
                None => Err(FetchError::Extraction(err)),
            },
        }
    }
}

/// Unpack a gzip-compressed tar stream into `dest`, returning the number of
/// entries written
fn unpack<R: Read>(reader: R, dest: &Path) -> io::Result<u64> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut entries = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.unpack_in(dest)? {
            warn!("Skipped archive entry outside of {:?}", dest);
            continue;
        }
        entries += 1;
    }

    // Read to the end of the gzip stream so its trailer is verified and the
    // response body is fully consumed.
    io::copy(&mut archive.into_inner(), &mut io::sink())?;

    Ok(entries)
}
