//! The resumable upload protocol used by `videos.insert`.
//!
//! An upload happens in two phases. [`YouTubeClient::begin_upload`] posts the video metadata and
//! receives a session URI in the `Location` header. The file is then sent to that URI as a
//! sequence of ranged `PUT`s, one chunk at a time, by [`ResumableUpload::next_chunk`]. While
//! bytes remain, the server answers `308 Resume Incomplete` with a `Range` header saying how much
//! it has persisted; the last chunk is answered with `200`/`201` and the created [`Video`].
//!
//! See: <https://developers.google.com/youtube/v3/guides/using_resumable_upload_protocol>

use crate::session::UploadTransfer;
use crate::youtube_api::client::{self, YouTubeClient};
use crate::youtube_api::videos::Video;
use eyre::Context;
use http::header::{CONTENT_RANGE, RANGE};
use http::{Method, StatusCode};
use std::fmt;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Chunks must be a multiple of this many bytes, except for the last one.
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

/// Default number of bytes sent per `PUT`.
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

/// How far along an upload is, as acknowledged by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes the server has persisted so far.
    pub resumable_progress: u64,
    /// Size of the whole file.
    pub total_size: u64,
}

impl UploadProgress {
    /// Fraction of the file uploaded, between 0.0 and 1.0.
    pub fn progress(&self) -> f64 {
        if self.total_size == 0 {
            return 1.0;
        }
        self.resumable_progress as f64 / self.total_size as f64
    }

    /// Whole percent uploaded, rounded down.
    pub fn percent(&self) -> u64 {
        if self.total_size == 0 {
            return 100;
        }
        self.resumable_progress.saturating_mul(100) / self.total_size
    }
}

impl fmt::Display for UploadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// What the server said after one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// More bytes are expected.
    Progress(UploadProgress),
    /// The upload is done and the video resource was created.
    Complete(Video),
}

/// An in-flight resumable upload of a local file.
#[derive(Debug)]
pub struct ResumableUpload {
    client: YouTubeClient,
    session_uri: String,
    file: tokio::fs::File,
    total_size: u64,
    offset: u64,
    chunk_size: u64,
}

impl ResumableUpload {
    pub(crate) fn new(
        client: YouTubeClient,
        session_uri: String,
        file: tokio::fs::File,
        total_size: u64,
        chunk_size: u64,
    ) -> Self {
        Self {
            client,
            session_uri,
            file,
            total_size,
            offset: 0,
            chunk_size,
        }
    }

    /// The URI the chunks are sent to.
    ///
    /// It stays valid for about a week and can be used to resume the upload from another process.
    pub fn session_uri(&self) -> &str {
        &self.session_uri
    }

    async fn read_chunk(&mut self) -> eyre::Result<Vec<u8>> {
        let len = self.chunk_size.min(self.total_size.saturating_sub(self.offset));
        self.file
            .seek(SeekFrom::Start(self.offset))
            .await
            .context("seek in video file")?;
        let mut buf = vec![0; usize::try_from(len).context("chunk does not fit in memory")?];
        self.file
            .read_exact(&mut buf)
            .await
            .context("read chunk from video file")?;
        Ok(buf)
    }
}

impl UploadTransfer for ResumableUpload {
    #[tracing::instrument(skip(self), fields(offset = self.offset, total = self.total_size))]
    async fn next_chunk(&mut self) -> eyre::Result<ChunkOutcome> {
        let chunk = self.read_chunk().await?;
        let range_header = content_range(self.offset, chunk.len() as u64, self.total_size);

        let response = self
            .client
            .authorized_request(Method::PUT, &self.session_uri)
            .await?
            .header(CONTENT_RANGE, &range_header)
            .body(chunk)
            .send()
            .await
            .with_context(|| format!("send video chunk ({range_header})"))?;

        let status = response.status();
        if status == StatusCode::PERMANENT_REDIRECT {
            let range = response
                .headers()
                .get(RANGE)
                .map(|v| v.to_str())
                .transpose()
                .context("Range header is not text")?;
            self.offset = persisted_bytes(range)?;
            tracing::debug!(persisted = self.offset, "chunk accepted");
            return Ok(ChunkOutcome::Progress(UploadProgress {
                resumable_progress: self.offset,
                total_size: self.total_size,
            }));
        }

        if !status.is_success() {
            return Err(client::remote_error(response).await);
        }

        let video: Video = response
            .json()
            .await
            .context("parse YouTube upload response as JSON")?;
        tracing::debug!(video_id = video.id, "upload complete");
        Ok(ChunkOutcome::Complete(video))
    }
}

/// `Content-Range` value for `len` bytes starting at `start` of a `total`-byte file.
fn content_range(start: u64, len: u64, total: u64) -> String {
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{}", start, start + len - 1, total)
    }
}

/// Number of bytes the server has persisted, given the `Range` header of a `308` response.
///
/// No header means nothing has been persisted yet.
fn persisted_bytes(range: Option<&str>) -> eyre::Result<u64> {
    let Some(range) = range else {
        return Ok(0);
    };
    let last = range
        .strip_prefix("bytes=")
        .and_then(|r| r.split_once('-'))
        .map(|(_, last)| last)
        .ok_or_else(|| eyre::eyre!("malformed Range header: {range}"))?;
    let last: u64 = last
        .trim()
        .parse()
        .with_context(|| format!("malformed Range header: {range}"))?;
    Ok(last + 1)
}

/// Rounds `size` up to a whole number of [`CHUNK_GRANULARITY`] units (and at least one).
pub(crate) fn normalize_chunk_size(size: u64) -> u64 {
    size.div_ceil(CHUNK_GRANULARITY).max(1) * CHUNK_GRANULARITY
}
