//! Authenticated access to a user's YouTube channel.
//!
//! A session starts out as [`Unauthenticated`], which only knows where the OAuth client secrets
//! live. [`Unauthenticated::authenticate`] consumes it and yields an [`Authenticated`] session
//! holding a [`Client`]; the remote operations only exist on the latter.
//!
//! All network work goes through two capabilities:
//!
//! - an [`Authenticator`], which runs the interactive consent flow and hands back a client, and
//! - a [`Client`], which performs `list` queries and resumable uploads.
//!
//! [`crate::oauth::InstalledAppAuthenticator`] and [`crate::youtube_api::YouTubeClient`] are the
//! implementations used against the real service.

use crate::error::Error;
use crate::oauth::ClientSecrets;
use crate::youtube_api::channels::{Channel, ChannelStatistics};
use crate::youtube_api::search::SearchResult;
use crate::youtube_api::types::{ListRequest, ListResponse};
use crate::youtube_api::upload::{ChunkOutcome, UploadProgress};
use crate::youtube_api::videos::{
    DEFAULT_CATEGORY_ID, PrivacyStatus, Video, VideoInsert, VideoSnippet, VideoStatus,
};
use eyre::Context;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Permission to upload videos.
pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// Permission to read the account's channel and videos.
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// The scopes every session asks for.
pub const SCOPES: [&str; 2] = [UPLOAD_SCOPE, READONLY_SCOPE];

/// Default cap on the number of videos returned by [`Authenticated::list_videos`].
pub const DEFAULT_MAX_RESULTS: u32 = 50;

/// Obtains an authorized [`Client`] from the user.
pub trait Authenticator {
    type Client: Client;

    /// Asks the user to grant `scopes` to the application described by `secrets`.
    ///
    /// This may open a browser and listen on a local port for the OAuth redirect. Invalid
    /// secrets or a refused consent are reported as [`Error::Credential`].
    fn run_interactive_consent(
        &self,
        secrets: &ClientSecrets,
        scopes: &[&str],
    ) -> impl Future<Output = eyre::Result<Self::Client>>;
}

/// Authorized access to the YouTube Data API.
pub trait Client {
    type Upload: UploadTransfer;

    /// Starts a resumable upload of the file at `media`, described by `metadata`.
    fn begin_upload(
        &self,
        metadata: &VideoInsert,
        media: &Path,
    ) -> impl Future<Output = eyre::Result<Self::Upload>>;

    /// Runs a single, unpaginated `list` query.
    fn list<T>(&self, request: &ListRequest) -> impl Future<Output = eyre::Result<ListResponse<T>>>
    where
        T: DeserializeOwned;
}

/// An upload in progress, advanced one chunk at a time.
pub trait UploadTransfer {
    /// Sends the next chunk and reports what the server made of it.
    fn next_chunk(&mut self) -> impl Future<Output = eyre::Result<ChunkOutcome>>;
}

/// A video to upload, with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub privacy_status: PrivacyStatus,
    pub tags: Vec<String>,
}

impl UploadRequest {
    /// A private, untagged upload.
    pub fn new(
        file_path: impl Into<PathBuf>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            title: title.into(),
            description: description.into(),
            privacy_status: PrivacyStatus::default(),
            tags: Vec::new(),
        }
    }

    pub fn privacy_status(mut self, privacy_status: PrivacyStatus) -> Self {
        self.privacy_status = privacy_status;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The `videos.insert` body for this upload.
    ///
    /// The category is always "People & Blogs" and the video is never declared as made for kids.
    pub fn to_insert(&self) -> VideoInsert {
        VideoInsert {
            snippet: VideoSnippet {
                title: self.title.clone(),
                description: self.description.clone(),
                tags: self.tags.clone(),
                category_id: DEFAULT_CATEGORY_ID.to_string(),
                other: Default::default(),
            },
            status: VideoStatus {
                privacy_status: self.privacy_status,
                self_declared_made_for_kids: false,
                other: Default::default(),
            },
        }
    }
}

/// A session that has not been authorized yet.
#[derive(Debug, Clone)]
pub struct Unauthenticated {
    secrets_path: PathBuf,
}

impl Unauthenticated {
    /// A session that will read its OAuth client secrets from `secrets_path`.
    pub fn new(secrets_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
        }
    }

    pub fn secrets_path(&self) -> &Path {
        &self.secrets_path
    }

    /// Loads the client secrets and runs the authenticator's consent flow for [`SCOPES`].
    ///
    /// Fails with [`Error::Credential`] if the secrets file is missing or malformed, in which
    /// case the authenticator is never invoked.
    #[tracing::instrument(skip_all, fields(secrets = %self.secrets_path.display()))]
    pub async fn authenticate<A>(self, authenticator: &A) -> eyre::Result<Authenticated<A::Client>>
    where
        A: Authenticator,
    {
        let secrets = ClientSecrets::from_file(&self.secrets_path).await?;
        let client = authenticator
            .run_interactive_consent(&secrets, &SCOPES)
            .await
            .context("authorize access to YouTube")?;
        tracing::info!("authenticated to YouTube");
        Ok(Authenticated::new(client))
    }
}

/// The line [`Authenticated::upload_video`] prints for each acknowledged chunk.
pub fn progress_line(progress: &UploadProgress) -> String {
    format!("Upload progress: {progress}")
}

/// A session with an authorized [`Client`].
#[derive(Debug, Clone)]
pub struct Authenticated<C> {
    client: C,
}

impl<C: Client> Authenticated<C> {
    /// Wraps a client that is already authorized.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Uploads a video, printing `Upload progress: N%` to stdout after every chunk.
    ///
    /// Returns the created video resource.
    pub async fn upload_video(&self, request: UploadRequest) -> eyre::Result<Video> {
        let print = |progress: &UploadProgress| println!("{}", progress_line(progress));
        self.upload_video_with_progress(request, print).await
    }

    /// Uploads a video, calling `on_progress` after every chunk the server acknowledges.
    ///
    /// Fails with [`Error::FileNotFound`] without contacting YouTube if `request.file_path` is
    /// not an existing file. Chunks are sent one at a time until the server reports completion;
    /// a failed chunk aborts the upload.
    #[tracing::instrument(skip_all, fields(file = %request.file_path.display()))]
    pub async fn upload_video_with_progress<F>(
        &self,
        request: UploadRequest,
        mut on_progress: F,
    ) -> eyre::Result<Video>
    where
        F: FnMut(&UploadProgress),
    {
        let is_file = tokio::fs::metadata(&request.file_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(Error::FileNotFound(request.file_path).into());
        }

        let metadata = request.to_insert();
        let mut transfer = self
            .client
            .begin_upload(&metadata, &request.file_path)
            .await
            .context("start video upload")?;

        loop {
            match transfer.next_chunk().await.context("upload video")? {
                ChunkOutcome::Progress(progress) => {
                    tracing::debug!(percent = progress.percent(), "upload progress");
                    on_progress(&progress);
                }
                ChunkOutcome::Complete(video) => {
                    tracing::info!(video_id = video.id, "video uploaded");
                    return Ok(video);
                }
            }
        }
    }

    /// Statistics of the authenticated user's channel.
    ///
    /// A user without a channel gets an empty record rather than an error.
    #[tracing::instrument(skip(self))]
    pub async fn get_channel_stats(&self) -> eyre::Result<ChannelStatistics> {
        let request = ListRequest::new("channels", "statistics").filter("mine", "true");
        let response: ListResponse<Channel> = self
            .client
            .list(&request)
            .await
            .context("fetch channel statistics")?;

        let Some(channel) = response.items.into_iter().next() else {
            tracing::debug!("no channel found");
            return Ok(ChannelStatistics::default());
        };
        Ok(channel.statistics.unwrap_or_default())
    }

    /// Up to `max_results` of the authenticated user's videos, in the order YouTube returns them.
    ///
    /// Only the first page of results is fetched.
    #[tracing::instrument(skip(self))]
    pub async fn list_videos(&self, max_results: u32) -> eyre::Result<Vec<SearchResult>> {
        let request = ListRequest::new("search", "snippet")
            .filter("forMine", "true")
            .filter("type", "video")
            .filter("maxResults", max_results.to_string());
        let response: ListResponse<SearchResult> =
            self.client.list(&request).await.context("list videos")?;
        Ok(response.items)
    }
}
