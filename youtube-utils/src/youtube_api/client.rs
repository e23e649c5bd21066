//! Core YouTube API client functionality and authentication management.

use crate::error::Error;
use crate::oauth::OAuthManager;
use crate::session::Client;
use crate::youtube_api::types::{ListRequest, ListResponse};
use crate::youtube_api::upload::{self, ResumableUpload};
use crate::youtube_api::videos::{INSERT_PARTS, VideoInsert};
use eyre::Context;
use http::Method;
use http::header::{AUTHORIZATION, LOCATION};
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::instrument;

/// Base URL of the YouTube Data API v3.
pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Base URL for media uploads to the YouTube Data API v3.
pub const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    /// The current OAuth2 token
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Creates a token that is already expired, forcing a refresh before first use.
    ///
    /// This is useful when loading tokens from storage where you want to ensure
    /// they are validated before use.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Creates a token with calculated expiry time.
    ///
    /// The expiry time is calculated from the token's `expires_in` field minus
    /// a 5-minute safety buffer to prevent edge-case failures.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Refreshes this token using the provided OAuth manager, preserving the refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token was successfully refreshed
    /// * `Ok(false)` - Refresh failed (invalid grant, no refresh token, etc.)
    /// * `Err(_)` - Network or other error occurred
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match oauth_manager
            .refresh_token(self.token.clone())
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                self.replace(new_token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Swaps in a freshly issued token.
    ///
    /// Google usually leaves the refresh token out of refresh responses, in which case the
    /// previous one is carried over.
    fn replace(&mut self, new_token: BasicTokenResponse) {
        let old_token = std::mem::replace(&mut self.token, new_token);

        if self.token.refresh_token().is_none() {
            tracing::trace!("new token lacks refresh token, preserving original");
            self.token
                .set_refresh_token(old_token.refresh_token().cloned());
        } else {
            tracing::debug!("new token includes refresh token");
        }

        self.expires_at = Self::calculate_token_expiry(&self.token);
    }

    /// Calculates when a token should be considered expired based on its expires_in field.
    ///
    /// Uses the current time + expires_in duration - 5 minute safety buffer.
    /// If no expires_in is provided, assumes a conservative 55-minute lifetime.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        if let Some(expires_in) = token.expires_in() {
            now + expires_in.saturating_sub(Duration::from_secs(300)) // 5 minute buffer
        } else {
            now + Duration::from_secs(3300) // 55 minutes
        }
    }
}

/// Client for interacting with the YouTube Data API v3.
///
/// This client wraps an OAuth2 token and provides the calls needed to upload videos and read
/// channel data. All API calls require a valid OAuth2 access token with appropriate scopes.
///
/// The client automatically refreshes expired access tokens before API calls using the stored
/// refresh token and OAuth manager. Token expiry is tracked based on the `expires_in` field
/// from the OAuth response, with a safety buffer to prevent edge-case failures.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    /// The current OAuth2 token.
    token: Arc<Mutex<TimeBoundAccessToken>>,
    /// OAuth manager for refreshing tokens (shared across clients)
    oauth_manager: Arc<OAuthManager>,
    /// HTTP client for API requests
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    /// Bytes per resumable upload chunk
    chunk_size: u64,
}

impl YouTubeClient {
    /// Creates a new YouTube API client with the provided OAuth2 token, OAuth manager, and HTTP client.
    ///
    /// # Arguments
    ///
    /// * `token` - The [`TimeBoundAccessToken`] to authorize requests with
    /// * `oauth_manager` - Shared OAuth manager for token refresh operations
    /// * `client` - Shared HTTP client for making API requests; it must not follow redirects
    ///   (see [`crate::http_client`])
    pub fn new(
        token: TimeBoundAccessToken,
        oauth_manager: Arc<OAuthManager>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager,
            client,
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
            chunk_size: upload::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Points the client at different API and upload base URLs.
    pub fn with_endpoints(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    /// Sets how many bytes each resumable upload chunk carries.
    ///
    /// The size is rounded up to a multiple of 256 KiB, as the upload protocol requires.
    pub fn with_upload_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = upload::normalize_chunk_size(bytes);
        self
    }

    /// Returns a clone of the underlying OAuth2 token.
    ///
    /// This is useful when you need to extract the token for storage.
    pub async fn token(&self) -> BasicTokenResponse {
        self.token.lock().await.token.clone()
    }

    /// Gets a guaranteed-fresh access token, refreshing if necessary.
    ///
    /// This method is called automatically before each API request to ensure the token
    /// is valid. It checks if the token expires within the safety buffer and refreshes
    /// it if needed.
    #[instrument(skip(self))]
    pub(crate) async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            tracing::debug!("access token expired, attempting refresh");

            if token.refresh(&self.oauth_manager).await? {
                tracing::debug!("access token successfully refreshed");
            } else {
                tracing::error!("access token refresh failed, client is unusable");
                return Err(Error::credential("unable to refresh expired access token").into());
            }
        }

        Ok(token.token.access_token().secret().to_string())
    }

    /// Starts a request carrying a fresh bearer token.
    pub(crate) async fn authorized_request(
        &self,
        method: Method,
        url: &str,
    ) -> eyre::Result<reqwest::RequestBuilder> {
        let access_token = self.fresh_access_token().await?;
        Ok(self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token)))
    }

    /// Makes an authenticated HTTP request to the YouTube API with common error handling.
    ///
    /// This method consolidates the shared logic across YouTube API requests:
    /// - Token freshness validation and refresh
    /// - Authorization header setup
    /// - Query parameters
    /// - JSON body (for requests that need a body)
    /// - Status code validation; non-success statuses become [`Error::Remote`]
    ///
    /// # Returns
    ///
    /// The raw [`reqwest::Response`] for method-specific parsing.
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    pub(crate) async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: Option<&[(&str, &str)]>,
        json_body: Option<&impl Serialize>,
    ) -> eyre::Result<reqwest::Response> {
        let mut request = self.authorized_request(method.clone(), url).await?;

        if let Some(params) = query_params {
            request = request.query(params);
        }

        // reqwest sets the JSON content type for us
        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))?;

        if !response.status().is_success() {
            let report = remote_error(response).await;
            return Err(report.wrap_err(format!("YouTube API {} {}", method, url)));
        }

        Ok(response)
    }
}

/// Turns a non-success response into an [`Error::Remote`] carrying the response body.
pub(crate) async fn remote_error(response: reqwest::Response) -> eyre::Report {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Error::Remote { status, body }.into()
}

impl Client for YouTubeClient {
    type Upload = ResumableUpload;

    /// Initiates a resumable upload session for `media` with the given metadata.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.upload`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/insert>
    #[instrument(skip(self, metadata))]
    async fn begin_upload(
        &self,
        metadata: &VideoInsert,
        media: &Path,
    ) -> eyre::Result<ResumableUpload> {
        let file = tokio::fs::File::open(media)
            .await
            .with_context(|| format!("open video file {}", media.display()))?;
        let total_size = file
            .metadata()
            .await
            .context("read video file metadata")?
            .len();

        let url = format!("{}/videos", self.upload_base);
        let request = self
            .authorized_request(Method::POST, &url)
            .await?
            .query(&[("uploadType", "resumable"), ("part", INSERT_PARTS)])
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", total_size)
            .json(metadata);

        let response = request.send().await.context("initiate resumable upload")?;
        if !response.status().is_success() {
            let report = remote_error(response).await;
            return Err(report.wrap_err("initiate resumable upload"));
        }

        let session_uri = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| eyre::eyre!("no Location header in resumable upload response"))?
            .to_str()
            .context("resumable upload Location header is not text")?
            .to_string();

        tracing::debug!(total_size, "started resumable upload");

        Ok(ResumableUpload::new(
            self.clone(),
            session_uri,
            file,
            total_size,
            self.chunk_size,
        ))
    }

    /// Calls one of the `*.list` endpoints and returns its first page.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.readonly`
    ///
    /// # API Reference
    ///
    /// * <https://developers.google.com/youtube/v3/docs/channels/list>
    /// * <https://developers.google.com/youtube/v3/docs/search/list>
    #[instrument(skip(self))]
    async fn list<T>(&self, request: &ListRequest) -> eyre::Result<ListResponse<T>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base, request.resource);
        let query_params = request.query_params();

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let list: ListResponse<T> = response
            .json()
            .await
            .with_context(|| format!("parse YouTube {} API response as JSON", request.resource))?;

        tracing::debug!(
            resource = request.resource,
            total_results = list.page_info.as_ref().map(|p| p.total_results),
            returned_items = list.items.len(),
            "fetched list"
        );

        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::{ClientSecrets, OAUTH_DONE};
    use crate::session::UploadTransfer;
    use crate::youtube_api::channels::Channel;
    use crate::youtube_api::upload::{CHUNK_GRANULARITY, ChunkOutcome, UploadProgress};
    use crate::youtube_api::videos::{PrivacyStatus, VideoSnippet, VideoStatus};
    use oauth2::basic::BasicTokenType;
    use oauth2::{AccessToken, EmptyExtraTokenFields};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn raw_token() -> BasicTokenResponse {
        let mut token = BasicTokenResponse::new(
            AccessToken::new("test-access".to_string()),
            BasicTokenType::Bearer,
            EmptyExtraTokenFields {},
        );
        token.set_expires_in(Some(&Duration::from_secs(3600)));
        token
    }

    fn client_with_token(server: &MockServer, token: TimeBoundAccessToken) -> YouTubeClient {
        let secrets = ClientSecrets::from_json(r#"{"installed": {"client_id": "abc"}}"#).unwrap();
        YouTubeClient::new(
            token,
            Arc::new(OAuthManager::new(secrets, OAUTH_DONE)),
            crate::http_client().unwrap(),
        )
        .with_endpoints(
            format!("{}/youtube/v3", server.uri()),
            format!("{}/upload/youtube/v3", server.uri()),
        )
    }

    fn client(server: &MockServer) -> YouTubeClient {
        client_with_token(server, TimeBoundAccessToken::new(raw_token()))
    }

    fn insert() -> VideoInsert {
        VideoInsert {
            snippet: VideoSnippet {
                title: "t".to_string(),
                description: "d".to_string(),
                tags: vec![],
                category_id: "22".to_string(),
                other: Default::default(),
            },
            status: VideoStatus {
                privacy_status: PrivacyStatus::Private,
                self_declared_made_for_kids: false,
                other: Default::default(),
            },
        }
    }

    #[test]
    fn token_expiry() {
        assert!(!TimeBoundAccessToken::new(raw_token()).is_expired());
        assert!(TimeBoundAccessToken::expired(raw_token()).is_expired());

        let mut short_lived = raw_token();
        short_lived.set_expires_in(Some(&Duration::from_secs(60)));
        assert!(TimeBoundAccessToken::new(short_lived).is_expired());
    }

    #[test]
    fn replaced_token_keeps_refresh_token() {
        let mut original = raw_token();
        original.set_refresh_token(Some(oauth2::RefreshToken::new("refresh".to_string())));
        let mut token = TimeBoundAccessToken::expired(original);

        token.replace(raw_token());

        assert!(!token.is_expired());
        let refresh = token.raw_token().refresh_token();
        assert_eq!(refresh.map(|t| t.secret().as_str()), Some("refresh"));
    }

    #[tokio::test]
    async fn list_sends_part_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/channels"))
            .and(query_param("part", "statistics"))
            .and(query_param("mine", "true"))
            .and(header("authorization", "Bearer test-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "youtube#channelListResponse",
                "pageInfo": { "totalResults": 1, "resultsPerPage": 5 },
                "items": [{ "id": "UC1", "statistics": { "viewCount": "100" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response: ListResponse<Channel> = client(&server)
            .list(&ListRequest::new("channels", "statistics").filter("mine", "true"))
            .await
            .unwrap();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].id.as_deref(), Some("UC1"));
        assert_eq!(
            response.items[0]
                .statistics
                .as_ref()
                .and_then(|s| s.view_count.as_deref()),
            Some("100")
        );
    }

    #[tokio::test]
    async fn list_failure_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let err = client(&server)
            .list::<serde_json::Value>(&ListRequest::new("search", "snippet"))
            .await
            .unwrap_err();

        match Error::find(&err) {
            Some(Error::Remote { status, body }) => {
                assert_eq!(*status, http::StatusCode::FORBIDDEN);
                assert_eq!(body, "quotaExceeded");
            }
            other => panic!("unexpected error {other:?}: {err:?}"),
        }
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_with_token(&server, TimeBoundAccessToken::expired(raw_token()));
        let err = client
            .list::<serde_json::Value>(&ListRequest::new("channels", "statistics"))
            .await
            .unwrap_err();

        assert!(matches!(Error::find(&err), Some(Error::Credential { .. })));
    }

    #[tokio::test]
    async fn resumable_upload_in_chunks() {
        let server = MockServer::start().await;
        let session_uri = format!("{}/upload-session/1", server.uri());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![7u8; 300_000]).unwrap();
        let started = ResponseTemplate::new(200)
            .insert_header("Location", session_uri.as_str());

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "resumable"))
            .and(query_param("part", "snippet,status"))
            .and(header("X-Upload-Content-Type", "video/*"))
            .and(header("X-Upload-Content-Length", "300000"))
            .and(body_json(insert()))
            .respond_with(started)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/1"))
            .and(header("Content-Range", "bytes 0-262143/300000"))
            .respond_with(ResponseTemplate::new(308).insert_header("Range", "bytes=0-262143"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/1"))
            .and(header("Content-Range", "bytes 262144-299999/300000"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "kind": "youtube#video",
                "id": "abc123",
                "status": { "uploadStatus": "uploaded", "privacyStatus": "private" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).with_upload_chunk_size(CHUNK_GRANULARITY);
        let mut transfer = client.begin_upload(&insert(), file.path()).await.unwrap();
        assert_eq!(transfer.session_uri(), session_uri);

        assert_eq!(
            transfer.next_chunk().await.unwrap(),
            ChunkOutcome::Progress(UploadProgress {
                resumable_progress: 262_144,
                total_size: 300_000,
            })
        );
        let ChunkOutcome::Complete(video) = transfer.next_chunk().await.unwrap() else {
            panic!("upload should be complete");
        };
        assert_eq!(video.id, "abc123");
        assert_eq!(
            video.status.map(|s| s.privacy_status),
            Some(PrivacyStatus::Private)
        );
    }

    #[tokio::test]
    async fn chunk_rejected_by_server() {
        let server = MockServer::start().await;
        let session_uri = format!("{}/upload-session/2", server.uri());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"tiny").unwrap();
        let started = ResponseTemplate::new(200)
            .insert_header("Location", session_uri.as_str());

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(started)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload-session/2"))
            .and(header("Content-Range", "bytes 0-3/4"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backendError"))
            .mount(&server)
            .await;

        let mut transfer = client(&server)
            .begin_upload(&insert(), file.path())
            .await
            .unwrap();
        let err = transfer.next_chunk().await.unwrap_err();

        assert!(matches!(
            Error::find(&err),
            Some(Error::Remote { status, .. }) if *status == http::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn upload_initiation_without_location() {
        let server = MockServer::start().await;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"tiny").unwrap();

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client(&server)
            .begin_upload(&insert(), file.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Location"));
    }

    #[tokio::test]
    async fn upload_initiation_rejected() {
        let server = MockServer::start().await;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"tiny").unwrap();

        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(401).set_body_string("authError"))
            .mount(&server)
            .await;

        let err = client(&server)
            .begin_upload(&insert(), file.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "initiate resumable upload");
        match Error::find(&err) {
            Some(Error::Remote { status, body }) => {
                assert_eq!(*status, http::StatusCode::UNAUTHORIZED);
                assert_eq!(body, "authError");
            }
            other => panic!("unexpected error {other:?}: {err:?}"),
        }
    }
}
