//! OAuth 2.0 management for YouTube API authentication.
//!
//! This module encapsulates all OAuth-related operations for authenticating with the YouTube API:
//! loading the client secrets downloaded from the Google Cloud console, the installed-app
//! authorization flow with a loopback redirect, and token refresh.

use crate::error::Error;
use crate::session::Authenticator;
use crate::youtube_api::client::{TimeBoundAccessToken, YouTubeClient};
use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    Scope, TokenUrl,
};
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Google OAuth2 authorization endpoint, used when the secrets file doesn't name one.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth2 token endpoint, used when the secrets file doesn't name one.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Page shown in the user's browser once the redirect has been received.
pub const OAUTH_DONE: &str = include_str!("../oauth_success.html");

/// The OAuth client an application registered in the Google Cloud console.
///
/// Parsed from the `client_secrets.json` file the console lets you download, which wraps these
/// fields in an `installed` (desktop app) or `web` object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    /// Installed applications embed this, so it is not actually secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URL.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses the contents of a `client_secrets.json` file.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| Error::credential(format!("malformed client secrets: {e}")))?;
        file.installed.or(file.web).ok_or_else(|| {
            Error::credential("client secrets have no \"installed\" or \"web\" client")
        })
    }

    /// Reads and parses a `client_secrets.json` file.
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::credential(format!("read client secrets {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

/// Manages OAuth 2.0 authentication flows for YouTube API access.
///
/// The OAuthManager encapsulates all OAuth operations, providing a consistent interface
/// for both initial user authentication and token refresh operations. It maintains
/// the OAuth client configuration and handles the security aspects of the authorization flow.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    secrets: ClientSecrets,
    oauth_done_html: &'static str,
}

impl OAuthManager {
    /// Creates a new OAuth manager for the given client.
    ///
    /// # Arguments
    ///
    /// * `secrets` - The OAuth client registered for this application
    /// * `oauth_done_html` - HTML content to display after successful authorization
    pub fn new(secrets: ClientSecrets, oauth_done_html: &'static str) -> Self {
        Self {
            secrets,
            oauth_done_html,
        }
    }

    fn client_id(&self) -> ClientId {
        ClientId::new(self.secrets.client_id.clone())
    }

    fn client_secret(&self) -> Option<ClientSecret> {
        self.secrets.client_secret.clone().map(ClientSecret::new)
    }

    fn token_url(&self) -> Result<TokenUrl, Error> {
        TokenUrl::new(self.secrets.token_uri.clone())
            .map_err(|e| Error::credential(format!("invalid token_uri: {e}")))
    }

    /// Performs a complete OAuth 2.0 authorization flow to obtain a new access token.
    ///
    /// This method initiates the full OAuth flow, including:
    /// 1. Setting up a local HTTP server to receive the authorization callback
    /// 2. Opening the user's browser for authorization
    /// 3. Exchanging the authorization code for an access token
    ///
    /// Malformed endpoints, a refused consent and a rejected code exchange all fail with
    /// [`Error::Credential`].
    pub async fn authenticate(&self, scopes: &[&str]) -> eyre::Result<BasicTokenResponse> {
        let auth_url = AuthUrl::new(self.secrets.auth_uri.clone())
            .map_err(|e| Error::credential(format!("invalid auth_uri: {e}")))?;
        let token_url = self.token_url()?;

        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let client = BasicClient::new(self.client_id())
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);
        let client = match self.client_secret() {
            Some(secret) => client.set_client_secret(secret),
            None => client,
        };

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // We never re-use the CSRF since we only go through the flow exactly once.
            .authorize_url(move || csrf.clone())
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            // the user can still open the link by hand
            tracing::warn!("could not open browser: {e}");
            eprintln!("Please visit this URL to authorize this application: {auth_url}");
        }
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let http_client = crate::http_client()?;
        let token_result = match client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
        {
            Ok(token) => token,
            Err(oauth2::RequestTokenError::ServerResponse(sr)) => {
                return Err(Error::credential(format!(
                    "authorization code rejected: {}",
                    sr.error()
                ))
                .into());
            }
            Err(e) => return Err(e).context("exchange authorization code with access token"),
        };

        Ok(token_result)
    }

    /// Attempts to refresh an existing OAuth token using its refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - Refresh succeeded, new token is available
    /// * `Ok(None)` - Refresh failed or no refresh token available
    /// * `Err(_)` - Network or other error occurred during refresh attempt
    ///
    /// When refresh fails, the token should be considered invalid and the user
    /// should be prompted to re-authenticate using [`Self::authenticate`].
    pub async fn refresh_token(
        &self,
        token: BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        use oauth2::TokenResponse;

        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");

        // Create a minimal OAuth client for token refresh (no redirect URL needed)
        let client = BasicClient::new(self.client_id()).set_token_uri(self.token_url()?);
        let client = match self.client_secret() {
            Some(secret) => client.set_client_secret(secret),
            None => client,
        };

        let http_client = crate::http_client()?;

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&http_client)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    /// Sets up a local HTTP server to receive the OAuth authorization callback.
    ///
    /// Creates a temporary HTTP server on a random local port to handle the OAuth
    /// redirect after user authorization. The server validates the CSRF token and
    /// extracts the authorization code from the callback.
    ///
    /// # Returns
    ///
    /// A tuple containing:
    /// - The redirect URL to use in the OAuth flow
    /// - A future that resolves to the authorization code when the callback is received
    async fn setup_redirect(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind to localhost")?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let oauth_done = self.oauth_done_html;
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let mut presented_state = None;
                        let mut presented_code = None;
                        let mut presented_error = None;
                        for (k, v) in
                            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                        {
                            match &*k {
                                "state" => presented_state = Some(v),
                                "code" => presented_code = Some(v),
                                "error" => presented_error = Some(v),
                                _ => {}
                            }
                        }
                        if presented_state.as_deref() != Some(csrf.secret().as_str()) {
                            return Err("invalid csrf token");
                        }
                        let outcome = match (presented_code, presented_error) {
                            (_, Some(error)) => Err(error.into_owned()),
                            (Some(code), None) => Ok(AuthorizationCode::new(code.into_owned())),
                            (None, None) => return Err("no authorization code found"),
                        };
                        let page = if outcome.is_ok() {
                            oauth_done
                        } else {
                            "Authorization was not granted. You can close this window."
                        };
                        // the receiver only goes away once the connection is being torn down
                        let _ = got.send(outcome).await;
                        Ok(Response::new(Full::<Bytes>::from(page)))
                    }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exit prematurely");
                        }
                    }
                    outcome = gotten.recv() => {
                        serve.as_mut().graceful_shutdown();
                        // let the response page reach the browser
                        let _ = serve.await;
                        match outcome {
                            Some(Ok(code)) => Ok(code),
                            Some(Err(error)) => {
                                let message = format!("user did not grant access: {error}");
                                Err(Error::credential(message).into())
                            }
                            None => eyre::bail!("redirect handler went away"),
                        }
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}

/// Authenticates through the browser-based installed-app flow.
///
/// If a token cache is configured and holds a token from an earlier run, that token is
/// refreshed instead of asking the user again; when the refresh is rejected the user goes
/// through consent as usual. Whatever token ends up being used is written back to the cache.
#[derive(Debug, Clone, Default)]
pub struct InstalledAppAuthenticator {
    token_cache: Option<PathBuf>,
}

impl InstalledAppAuthenticator {
    /// An authenticator that asks the user for consent every time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers tokens in `path` between runs.
    pub fn with_token_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_cache = Some(path.into());
        self
    }

    async fn load_cached_token(&self) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(path) = &self.token_cache else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(path)
            .await
            .with_context(|| format!("check for token cache {}", path.display()))?
        {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read token cache {}", path.display()))?;
        match serde_json::from_str(&json) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable token cache: {e}");
                Ok(None)
            }
        }
    }

    async fn store_token(&self, token: &BasicTokenResponse) -> eyre::Result<()> {
        let Some(path) = &self.token_cache else {
            return Ok(());
        };
        let json = serde_json::to_string(token).context("serialize OAuth token")?;

        // the cache holds a refresh token, so only the owner may read it
        let mut staged = path.clone().into_os_string();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&staged)
            .await
            .with_context(|| format!("create token cache {}", staged.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // a leftover staging file keeps its old mode
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("restrict token cache {}", staged.display()))?;
        }
        file.write_all(json.as_bytes())
            .await
            .with_context(|| format!("write token cache {}", staged.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("flush token cache {}", staged.display()))?;
        drop(file);

        tokio::fs::rename(&staged, path)
            .await
            .with_context(|| format!("replace token cache {}", path.display()))
    }
}

impl Authenticator for InstalledAppAuthenticator {
    type Client = YouTubeClient;

    async fn run_interactive_consent(
        &self,
        secrets: &ClientSecrets,
        scopes: &[&str],
    ) -> eyre::Result<YouTubeClient> {
        let oauth_manager = OAuthManager::new(secrets.clone(), OAUTH_DONE);

        let token = match self.load_cached_token().await? {
            Some(cached) => {
                tracing::info!("refreshing cached token");
                let mut token = TimeBoundAccessToken::expired(cached);
                if token
                    .refresh(&oauth_manager)
                    .await
                    .context("refresh cached token")?
                {
                    token
                } else {
                    tracing::warn!("cached token refresh failed, getting new token via full OAuth");
                    TimeBoundAccessToken::new(oauth_manager.authenticate(scopes).await?)
                }
            }
            None => TimeBoundAccessToken::new(oauth_manager.authenticate(scopes).await?),
        };

        self.store_token(token.raw_token()).await?;

        Ok(YouTubeClient::new(
            token,
            Arc::new(oauth_manager),
            crate::http_client()?,
        ))
    }
}
