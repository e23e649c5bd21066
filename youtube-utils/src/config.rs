//! Command-line and environment configuration for the example binary.

use crate::oauth::InstalledAppAuthenticator;
use crate::session::{Unauthenticated, UploadRequest};
use crate::youtube_api::videos::PrivacyStatus;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// Print your YouTube channel's statistics and most recent uploads, optionally uploading a video
/// first.
#[derive(Debug, Clone, Parser)]
#[command(name = "youtube-utils", version)]
pub struct Config {
    /// OAuth client secrets downloaded from the Google Cloud console.
    #[arg(
        long,
        env = "YOUTUBE_CLIENT_SECRETS",
        default_value = "client_secrets.json"
    )]
    pub client_secrets: PathBuf,

    /// Where to keep the OAuth token between runs. Without it, every run asks for consent.
    #[arg(long, env = "YOUTUBE_TOKEN_CACHE")]
    pub token_cache: Option<PathBuf>,

    /// How many recent videos to list.
    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..=50)
    )]
    pub max_results: u32,

    /// Video file to upload before printing the summary.
    #[arg(long, value_name = "FILE")]
    pub upload: Option<PathBuf>,

    /// Title of the uploaded video. Defaults to the file name without its extension.
    #[arg(long, requires = "upload")]
    pub title: Option<String>,

    /// Description of the uploaded video.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Who can see the uploaded video: private, unlisted or public.
    #[arg(long, default_value_t, value_parser = PrivacyStatus::from_str)]
    pub privacy_status: PrivacyStatus,

    /// Tag for the uploaded video. Repeat for more than one.
    #[arg(long = "tag", value_name = "TAG", requires = "upload")]
    pub tags: Vec<String>,
}

impl Config {
    /// A session reading its client secrets from the configured path.
    pub fn session(&self) -> Unauthenticated {
        Unauthenticated::new(&self.client_secrets)
    }

    /// The browser-based authenticator, with the token cache if one is configured.
    pub fn authenticator(&self) -> InstalledAppAuthenticator {
        match &self.token_cache {
            Some(path) => InstalledAppAuthenticator::new().with_token_cache(path),
            None => InstalledAppAuthenticator::new(),
        }
    }

    /// The upload asked for with `--upload`, if any.
    pub fn upload_request(&self) -> Option<UploadRequest> {
        let path = self.upload.as_ref()?;
        let title = match &self.title {
            Some(title) => title.clone(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let request = UploadRequest::new(path, title, &self.description)
            .privacy_status(self.privacy_status)
            .tags(&self.tags);
        Some(request)
    }
}
