//! Upload videos to YouTube, read the authenticated channel's statistics and list its recent
//! uploads.
//!
//! The entry point is [`session::Unauthenticated`], which turns into a
//! [`session::Authenticated`] once the user has gone through the OAuth installed-app flow:
//!
//! ```rust,no_run
//! use youtube_utils::oauth::InstalledAppAuthenticator;
//! use youtube_utils::session::{Unauthenticated, UploadRequest};
//!
//! # async fn example() -> eyre::Result<()> {
//! let yt = Unauthenticated::new("client_secrets.json")
//!     .authenticate(&InstalledAppAuthenticator::new())
//!     .await?;
//!
//! let stats = yt.get_channel_stats().await?;
//! println!("views: {:?}", stats.view_count);
//!
//! let video = yt
//!     .upload_video(UploadRequest::new("holiday.mp4", "Holiday", "Two weeks in one minute"))
//!     .await?;
//! println!("uploaded {}", video.id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod youtube_api;

#[cfg(test)]
mod mock;

pub use error::Error;

/// Builds the HTTP client shared by the OAuth flow and the YouTube API client.
///
/// Redirects are never followed: the token endpoint has no business redirecting us, and the
/// resumable upload protocol signals "keep going" with a `308` that must reach the caller.
pub fn http_client() -> eyre::Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        // SSRF no thank you.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(eyre::Report::from)
}
