//! Error kinds raised by this crate.
//!
//! Operations return [`eyre::Result`] so that every failure carries context about what was being
//! attempted. The failures a caller may want to tell apart are raised as an [`Error`] inside that
//! report; use [`Error::find`] to recover it.

use std::path::PathBuf;

/// Failures raised locally or reported by the YouTube platform.
///
/// There is deliberately no "unauthenticated" kind: remote operations only exist on
/// [`crate::session::Authenticated`], so calling them before authenticating does not compile.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The video to upload does not exist (or is not a regular file).
    ///
    /// Raised before any request is made.
    #[error("video file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The OAuth client secrets are missing or malformed, or the user did not grant access.
    #[error("credential error: {message}")]
    Credential { message: String },

    /// The YouTube API answered with a non-success status.
    #[error("YouTube API request failed with status {status}: {body}")]
    Remote {
        status: http::StatusCode,
        body: String,
    },

    /// A privacy status other than `private`, `unlisted` or `public`.
    #[error("invalid privacy status {0:?} (expected private, unlisted or public)")]
    InvalidPrivacyStatus(String),
}

impl Error {
    pub(crate) fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
        }
    }

    /// Finds the [`Error`] somewhere in the chain of `report`, if there is one.
    pub fn find(report: &eyre::Report) -> Option<&Self> {
        report
            .chain()
            .find_map(|cause| cause.downcast_ref::<Self>())
    }
}
