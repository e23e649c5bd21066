//! YouTube Data API v3 client library.
//!
//! [`YouTubeClient`] is the production implementation of [`crate::session::Client`]. It covers
//! exactly what the session needs:
//!
//! - `channels.list` and `search.list` through [`crate::session::Client::list`], returning the
//!   typed records in [`channels`] and [`search`],
//! - `videos.insert` through the resumable upload protocol in [`upload`], returning a
//!   [`videos::Video`].
//!
//! Every request carries a bearer token that is refreshed transparently when it is about to
//! expire; see [`TimeBoundAccessToken`].

pub mod channels;
pub mod client;
pub mod search;
pub mod types;
pub mod upload;
pub mod videos;

// Re-export main types for convenience
pub use client::{TimeBoundAccessToken, YouTubeClient};
pub use types::{ListRequest, ListResponse, PageInfo};

pub use channels::{Channel, ChannelStatistics};
pub use search::{SearchResult, SearchResultId, SearchResultSnippet};
pub use upload::{ChunkOutcome, ResumableUpload, UploadProgress};
pub use videos::{PrivacyStatus, Video, VideoInsert, VideoSnippet, VideoStatus};
