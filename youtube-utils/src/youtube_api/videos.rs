//! YouTube Videos API types.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Category every upload is filed under: "People & Blogs".
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// The field groups sent with (and echoed back by) `videos.insert`.
pub const INSERT_PARTS: &str = "snippet,status";

/// Who can see a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#status.privacyStatus>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Unlisted => "unlisted",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "unlisted" => Ok(Self::Unlisted),
            "public" => Ok(Self::Public),
            other => Err(Error::InvalidPrivacyStatus(other.to_string())),
        }
    }
}

/// Request body for `videos.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/insert>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInsert {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

/// Basic details about a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    /// The video's title.
    pub title: String,
    /// The video's description.
    #[serde(default)]
    pub description: String,
    /// Keyword tags associated with the video.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The YouTube video category associated with the video.
    #[serde(default)]
    pub category_id: String,
    /// Fields set by YouTube (`publishedAt`, `channelId`, `thumbnails`, ...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Upload, processing and privacy status of a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#status>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: PrivacyStatus,
    /// Whether the uploader designates the video as made for kids.
    #[serde(default)]
    pub self_declared_made_for_kids: bool,
    /// Fields set by YouTube (`uploadStatus`, `license`, `embeddable`, ...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A `video` resource, as returned once an upload completes.
///
/// `snippet` and `status` are echoed back when they were part of the insert; every other field
/// the API returns is kept in `other`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
