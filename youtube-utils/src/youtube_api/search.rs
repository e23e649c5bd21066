//! YouTube Search API types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A `search#result` item from `search.list`.
///
/// See: <https://developers.google.com/youtube/v3/docs/search#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifies the resource that matched the search.
    pub id: SearchResultId,
    /// Basic details about the result, present when `part=snippet` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<SearchResultSnippet>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl SearchResult {
    /// The title of the matched resource, if the snippet was returned.
    pub fn title(&self) -> Option<&str> {
        self.snippet.as_ref().map(|s| s.title.as_str())
    }
}

/// The `id` object of a search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultId {
    /// The type of the resource, e.g. `youtube#video`.
    pub kind: String,
    /// Set when `kind` is `youtube#video`.
    #[serde(rename = "videoId", default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Basic details about a search result.
///
/// See: <https://developers.google.com/youtube/v3/docs/search#snippet>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultSnippet {
    /// The creation date and time of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    /// The ID of the channel that published the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
