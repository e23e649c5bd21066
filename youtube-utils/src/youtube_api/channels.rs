//! YouTube Channels API types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A `channel` resource as returned by `channels.list`.
///
/// Only the parts this crate requests are modelled.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#resource>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// The ID that YouTube uses to uniquely identify the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Statistics about the channel, present when `part=statistics` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ChannelStatistics>,
}

/// The `statistics` field group of a channel: statistic name to value.
///
/// The API reports counts as decimal strings. The well-known statistics get their own fields;
/// anything else the API returns is kept in `other`, so the record round-trips unchanged.
/// [`Default`] is the empty record, used when the user has no channel.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#statistics>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    /// The number of times the channel has been viewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    /// The number of subscribers that the channel has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<String>,
    /// Whether the channel's subscriber count is publicly visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_subscriber_count: Option<bool>,
    /// The number of public videos uploaded to the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ChannelStatistics {
    pub fn is_empty(&self) -> bool {
        self.view_count.is_none()
            && self.subscriber_count.is_none()
            && self.hidden_subscriber_count.is_none()
            && self.video_count.is_none()
            && self.other.is_empty()
    }
}
