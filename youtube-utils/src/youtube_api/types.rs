//! Shared request and response shapes for the YouTube API `list` endpoints.

use serde::{Deserialize, Serialize};

/// A read query against one of the YouTube Data API `list` endpoints.
///
/// `resource` is the path segment of the endpoint (`channels`, `search`, ...), `part` the field
/// group(s) to return, and `filters` the remaining query parameters, sent in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub resource: &'static str,
    pub part: &'static str,
    pub filters: Vec<(&'static str, String)>,
}

impl ListRequest {
    pub fn new(resource: &'static str, part: &'static str) -> Self {
        Self {
            resource,
            part,
            filters: Vec::new(),
        }
    }

    /// Adds a query parameter.
    pub fn filter(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.filters.push((key, value.into()));
        self
    }

    /// Value of the first filter named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The full set of query parameters, `part` first.
    pub fn query_params(&self) -> Vec<(&str, &str)> {
        std::iter::once(("part", self.part))
            .chain(self.filters.iter().map(|(k, v)| (*k, v.as_str())))
            .collect()
    }
}

/// Response structure shared by the `*.list` API calls.
///
/// The API leaves out `items` entirely when nothing matched; that deserializes as an empty list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Identifies the API resource's type, e.g. `youtube#channelListResponse`.
    #[serde(default)]
    pub kind: Option<String>,
    /// The resources that matched the request.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: Option<PageInfo>,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

/// Paging details for lists of resources.
///
/// Includes the total number of items available and the number of resources
/// returned in a single page response.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_params_put_part_first() {
        let request = ListRequest::new("search", "snippet")
            .filter("forMine", "true")
            .filter("maxResults", 5.to_string());

        assert_eq!(
            request.query_params(),
            vec![
                ("part", "snippet"),
                ("forMine", "true"),
                ("maxResults", "5")
            ]
        );
        assert_eq!(request.get("maxResults"), Some("5"));
        assert_eq!(request.get("pageToken"), None);
    }

    #[test]
    fn missing_items_is_empty() {
        let response: ListResponse<serde_json::Value> = serde_json::from_value(serde_json::json!({
            "kind": "youtube#searchListResponse",
            "pageInfo": { "totalResults": 0, "resultsPerPage": 5 }
        }))
        .unwrap();

        assert!(response.items.is_empty());
        assert_eq!(
            response.page_info,
            Some(PageInfo {
                total_results: 0,
                results_per_page: 5
            })
        );
    }
}
