//! Wire shapes of the Brave Search API.
//!
//! Results are kept as raw JSON values at the list level and decoded one
//! entry at a time, so a single oddly shaped entry only loses itself.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebSearchResponse {
    #[serde(default)]
    pub(crate) web: Option<WebSection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebSection {
    #[serde(default)]
    pub(crate) results: Vec<Value>,
}

impl WebSearchResponse {
    pub(crate) fn into_results(self) -> Vec<Value> {
        self.web.map(|web| web.results).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawWebResult {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImageSearchResponse {
    #[serde(default)]
    pub(crate) results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImageResult {
    #[serde(default)]
    pub(crate) thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub(crate) properties: Option<ImageProperties>,
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    #[serde(default)]
    pub(crate) src: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageProperties {
    #[serde(default)]
    pub(crate) url: Option<String>,
}

impl RawImageResult {
    /// The thumbnail source, if it is a string at all.
    pub(crate) fn thumbnail_src(&self) -> Option<&str> {
        self.thumbnail.as_ref()?.src.as_ref()?.as_str()
    }

    /// `properties.url`, falling back to the top-level `url`.
    pub(crate) fn full_url(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|props| props.url.as_deref())
            .filter(|url| !url.is_empty())
            .or_else(|| self.url.as_deref().filter(|url| !url.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn web_response_without_web_section_has_no_results() {
        let response: WebSearchResponse =
            serde_json::from_value(json!({"type": "search", "query": {"original": "x"}})).unwrap();
        assert!(response.into_results().is_empty());
    }

    #[test]
    fn web_response_keeps_raw_entries() {
        let response: WebSearchResponse = serde_json::from_value(json!({
            "web": {"results": [{"title": "a"}, 17]}
        }))
        .unwrap();
        assert_eq!(response.into_results().len(), 2);
    }

    #[test]
    fn full_url_prefers_properties() {
        let raw: RawImageResult = serde_json::from_value(json!({
            "url": "https://page.example/post",
            "properties": {"url": "https://cdn.example/full.jpg"}
        }))
        .unwrap();
        assert_eq!(raw.full_url(), Some("https://cdn.example/full.jpg"));
    }

    #[test]
    fn full_url_falls_back_to_top_level_url() {
        let raw: RawImageResult = serde_json::from_value(json!({
            "url": "https://page.example/post",
            "properties": {"url": ""}
        }))
        .unwrap();
        assert_eq!(raw.full_url(), Some("https://page.example/post"));

        let bare: RawImageResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(bare.full_url(), None);
    }

    #[test]
    fn thumbnail_src_must_be_a_string() {
        let raw: RawImageResult =
            serde_json::from_value(json!({"thumbnail": {"src": 42}})).unwrap();
        assert_eq!(raw.thumbnail_src(), None);
    }
}
