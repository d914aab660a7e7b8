use super::SearchClient;
use crate::ai_sdk::brave::{ImageSearchResponse, RawImageResult};
use crate::error::Result;
use reqwest::Url;

const DEFAULT_TITLE: &str = "Image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    /// Always an absolute http(s) URL.
    pub thumbnail_url: String,
    pub full_url: Option<String>,
    pub title: String,
    pub source: String,
}

impl SearchClient {
    pub(super) async fn fetch_images(&self, query: &str, count: u32) -> Result<Vec<ImageResult>> {
        let response: ImageSearchResponse = self.get_json("images/search", query, count).await?;
        Ok(collect_images(response.results))
    }
}

/// Keeps candidates with a usable thumbnail, in response order.
fn collect_images(raw: Vec<serde_json::Value>) -> Vec<ImageResult> {
    raw.into_iter()
        .filter_map(|value| {
            let raw = match serde_json::from_value::<RawImageResult>(value) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!("Skipping unreadable image result: {err}");
                    return None;
                }
            };

            let Some(thumbnail_url) = raw.thumbnail_src().filter(|src| is_http_url(src)) else {
                tracing::warn!(
                    thumbnail = ?raw.thumbnail_src(),
                    "Skipping image without a usable thumbnail"
                );
                return None;
            };

            Some(ImageResult {
                thumbnail_url: thumbnail_url.to_string(),
                full_url: raw.full_url().map(str::to_string),
                title: raw.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                source: raw.source.clone().unwrap_or_default(),
            })
        })
        .collect()
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}
