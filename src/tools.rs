use crate::config::SearchConfig;
use crate::error::{ChatError, Result};
use crate::session::SearchBackend;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

mod image_search;
mod markup;
mod web_search;

pub use image_search::ImageResult;
use web_search::SEARCH_ERROR_REPLY;

const WEB_RESULT_COUNT: u32 = 5;
const IMAGE_RESULT_COUNT: u32 = 6;
const PREVIEW_IMAGE_COUNT: u32 = 3;

/// Client for the Brave web and image search endpoints.
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
        count: u32,
    ) -> Result<T> {
        let count = count.to_string();
        let url = Url::parse_with_params(
            &format!("{}/{}", self.base_url, path),
            &[("q", query), ("count", count.as_str())],
        )
        .map_err(|e| ChatError::Config(format!("Invalid search URL: {e}")))?;

        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-Subscription-Token", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ChatError::from_response(response).await);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn web_search(&self, query: &str) -> String {
        tracing::info!(query, "Performing web search");

        let results = match self.fetch_web_results(query, WEB_RESULT_COUNT).await {
            Ok(results) => results,
            Err(err) => {
                tracing::error!(query, "Web search failed: {err}");
                return SEARCH_ERROR_REPLY.to_string();
            }
        };

        let previews = if results.is_empty() {
            Vec::new()
        } else {
            self.image_search_with_count(query, PREVIEW_IMAGE_COUNT).await
        };

        web_search::compose_web_reply(&results, &previews)
    }

    async fn image_search(&self, query: &str) -> Vec<ImageResult> {
        self.image_search_with_count(query, IMAGE_RESULT_COUNT).await
    }
}

impl SearchClient {
    async fn image_search_with_count(&self, query: &str, count: u32) -> Vec<ImageResult> {
        tracing::info!(query, count, "Performing image search");

        match self.fetch_images(query, count).await {
            Ok(images) => images,
            Err(err) => {
                tracing::error!(query, "Image search failed: {err}");
                Vec::new()
            }
        }
    }
}
