use super::markup::html_to_markdown;
use super::{ImageResult, SearchClient};
use crate::ai_sdk::brave::{RawWebResult, WebSearchResponse};
use crate::error::Result;

pub const NO_RESULTS_REPLY: &str = "🔍 No search results found.";
pub const SEARCH_ERROR_REPLY: &str = "**[Error]** Web search failed.";

const RESULTS_HEADING: &str = "🔍 **Top Search Results:**";
const PREVIEWS_HEADING: &str = "🖼️ **Top Image Previews:**";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResult {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl SearchClient {
    pub(super) async fn fetch_web_results(
        &self,
        query: &str,
        count: u32,
    ) -> Result<Vec<WebResult>> {
        let response: WebSearchResponse = self.get_json("web/search", query, count).await?;
        Ok(normalize_web_results(response.into_results()))
    }
}

fn normalize_web_results(raw: Vec<serde_json::Value>) -> Vec<WebResult> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<RawWebResult>(value) {
            Ok(RawWebResult {
                title,
                description,
                url: Some(url),
            }) if !url.is_empty() => Some(WebResult {
                title: html_to_markdown(&title.unwrap_or_default()),
                description: html_to_markdown(&description.unwrap_or_default()),
                url,
            }),
            Ok(_) => {
                tracing::warn!("Skipping web result without a url");
                None
            }
            Err(err) => {
                tracing::warn!("Skipping unreadable web result: {err}");
                None
            }
        })
        .collect()
}

pub(super) fn compose_web_reply(results: &[WebResult], previews: &[ImageResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_REPLY.to_string();
    }

    let mut output = format!("{RESULTS_HEADING}\n\n");
    for result in results {
        output.push_str(&format!(
            "- [{}]({})\n  \n  {}\n\n",
            result.title, result.url, result.description
        ));
    }

    if !previews.is_empty() {
        output.push_str(&format!("\n{PREVIEWS_HEADING}\n\n"));
        for image in previews {
            output.push_str(&format!("![Image]({})\n\n", image.thumbnail_url));
        }
    }

    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image(url: &str) -> ImageResult {
        ImageResult {
            thumbnail_url: url.to_string(),
            full_url: None,
            title: "Image".to_string(),
            source: String::new(),
        }
    }

    #[test]
    fn results_are_normalized_and_linked() {
        let results = normalize_web_results(vec![json!({
            "title": "<b>Rust</b>",
            "description": "lang",
            "url": "https://rust-lang.org"
        })]);

        let reply = compose_web_reply(&results, &[]);

        assert_eq!(
            reply,
            "🔍 **Top Search Results:**\n\n- [**Rust**](https://rust-lang.org)\n  \n  lang"
        );
    }

    #[test]
    fn missing_text_fields_default_to_empty() {
        let results = normalize_web_results(vec![json!({"url": "https://example.com"})]);
        assert_eq!(
            results,
            vec![WebResult {
                title: String::new(),
                description: String::new(),
                url: "https://example.com".to_string(),
            }]
        );
    }

    #[test]
    fn results_without_url_or_with_odd_shapes_are_dropped() {
        let results = normalize_web_results(vec![
            json!({"title": "no link"}),
            json!({"title": "empty link", "url": ""}),
            json!({"title": 7, "url": "https://numbers.example"}),
            json!("just a string"),
            json!({"title": "kept", "url": "https://kept.example"}),
        ]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "kept");
    }

    #[test]
    fn empty_results_use_the_no_results_reply() {
        assert_eq!(compose_web_reply(&[], &[image("https://x.example/a.png")]), NO_RESULTS_REPLY);
    }

    #[test]
    fn previews_follow_results_separated_by_blank_lines() {
        let results = vec![
            WebResult {
                title: "One".to_string(),
                description: "first".to_string(),
                url: "https://one.example".to_string(),
            },
            WebResult {
                title: "Two".to_string(),
                description: "second".to_string(),
                url: "https://two.example".to_string(),
            },
        ];
        let previews = vec![image("https://img.example/1.png"), image("https://img.example/2.png")];

        let reply = compose_web_reply(&results, &previews);

        assert_eq!(
            reply,
            concat!(
                "🔍 **Top Search Results:**\n\n",
                "- [One](https://one.example)\n  \n  first\n\n",
                "- [Two](https://two.example)\n  \n  second\n\n",
                "\n🖼️ **Top Image Previews:**\n\n",
                "![Image](https://img.example/1.png)\n\n",
                "![Image](https://img.example/2.png)"
            )
        );
    }
}
