use crate::ai_sdk::Message;
use crate::tools::ImageResult;
use async_trait::async_trait;

const SEARCH_PREFIX: &str = "/search ";
const IMAGE_PREFIX: &str = "/image ";

/// Streams a model reply for the given history.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the full reply. `on_update` receives the accumulated text
    /// each time a fragment arrives. Never fails: unreachable servers
    /// produce a fixed error reply.
    async fn stream_reply(
        &self,
        history: &[Message],
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> String;
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Markdown block of web results, or a fixed reply on empty/failure.
    async fn web_search(&self, query: &str) -> String;

    /// Image results in response order; empty on failure.
    async fn image_search(&self, query: &str) -> Vec<ImageResult>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Search(&'a str),
    Image(&'a str),
    Chat,
}

impl<'a> Command<'a> {
    pub fn parse(input: &'a str) -> Self {
        if let Some(query) = input.strip_prefix(SEARCH_PREFIX) {
            Command::Search(query.trim())
        } else if let Some(query) = input.strip_prefix(IMAGE_PREFIX) {
            Command::Image(query.trim())
        } else {
            Command::Chat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    Search(String),
    Images {
        query: String,
        images: Vec<ImageResult>,
    },
    Chat(String),
}

/// Placeholder stored in history for an image turn.
pub fn image_placeholder(query: &str) -> String {
    format!("[Images returned for: {query}]")
}

/// Conversation history. Append-only; every turn adds one user and one
/// assistant message.
#[derive(Debug, Default)]
pub struct Session {
    history: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub async fn handle_turn<C, S>(
        &mut self,
        input: &str,
        chat: &C,
        search: &S,
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> TurnReply
    where
        C: ChatBackend + ?Sized,
        S: SearchBackend + ?Sized,
    {
        self.history.push(Message::user(input));

        match Command::parse(input) {
            Command::Search(query) => {
                let text = search.web_search(query).await;
                self.history.push(Message::assistant(text.clone()));
                TurnReply::Search(text)
            }
            Command::Image(query) => {
                let images = search.image_search(query).await;
                tracing::info!(query, count = images.len(), "Image search finished");
                self.history.push(Message::assistant(image_placeholder(query)));
                TurnReply::Images {
                    query: query.to_string(),
                    images,
                }
            }
            Command::Chat => {
                let reply = chat.stream_reply(&self.history, on_update).await;
                self.history.push(Message::assistant(reply.clone()));
                TurnReply::Chat(reply)
            }
        }
    }
}
