use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) messages: &'a [Message],
    pub(crate) stream: bool,
}

/// One line of a streamed `/api/chat` response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatChunk {
    #[serde(default)]
    pub(crate) message: Option<ChunkMessage>,
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkMessage {
    #[serde(default)]
    pub(crate) content: Option<String>,
}

impl ChatChunk {
    pub(crate) fn fragment(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|message| message.content.as_deref())
            .unwrap_or("")
    }
}

/// Parses one body line. `None` means there was nothing to parse.
pub(crate) fn parse_stream_line(line: &str) -> Option<Result<ChatChunk, serde_json::Error>> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return None;
    }

    let payload = line.strip_prefix("data: ").unwrap_or(line);
    Some(serde_json::from_str(payload))
}
