use crate::ai_sdk::{parse_stream_line, ChatRequest, Message};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::session::ChatBackend;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::ops::ControlFlow;

/// Reply recorded when the inference server cannot be reached.
pub const CHAT_ERROR_REPLY: &str = "**[Error]** Unable to contact Ollama.";

pub struct Agent {
    client: Client,
    host: String,
    model: String,
}

impl Agent {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        // Per-read rather than total: a long reply may stream for minutes.
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            host: config.host.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn open_stream(&self, history: &[Message]) -> Result<reqwest::Response> {
        let request = ChatRequest {
            model: &self.model,
            messages: history,
            stream: true,
        };

        tracing::info!(model = %self.model, messages = history.len(), "Sending chat request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::from_response(response).await);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for Agent {
    async fn stream_reply(
        &self,
        history: &[Message],
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> String {
        let response = match self.open_stream(history).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Chat request failed: {err}");
                return CHAT_ERROR_REPLY.to_string();
            }
        };

        let mut reply = StreamingReply::default();
        if let Err(err) = read_stream(response.bytes_stream(), &mut reply, on_update).await {
            tracing::warn!(received = reply.text().len(), "Chat stream ended early: {err}");
            if reply.text().is_empty() {
                return CHAT_ERROR_REPLY.to_string();
            }
        }

        reply.into_text()
    }
}

/// Assistant text assembled from streamed fragments, in arrival order.
#[derive(Debug, Default)]
pub struct StreamingReply {
    text: String,
}

impl StreamingReply {
    /// Appends a fragment and returns the text so far.
    pub fn push(&mut self, fragment: &str) -> &str {
        self.text.push_str(fragment);
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Longest line kept while waiting for its `\n`.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into `\n`-terminated lines. Bytes are held until
/// the line is complete so multi-byte characters can straddle chunks.
#[derive(Debug)]
struct LineBuffer {
    pending: Vec<u8>,
    // Bytes of `pending` already known to hold no newline.
    scanned: usize,
    max_line: usize,
    // Set while skipping the rest of an oversized line.
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            max_line,
            discarding: false,
        }
    }

    fn push(&mut self, mut chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(idx) => {
                    self.discarding = false;
                    chunk = &chunk[idx + 1..];
                }
                None => return lines,
            }
        }

        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let idx = self.scanned + pos;
            let line: Vec<u8> = self.pending.drain(..=idx).collect();
            lines.push(String::from_utf8_lossy(&line[..idx]).into_owned());
            self.scanned = 0;
        }
        self.scanned = self.pending.len();

        if self.pending.len() > self.max_line {
            tracing::warn!(bytes = self.pending.len(), "Dropping oversized stream line");
            self.pending.clear();
            self.scanned = 0;
            self.discarding = true;
        }

        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        self.scanned = 0;
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Feeds every line of `stream` into `reply`, reporting the accumulated
/// text after each parsed line. Stops early on a `done` chunk.
pub(crate) async fn read_stream<S, B, E>(
    stream: S,
    reply: &mut StreamingReply,
    on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> std::result::Result<(), E>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut lines = LineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for line in lines.push(chunk.as_ref()) {
            if apply_line(&line, reply, on_update).is_break() {
                return Ok(());
            }
        }
    }

    if let Some(line) = lines.finish() {
        let _ = apply_line(&line, reply, on_update);
    }

    Ok(())
}

fn apply_line(
    line: &str,
    reply: &mut StreamingReply,
    on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> ControlFlow<()> {
    tracing::debug!(line, "Stream line");

    let chunk = match parse_stream_line(line) {
        None => return ControlFlow::Continue(()),
        Some(Ok(chunk)) => chunk,
        Some(Err(err)) => {
            tracing::warn!(line, "Skipping malformed stream line: {err}");
            return ControlFlow::Continue(());
        }
    };

    if let Some(error) = &chunk.error {
        tracing::warn!("Inference server reported an error: {error}");
    }

    on_update(reply.push(chunk.fragment()));

    if chunk.done {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}
