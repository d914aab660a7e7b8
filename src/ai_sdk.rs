pub(crate) mod brave;
mod ollama;

pub(crate) use ollama::{parse_stream_line, ChatRequest};
pub use ollama::Message;
#[cfg(test)]
pub use ollama::Role;
