//! Chunk framer: encodes completion units into wire bytes.
//!
//! Streaming units become `data: <json>\n\n` event-stream frames; the
//! single-shot response is a plain JSON body. String values go through
//! `serde_json`, which escapes `\\`, `"`, `\n`, `\r`, `\t`, `\b` and `\f`
//! with their short forms and leaves every non-ASCII character untouched.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::completion::emitter::{ChatResponse, CompletionUnit, StreamSession};

pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Streaming chat completion chunk (OpenAI-compatible).
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: usize,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Per-session framer. Every chunk of a session shares its id, `created`
/// and model.
#[derive(Debug, Clone)]
pub struct ChunkFramer {
    id: String,
    created: u64,
    model: String,
}

impl ChunkFramer {
    pub fn new(id: impl Into<String>, created: u64, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created,
            model: model.into(),
        }
    }

    pub fn for_session(session: &StreamSession) -> Self {
        Self::new(session.id(), session.created(), session.model())
    }

    pub fn for_response(response: &ChatResponse) -> Self {
        Self::new(&response.id, response.created, &response.model)
    }

    /// Encode one unit. Streaming units are SSE-framed; `Complete` is not.
    pub fn frame(&self, unit: &CompletionUnit) -> Result<Bytes, serde_json::Error> {
        let (delta, finish_reason) = match unit {
            CompletionUnit::Complete(response) => {
                return serde_json::to_vec(response).map(Bytes::from);
            }
            CompletionUnit::Done => return Ok(Bytes::from_static(DONE_FRAME)),
            CompletionUnit::RoleAnnouncement => (
                ChunkDelta {
                    role: Some("assistant".to_string()),
                    content: None,
                },
                None,
            ),
            CompletionUnit::Content(text) => (
                ChunkDelta {
                    role: None,
                    content: Some(text.clone()),
                },
                None,
            ),
            CompletionUnit::Finish => (ChunkDelta::default(), Some("stop".to_string())),
        };

        let chunk = ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        };

        let json = serde_json::to_string(&chunk)?;
        Ok(Bytes::from(format!("data: {json}\n\n")))
    }
}
