//! Completion emitter: turns a validated request into an emission plan.
//!
//! Single-shot requests produce one [`ChatResponse`]. Streaming requests
//! produce a [`StreamSession`], a state machine that yields the ordered
//! sequence of [`CompletionUnit`]s:
//!
//! ```text
//! START → ROLE_ANNOUNCED (optional) → EMITTING(content)* → FINISHED → CLOSED
//! ```
//!
//! Pacing is character-level: one content unit per `char` of the user
//! content, with a fixed suspension after every role/content unit.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::completion::request::{ChatRequest, Message};
use crate::config::StreamingConfig;

/// Reply used when the request carries no user message.
pub const FALLBACK_GREETING: &str = "Hello! I'm a mock AI assistant.";

/// Completion token count reported for every single-shot response.
pub const COMPLETION_TOKENS: usize = 50;

/// Chat completion response (non-streaming).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: Message,
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// One item produced during emission.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionUnit {
    /// Whole single-shot response.
    Complete(Box<ChatResponse>),
    /// `{role: "assistant"}` delta.
    RoleAnnouncement,
    /// `{content: ...}` delta.
    Content(String),
    /// Empty delta with `finish_reason: "stop"`.
    Finish,
    /// End-of-stream sentinel.
    Done,
}

impl CompletionUnit {
    /// Whether the emitter suspends after yielding this unit.
    fn is_paced(&self) -> bool {
        matches!(self, CompletionUnit::RoleAnnouncement | CompletionUnit::Content(_))
    }
}

/// Streaming session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    RoleAnnounced,
    Emitting,
    Finished,
    Closed,
}

/// Emission-time state for one streaming response.
#[derive(Debug)]
pub struct StreamSession {
    id: String,
    created: u64,
    model: String,
    content: Vec<char>,
    cursor: usize,
    announce_role: bool,
    state: SessionState,
    emitted: usize,
}

impl StreamSession {
    pub fn new(model: impl Into<String>, content: &str, announce_role: bool) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            id: format!("chatcmpl-{}", now.as_millis()),
            created: now.as_secs(),
            model: model.into(),
            content: content.chars().collect(),
            cursor: 0,
            announce_role,
            state: SessionState::Start,
            emitted: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Advance the state machine by one unit. Returns `None` once closed.
    pub fn next_unit(&mut self) -> Option<CompletionUnit> {
        let unit = match self.state {
            SessionState::Start if self.announce_role => {
                self.state = SessionState::RoleAnnounced;
                CompletionUnit::RoleAnnouncement
            }
            SessionState::Start | SessionState::RoleAnnounced | SessionState::Emitting => {
                match self.content.get(self.cursor) {
                    Some(c) => {
                        self.cursor += 1;
                        self.state = SessionState::Emitting;
                        CompletionUnit::Content(c.to_string())
                    }
                    None => {
                        self.state = SessionState::Finished;
                        CompletionUnit::Finish
                    }
                }
            }
            SessionState::Finished => {
                self.state = SessionState::Closed;
                info!(
                    id = %self.id,
                    model = %self.model,
                    units = self.emitted + 1,
                    "Stream completed"
                );
                CompletionUnit::Done
            }
            SessionState::Closed => return None,
        };
        self.emitted += 1;
        Some(unit)
    }

    /// Drive the session as a paced stream of units.
    ///
    /// The stream suspends for `delay` after each role/content unit. Dropping
    /// the stream (client disconnect) abandons the session.
    pub fn into_paced_stream(self, delay: Duration) -> impl Stream<Item = CompletionUnit> {
        stream::unfold((self, false), move |(mut session, pause)| async move {
            if pause && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let unit = session.next_unit()?;
            let pause = unit.is_paced();
            Some((unit, (session, pause)))
        })
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            debug!(
                id = %self.id,
                state = ?self.state,
                emitted = self.emitted,
                "Stream abandoned before completion"
            );
        }
    }
}

/// What the emitter decided to do with a request.
#[derive(Debug)]
pub enum EmissionPlan {
    Single(Box<ChatResponse>),
    Stream(StreamSession),
}

/// The completion emitter.
#[derive(Debug, Clone)]
pub struct Emitter {
    config: StreamingConfig,
}

impl Emitter {
    pub fn new(config: StreamingConfig) -> Self {
        Self { config }
    }

    pub fn char_delay(&self) -> Duration {
        self.config.char_delay()
    }

    /// Decide the response mode for an already validated request.
    pub fn emit(&self, request: &ChatRequest) -> EmissionPlan {
        let content = user_content(request.messages());
        if request.stream.is_streaming() {
            EmissionPlan::Stream(StreamSession::new(
                request.model.clone(),
                content,
                self.config.announce_role,
            ))
        } else {
            EmissionPlan::Single(Box::new(single_response(
                &request.model,
                request.messages(),
                content,
            )))
        }
    }
}

/// Content of the most recent `user` message, or the fallback greeting.
pub fn user_content(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or(FALLBACK_GREETING)
}

/// Mock prompt token count: `len / 4 + 1` per message, by UTF-16 length.
pub fn prompt_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|m| m.content.encode_utf16().count() / 4 + 1)
        .sum()
}

fn single_response(model: &str, messages: &[Message], content: &str) -> ChatResponse {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let prompt_tokens = prompt_tokens(messages);

    ChatResponse {
        id: format!("chatcmpl-{}", now.as_millis()),
        object: "chat.completion".to_string(),
        created: now.as_secs(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: Message::new("assistant", content),
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens: COMPLETION_TOKENS,
            total_tokens: prompt_tokens + COMPLETION_TOKENS,
        },
    }
}
