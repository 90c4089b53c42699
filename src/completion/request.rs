//! Inbound chat request types.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ApiError, FieldError};

/// Chat completion request (OpenAI-compatible).
///
/// Generation parameters are carried through unchanged; the emulator does not
/// use them. Each may be absent or `null`, in which case the accessor reports
/// the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    #[serde(default)]
    pub stop: Option<Vec<String>>,
    #[serde(default)]
    pub stream: StreamFlag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: i64 = 1000;
const DEFAULT_TOP_P: f64 = 1.0;

/// The textual `stream` flag.
///
/// The wire value is a string; booleans and numbers are accepted and kept in
/// their textual form. Only the exact text `"true"` selects streaming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StreamFlag(Option<String>);

impl StreamFlag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn absent() -> Self {
        Self(None)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Extraction rule: case-sensitive equality with `"true"`, no coercion.
    pub fn is_streaming(&self) -> bool {
        self.0.as_deref() == Some("true")
    }
}

impl<'de> Deserialize<'de> for StreamFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Bool(bool),
            Number(serde_json::Number),
        }

        let raw = Option::<Raw>::deserialize(deserializer)?;
        Ok(StreamFlag(raw.map(|r| match r {
            Raw::Text(s) => s,
            Raw::Bool(b) => b.to_string(),
            Raw::Number(n) => n.to_string(),
        })))
    }
}

impl ChatRequest {
    /// Minimal request with default generation parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages: Some(messages),
            temperature: None,
            max_tokens: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop: None,
            stream: StreamFlag::absent(),
        }
    }

    pub fn with_stream(mut self, stream: StreamFlag) -> Self {
        self.stream = stream;
        self
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens(&self) -> i64 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn top_p(&self) -> f64 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }

    pub fn frequency_penalty(&self) -> f64 {
        self.frequency_penalty.unwrap_or_default()
    }

    pub fn presence_penalty(&self) -> f64 {
        self.presence_penalty.unwrap_or_default()
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_deref().unwrap_or_default()
    }

    /// Field-level binding checks. All failures are reported together.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        if self.model.trim().is_empty() {
            errors.push(FieldError {
                field: "model",
                reason: "must not be blank",
            });
        }
        if self.messages.is_none() {
            errors.push(FieldError {
                field: "messages",
                reason: "must not be null",
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}
