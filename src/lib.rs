//! mock-openai: a mock OpenAI-compatible chat completion server.
//!
//! Validates chat requests against a fixed model registry and answers with
//! either a single JSON completion or a character-paced event stream that
//! imitates token-by-token generation. No model is ever invoked.

pub mod completion;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;
