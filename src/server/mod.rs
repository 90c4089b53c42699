//! HTTP server providing an OpenAI-compatible API.
//!
//! - [`openai_api`]: Router, state and route handlers
//! - [`streaming`]: SSE body for paced chunk delivery

pub mod openai_api;
pub mod streaming;
