//! Streaming completion emulator.
//!
//! - [`request`]: Inbound chat request types
//! - [`emitter`]: Mode selection, single-shot synthesis and the streaming session
//! - [`framer`]: JSON encoding and event-stream framing of emitted units

pub mod emitter;
pub mod framer;
pub mod request;
