//! NLIP message protocol for agent-to-agent communication.
//!
//! This module defines the wire contract between agent workers:
//! - Message envelopes (format/subformat/content plus nested submessages)
//! - Tagged payload classification (free text vs structured tool call)
//! - Conversation-correlation token submessages

pub mod envelope;
pub mod payload;
pub mod token;

pub use envelope::Envelope;
pub use payload::Payload;
pub use token::{attach_conversation, conversation_id};
