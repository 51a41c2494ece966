//! Tagged payload classification for inbound envelopes.

use serde_json::{Map, Value};

use super::envelope::{Envelope, FORMAT_STRUCTURED, SUBFORMAT_JSON};

/// What an inbound envelope is asking for.
///
/// Parsed once at the boundary so the dispatcher can pattern-match instead
/// of probing fields.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Free-text request for the default collaborator.
    Text(String),
    /// Structured tool-call RPC: `content = {tool, args}`.
    ToolCall {
        tool: String,
        args: Map<String, Value>,
    },
    /// A structured envelope whose content lacks a usable `tool` key.
    /// This is a caller error, not a protocol error.
    Unrecognized(Value),
}

impl Payload {
    /// Classify an envelope.
    ///
    /// An envelope is a tool call when `format` is `structured`, `subformat`
    /// is `json` (both case-insensitive) and `content` is a mapping carrying
    /// a string `tool` key. A mapping without one is `Unrecognized`.
    /// Everything else is treated as free text.
    pub fn classify(envelope: &Envelope) -> Self {
        if envelope.has_format(FORMAT_STRUCTURED) && envelope.has_subformat(SUBFORMAT_JSON) {
            if let Some(obj) = envelope.content.as_object() {
                if let Some(tool) = obj.get("tool").and_then(Value::as_str) {
                    let args = obj
                        .get("args")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default();
                    return Payload::ToolCall {
                        tool: tool.to_string(),
                        args,
                    };
                }
                return Payload::Unrecognized(envelope.content.clone());
            }
        }

        Payload::Text(envelope.extract_text())
    }
}
