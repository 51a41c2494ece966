//! Conversation-correlation token submessages.

use super::envelope::{Envelope, FORMAT_TOKEN};

/// Subformat carried by conversation token submessages.
pub const SUBFORMAT_CONVERSATION: &str = "conversation_coordinator";
/// Label carried by conversation token submessages.
pub const LABEL_CONVERSATION: &str = "conversation";

/// Build the token submessage for a conversation identity.
pub fn conversation_token(conversation_id: impl Into<String>) -> Envelope {
    Envelope {
        format: FORMAT_TOKEN.to_string(),
        subformat: SUBFORMAT_CONVERSATION.to_string(),
        content: serde_json::Value::String(conversation_id.into()),
        submessages: Vec::new(),
        label: Some(LABEL_CONVERSATION.to_string()),
    }
}

/// Prepend a conversation token to an envelope's submessages.
///
/// Pure: returns a new envelope with `[token] + submessages`, the tail kept
/// in order. Attaching twice stacks two tokens; the client invokes this
/// exactly once per outbound envelope.
pub fn attach_conversation(mut envelope: Envelope, conversation_id: &str) -> Envelope {
    envelope
        .submessages
        .insert(0, conversation_token(conversation_id));
    envelope
}

/// Extract the conversation identity from an inbound envelope, if present.
///
/// Scans submessages in order and returns the content of the first
/// conversation token.
pub fn conversation_id(envelope: &Envelope) -> Option<&str> {
    envelope
        .submessages
        .iter()
        .find(|sub| {
            sub.has_format(FORMAT_TOKEN) && sub.has_subformat(SUBFORMAT_CONVERSATION)
        })
        .and_then(|sub| sub.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_prepended() {
        let envelope = Envelope::text("hello");
        let stamped = attach_conversation(envelope, "conv-123");

        let head = &stamped.submessages[0];
        assert_eq!(head.format, FORMAT_TOKEN);
        assert_eq!(head.subformat, SUBFORMAT_CONVERSATION);
        assert_eq!(head.label.as_deref(), Some(LABEL_CONVERSATION));
        assert_eq!(head.extract_text(), "conv-123");
    }

    #[test]
    fn test_existing_submessages_keep_their_order() {
        let mut envelope = Envelope::text("hello");
        envelope.submessages.push(Envelope::text("first"));
        envelope.submessages.push(Envelope::text("second"));

        let stamped = attach_conversation(envelope, "conv-123");

        assert_eq!(stamped.submessages.len(), 3);
        assert_eq!(stamped.submessages[1].extract_text(), "first");
        assert_eq!(stamped.submessages[2].extract_text(), "second");
    }

    #[test]
    fn test_double_attach_stacks_two_tokens() {
        let envelope = Envelope::text("hello");
        let stamped = attach_conversation(attach_conversation(envelope, "a"), "b");

        assert_eq!(stamped.submessages.len(), 2);
        assert_eq!(stamped.submessages[0].extract_text(), "b");
        assert_eq!(stamped.submessages[1].extract_text(), "a");
    }

    #[test]
    fn test_conversation_id_extraction() {
        let envelope = Envelope::text("hello");
        assert_eq!(conversation_id(&envelope), None);

        let stamped = attach_conversation(envelope, "conv-123");
        assert_eq!(conversation_id(&stamped), Some("conv-123"));
    }
}
