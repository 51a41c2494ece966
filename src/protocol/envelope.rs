//! Message envelopes exchanged between agent workers.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Format tag for plain-text envelopes.
pub const FORMAT_TEXT: &str = "text";
/// Format tag for structured tool-call envelopes.
pub const FORMAT_STRUCTURED: &str = "structured";
/// Format tag for token submessages.
pub const FORMAT_TOKEN: &str = "token";

/// Default subformat for text envelopes.
pub const SUBFORMAT_ENGLISH: &str = "english";
/// Subformat for structured tool-call envelopes.
pub const SUBFORMAT_JSON: &str = "json";

/// The message unit, both request and reply.
///
/// `content` is polymorphic: a string when `format` is `"text"`, a mapping
/// with `tool` and `args` keys when `format` is `"structured"`. Submessage
/// order is meaningful; new metadata is prepended, not appended.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub format: String,
    pub subformat: String,
    pub content: Value,
    pub submessages: Vec<Envelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Envelope {
    /// Create a text envelope with the default english subformat.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            format: FORMAT_TEXT.to_string(),
            subformat: SUBFORMAT_ENGLISH.to_string(),
            content: Value::String(body.into()),
            submessages: Vec::new(),
            label: None,
        }
    }

    /// Create a structured tool-call envelope.
    ///
    /// The tool name is carried in-band inside `content`, so arbitrary tool
    /// vocabularies are supported without protocol versioning.
    pub fn tool_call(tool: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            format: FORMAT_STRUCTURED.to_string(),
            subformat: SUBFORMAT_JSON.to_string(),
            content: json!({
                "tool": tool.into(),
                "args": Value::Object(args),
            }),
            submessages: Vec::new(),
            label: None,
        }
    }

    /// Override the subformat.
    pub fn with_subformat(mut self, subformat: impl Into<String>) -> Self {
        self.subformat = subformat.into();
        self
    }

    /// Set the submessage label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Case-insensitive format check.
    pub fn has_format(&self, format: &str) -> bool {
        self.format.eq_ignore_ascii_case(format)
    }

    /// Case-insensitive subformat check.
    pub fn has_subformat(&self, subformat: &str) -> bool {
        self.subformat.eq_ignore_ascii_case(subformat)
    }

    /// Extract the textual payload.
    ///
    /// Returns `content` directly for text envelopes; non-string content is
    /// rendered as JSON.
    pub fn extract_text(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Parse a wire payload into an envelope.
    ///
    /// Field lookups tolerate a canonical lowercase key and a capitalized
    /// alias (`format`/`Format`, `content`/`Content`, ...) for
    /// interoperability with producers that capitalize differently. The
    /// lowercase key is checked first; first match wins.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::MalformedEnvelope("payload is not a JSON object".to_string()))?;

        let format = required_str(obj, "format", "Format")?;
        let subformat = required_str(obj, "subformat", "Subformat")?;

        let content = field(obj, "content", "Content")
            .ok_or_else(|| Error::MalformedEnvelope("missing field 'content'".to_string()))?
            .clone();

        let submessages = match field(obj, "submessages", "Submessages") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(Envelope::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(Error::MalformedEnvelope(
                    "field 'submessages' is not an array".to_string(),
                ))
            }
        };

        let label = match field(obj, "label", "Label") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(Error::MalformedEnvelope(
                    "field 'label' is not a string".to_string(),
                ))
            }
        };

        Ok(Self {
            format,
            subformat,
            content,
            submessages,
            label,
        })
    }

    /// Parse a raw JSON string into an envelope.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::MalformedEnvelope(format!("invalid JSON: {}", e)))?;
        Self::from_value(&value)
    }
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| obj.get(alias))
}

fn required_str(obj: &Map<String, Value>, key: &str, alias: &str) -> Result<String> {
    match field(obj, key, alias) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Error::MalformedEnvelope(format!(
            "field '{}' is not a string",
            key
        ))),
        None => Err(Error::MalformedEnvelope(format!("missing field '{}'", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_round_trip() {
        for body in ["Tell me about NVDA", "", "❌ Error: not really"] {
            let envelope = Envelope::text(body);
            assert_eq!(envelope.format, FORMAT_TEXT);
            assert_eq!(envelope.subformat, SUBFORMAT_ENGLISH);
            assert_eq!(envelope.extract_text(), body);
        }
    }

    #[test]
    fn test_tool_call_shape() {
        let mut args = Map::new();
        args.insert("query".to_string(), json!("AAPL"));
        let envelope = Envelope::tool_call("get_stock_quote", args);

        assert_eq!(envelope.format, FORMAT_STRUCTURED);
        assert_eq!(envelope.subformat, SUBFORMAT_JSON);
        assert_eq!(envelope.content["tool"], "get_stock_quote");
        assert_eq!(envelope.content["args"]["query"], "AAPL");
    }

    #[test]
    fn test_subformat_override() {
        let envelope = Envelope::text("hola").with_subformat("spanish");
        assert_eq!(envelope.subformat, "spanish");
    }

    #[test]
    fn test_parse_lowercase_fields() {
        let value = json!({
            "format": "text",
            "subformat": "english",
            "content": "hello",
        });
        let envelope = Envelope::from_value(&value).unwrap();
        assert_eq!(envelope.extract_text(), "hello");
        assert!(envelope.submessages.is_empty());
        assert!(envelope.label.is_none());
    }

    #[test]
    fn test_parse_capitalized_aliases() {
        let lower = json!({
            "format": "text",
            "subformat": "english",
            "content": "hello",
        });
        let upper = json!({
            "Format": "text",
            "Subformat": "english",
            "Content": "hello",
        });

        let a = Envelope::from_value(&lower).unwrap();
        let b = Envelope::from_value(&upper).unwrap();
        assert_eq!(a.format, b.format);
        assert_eq!(a.subformat, b.subformat);
        assert_eq!(a.extract_text(), b.extract_text());
    }

    #[test]
    fn test_lowercase_wins_when_both_present() {
        let value = json!({
            "format": "text",
            "Format": "structured",
            "subformat": "english",
            "content": "hello",
        });
        let envelope = Envelope::from_value(&value).unwrap();
        assert_eq!(envelope.format, "text");
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(Envelope::from_value(&json!({"format": "text"})).is_err());
        assert!(Envelope::from_value(&json!({"content": "x"})).is_err());
        assert!(Envelope::from_value(&json!("not an object")).is_err());
        assert!(Envelope::from_value(&json!({
            "format": 42,
            "subformat": "english",
            "content": "x",
        }))
        .is_err());
    }

    #[test]
    fn test_parse_nested_submessages() {
        let value = json!({
            "format": "text",
            "subformat": "english",
            "content": "primary",
            "submessages": [
                {
                    "format": "token",
                    "subformat": "conversation_coordinator",
                    "content": "conv-1",
                    "label": "conversation",
                }
            ],
        });
        let envelope = Envelope::from_value(&value).unwrap();
        assert_eq!(envelope.submessages.len(), 1);
        assert_eq!(envelope.submessages[0].extract_text(), "conv-1");
        assert_eq!(
            envelope.submessages[0].label.as_deref(),
            Some("conversation")
        );
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Envelope::from_json("{not json"),
            Err(crate::error::Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_serializes_lowercase_field_names() {
        let envelope = Envelope::text("hi");
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("format").is_some());
        assert!(value.get("subformat").is_some());
        assert!(value.get("content").is_some());
        assert!(value.get("submessages").is_some());
    }
}
