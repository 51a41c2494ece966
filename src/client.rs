//! HTTP RPC client for talking to peer agent workers.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::protocol::envelope::SUBFORMAT_ENGLISH;
use crate::protocol::{attach_conversation, Envelope};

/// Fixed wire path every worker serves.
pub const NLIP_PATH: &str = "/nlip/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for sending envelopes to a peer agent worker.
///
/// Each instance owns exactly one conversation identity, generated at
/// construction and stamped onto every outbound envelope. Calls are a single
/// attempt; retry policy, if wanted, is layered by the caller around
/// [`NlipClient::send_envelope`].
pub struct NlipClient {
    http: reqwest::Client,
    base_url: String,
    conversation_id: String,
    timeout: Duration,
}

impl NlipClient {
    /// Create a client with a fresh conversation identity.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_conversation_id(base_url, uuid::Uuid::new_v4().to_string())
    }

    /// Create a client reusing an existing conversation identity.
    pub fn with_conversation_id(
        base_url: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            conversation_id: conversation_id.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The conversation identity stamped onto outbound envelopes.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Send an envelope and await the synchronous reply envelope.
    ///
    /// The conversation token is attached here, on every send path, so
    /// callers never stamp envelopes themselves.
    pub async fn send_envelope(&self, envelope: Envelope) -> Result<Envelope> {
        let url = format!("{}{}", self.base_url, NLIP_PATH);
        let payload = attach_conversation(envelope, &self.conversation_id);

        tracing::debug!("POST {} ({}/{})", url, payload.format, payload.subformat);

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        Envelope::from_json(&body)
    }

    /// Send free text and return the extracted text of the reply.
    pub async fn send_text(&self, body: impl Into<String>, subformat: &str) -> Result<String> {
        let envelope = Envelope::text(body).with_subformat(subformat);
        let reply = self.send_envelope(envelope).await?;
        Ok(reply.extract_text())
    }

    /// Send free text with the default english subformat.
    pub async fn send_english(&self, body: impl Into<String>) -> Result<String> {
        self.send_text(body, SUBFORMAT_ENGLISH).await
    }

    /// Send a structured tool call and return the extracted text of the reply.
    pub async fn send_tool_call(&self, tool: &str, args: Map<String, Value>) -> Result<String> {
        let reply = self.send_envelope(Envelope::tool_call(tool, args)).await?;
        Ok(reply.extract_text())
    }
}
