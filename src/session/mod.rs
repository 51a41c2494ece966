//! Server-side session dispatcher.
//!
//! A [`Session`] interprets one inbound envelope at a time: structured tool
//! calls are routed to a registered collaborator, everything else goes to the
//! default collaborator, and any business-logic failure is converted into a
//! successful diagnostic reply so the conversation keeps going.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::protocol::{Envelope, Payload};

/// Marker prefixing every diagnostic reply body.
pub const ERROR_MARKER: &str = "❌";

/// A collaborator: opaque business logic producing the textual result for a
/// query. May fail; the dispatcher absorbs the failure.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn run(&self, query: &str) -> anyhow::Result<String>;
}

/// Collaborator configuration for a dispatcher: named tools for the
/// structured path plus exactly one default for the free-text path.
///
/// Passed explicitly to [`Session::new`] so independent dispatcher instances
/// can coexist in tests.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    default_tool: Arc<dyn Tool>,
}

impl ToolRegistry {
    pub fn new(default_tool: Arc<dyn Tool>) -> Self {
        Self {
            tools: HashMap::new(),
            default_tool,
        }
    }

    /// Register a named tool for the structured path.
    pub fn register(mut self, name: impl Into<String>, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(name.into(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn default_tool(&self) -> &Arc<dyn Tool> {
        &self.default_tool
    }

    /// Registered tool names, for diagnostics.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Executing,
    Stopped,
}

/// Per-conversation dispatcher state machine.
///
/// Lifecycle: `Created → Started → (Executing → Started)* → Stopped`. The
/// session holds no cross-call conversation state yet; it is the extension
/// point for per-conversation memory.
pub struct Session {
    registry: Arc<ToolRegistry>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(SessionState::Created),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Start hook. Always succeeds.
    pub async fn start(&self) {
        *self.state.lock().await = SessionState::Started;
        tracing::info!("Session ready");
    }

    /// Stop hook: resource teardown extension point. Always succeeds.
    pub async fn stop(&self) {
        *self.state.lock().await = SessionState::Stopped;
        tracing::debug!("Session stopped");
    }

    /// Interpret one inbound envelope and produce the reply envelope.
    ///
    /// Never fails: collaborator errors and caller mistakes come back as
    /// successful text replies carrying a diagnostic.
    pub async fn execute(&self, envelope: Envelope) -> Envelope {
        *self.state.lock().await = SessionState::Executing;
        let reply = self.dispatch(&envelope).await;
        *self.state.lock().await = SessionState::Started;
        reply
    }

    async fn dispatch(&self, envelope: &Envelope) -> Envelope {
        match Payload::classify(envelope) {
            Payload::ToolCall { tool, args } => match self.registry.get(&tool) {
                Some(found) => {
                    let query = query_arg(&args);
                    tracing::debug!("Dispatching tool call '{}' ({} chars)", tool, query.len());
                    self.invoke(found.clone(), &query).await
                }
                None => {
                    tracing::warn!("Tool call for unregistered tool '{}'", tool);
                    Envelope::text(format!(
                        "{} Unknown tool '{}' in structured request.",
                        ERROR_MARKER, tool
                    ))
                }
            },
            Payload::Text(text) => {
                tracing::debug!("Dispatching free text ({} chars)", text.len());
                self.invoke(self.registry.default_tool().clone(), &text).await
            }
            Payload::Unrecognized(raw) => {
                tracing::warn!("Structured request without a usable 'tool' key");
                Envelope::text(format!(
                    "{} Structured request is missing a 'tool' name: {}",
                    ERROR_MARKER, raw
                ))
            }
        }
    }

    async fn invoke(&self, tool: Arc<dyn Tool>, query: &str) -> Envelope {
        match tool.run(query).await {
            Ok(result) => Envelope::text(result),
            Err(e) => {
                tracing::warn!("Collaborator failed: {}", e);
                Envelope::text(format!("{} Error: {}", ERROR_MARKER, e))
            }
        }
    }
}

/// Derive the single positional query from a tool call's args.
fn query_arg(args: &Map<String, Value>) -> String {
    match args.get("query") {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
