//! Worker lifecycle around the session dispatcher.

pub mod server;

use std::sync::Arc;

use async_trait::async_trait;

use crate::session::{Session, Tool, ToolRegistry};

pub use server::{run_worker, worker_router, WorkerConfig};

/// Process-level lifecycle hooks surrounding the dispatcher.
///
/// `startup`/`shutdown` run once per worker process; `create_session` runs
/// once per logical conversation. Implementations may log but must not block
/// indefinitely.
#[async_trait]
pub trait Application: Send + Sync {
    async fn startup(&self) {}

    async fn shutdown(&self) {}

    async fn create_session(&self) -> Session;
}

/// A worker application serving a fixed tool registry.
///
/// Covers the common case: a tool microservice whose collaborators are known
/// at startup and shared by every conversation.
pub struct ToolWorker {
    name: String,
    registry: Arc<ToolRegistry>,
}

impl ToolWorker {
    pub fn new(name: impl Into<String>, registry: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            registry: Arc::new(registry),
        }
    }
}

#[async_trait]
impl Application for ToolWorker {
    async fn startup(&self) {
        tracing::info!("Starting {} worker", self.name);
    }

    async fn shutdown(&self) {
        tracing::info!("Shutting down {} worker", self.name);
    }

    async fn create_session(&self) -> Session {
        Session::new(self.registry.clone())
    }
}

/// Built-in loopback collaborator: replies with the query it was given.
///
/// Lets a worker run out of the box; real deployments register their own
/// [`Tool`] implementations over stock feeds, news APIs, or models.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    async fn run(&self, query: &str) -> anyhow::Result<String> {
        Ok(format!("ECHO:{}", query))
    }
}
