//! nlip-agent library root.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod worker;

pub use cli::Commands;
pub use client::NlipClient;
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use protocol::{attach_conversation, conversation_id, Envelope, Payload};
pub use session::{Session, SessionState, Tool, ToolRegistry};
pub use worker::{run_worker, Application, EchoTool, ToolWorker, WorkerConfig};
