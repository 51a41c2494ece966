//! CLI commands for nlip-agent using clap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::NlipClient;
use crate::config::{load_settings, Settings};
use crate::session::ToolRegistry;
use crate::worker::{run_worker, EchoTool, ToolWorker, WorkerConfig};

/// nlip-agent - inter-agent messaging over HTTP.
#[derive(Parser)]
#[command(name = "nlip-agent")]
#[command(version = "0.1.0")]
#[command(about = "Inter-agent messaging over HTTP", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a worker with the built-in echo collaborator
    Serve {
        /// Bind host (defaults to settings)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to settings)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send free text to a peer worker
    Send {
        /// Peer name from settings, or a base URL
        peer: String,

        /// Message to send
        message: String,

        /// Text subformat
        #[arg(long, default_value = "english")]
        subformat: String,

        /// Conversation ID to reuse (fresh one per invocation otherwise)
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Send a structured tool call to a peer worker
    Call {
        /// Peer name from settings, or a base URL
        peer: String,

        /// Tool name
        tool: String,

        /// Query argument for the tool
        #[arg(long, default_value = "")]
        query: String,

        /// Raw JSON object of args (overrides --query)
        #[arg(long)]
        args: Option<String>,

        /// Conversation ID to reuse (fresh one per invocation otherwise)
        #[arg(long)]
        conversation: Option<String>,
    },

    /// List configured peers
    Peers,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Serve { host, port } => cmd_serve(host.clone(), *port).await,
            Command::Send {
                peer,
                message,
                subformat,
                conversation,
            } => cmd_send(peer, message, subformat, conversation.clone()).await,
            Command::Call {
                peer,
                tool,
                query,
                args,
                conversation,
            } => cmd_call(peer, tool, query, args.as_deref(), conversation.clone()).await,
            Command::Peers => cmd_peers().await,
        }
    }
}

// Command implementations

async fn cmd_serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let settings = load_settings()?;
    let config = WorkerConfig {
        host: host.unwrap_or(settings.server.host),
        port: port.unwrap_or(settings.server.port),
    };

    let registry = ToolRegistry::new(Arc::new(EchoTool)).register("echo", Arc::new(EchoTool));
    let app = Arc::new(ToolWorker::new("echo", registry));

    run_worker(config, app).await?;
    Ok(())
}

async fn cmd_send(
    peer: &str,
    message: &str,
    subformat: &str,
    conversation: Option<String>,
) -> Result<()> {
    let settings = load_settings()?;
    let client = make_client(&settings, peer, conversation)?;

    let reply = client.send_text(message, subformat).await?;
    println!("{}", reply);
    Ok(())
}

async fn cmd_call(
    peer: &str,
    tool: &str,
    query: &str,
    args: Option<&str>,
    conversation: Option<String>,
) -> Result<()> {
    let settings = load_settings()?;
    let client = make_client(&settings, peer, conversation)?;

    let args = match args {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Object(map) => map,
            _ => anyhow::bail!("--args must be a JSON object"),
        },
        None => {
            let mut map = serde_json::Map::new();
            map.insert(
                "query".to_string(),
                serde_json::Value::String(query.to_string()),
            );
            map
        }
    };

    let reply = client.send_tool_call(tool, args).await?;
    println!("{}", reply);
    Ok(())
}

async fn cmd_peers() -> Result<()> {
    let settings = load_settings()?;

    if settings.peers.is_empty() {
        println!("No peers configured. Add them under \"peers\" in settings.json.");
        return Ok(());
    }

    let mut names: Vec<&String> = settings.peers.keys().collect();
    names.sort();
    for name in names {
        println!("{} -> {}", name, settings.peers[name]);
    }
    Ok(())
}

fn make_client(
    settings: &Settings,
    peer: &str,
    conversation: Option<String>,
) -> Result<NlipClient> {
    let base_url = settings.resolve_peer(peer)?;

    let client = match conversation {
        Some(id) => NlipClient::with_conversation_id(base_url, id),
        None => NlipClient::new(base_url),
    };

    Ok(client.with_timeout(Duration::from_secs(settings.http.timeout_secs)))
}
