//! Subcommands and their execution.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use corelib::{NodeId, Roster};
use replication::{
    BootMode, CommitLog, ConsistencyLevel, NodeSettings, RecoveryMode, ReplicaNode,
};
use serde::Serialize;
use wire::{
    request, send, Message, PutRequest, RequestReceiver, Response, Router, TcpPeerClient,
    WireError, DEFAULT_PEER_TIMEOUT,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a replica node
    Serve(ServeArgs),
    /// Push the roster to every node so they partition the key space
    Init(InitArgs),
    /// Write a value through a coordinator node
    Put(PutArgs),
    /// Read a value through a coordinator node
    Get(GetArgs),
    /// Truncate the commit log of every roster member under a data directory
    Reset(ResetArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// This node's name; must appear in the roster
    #[arg(long)]
    pub name: String,

    /// Listening port
    #[arg(long)]
    pub port: u16,

    /// Listening address
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Roster file (`name host port` per line)
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Load the roster and replay the commit log instead of waiting for init
    #[arg(long)]
    pub rebuild: bool,

    /// Failure recovery mechanism
    #[arg(long, default_value = "none")]
    pub mode: RecoveryMode,

    /// Directory holding `<name>.log`
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Bound on every peer connect, read and write
    #[arg(long, default_value_t = 2000)]
    pub peer_timeout_ms: u64,

    /// Owners per key
    #[arg(long, default_value_t = 3)]
    pub replication_factor: usize,
}

impl ServeArgs {
    pub fn boot_mode(&self) -> BootMode {
        if self.rebuild {
            BootMode::Rebuild
        } else {
            BootMode::Fresh
        }
    }

    pub fn settings(&self) -> anyhow::Result<NodeSettings> {
        if self.replication_factor == 0 {
            bail!("replication factor must be at least 1");
        }
        Ok(NodeSettings {
            recovery: self.mode,
            replication_factor: self.replication_factor,
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        corelib::topology::resolve(&self.bind, &self.port.to_string())
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid listen address {}:{}", self.bind, self.port))
    }

    pub fn rebuild_roster(&self) -> anyhow::Result<Roster> {
        let Some(path) = self.roster.as_ref() else {
            bail!("--rebuild requires --roster");
        };
        Roster::load(path).with_context(|| format!("cannot load roster {}", path.display()))
    }

    fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(long)]
    pub roster: PathBuf,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PutArgs {
    /// Coordinator address, e.g. 127.0.0.1:9001
    #[arg(long)]
    pub node: SocketAddr,

    #[arg(long)]
    pub key: u32,

    #[arg(long)]
    pub value: String,

    #[arg(long, default_value = "one")]
    pub consistency: ConsistencyLevel,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    #[arg(long)]
    pub node: SocketAddr,

    #[arg(long)]
    pub key: u32,

    #[arg(long, default_value = "one")]
    pub consistency: ConsistencyLevel,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    #[arg(long)]
    pub roster: PathBuf,

    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(long)]
    pub json: bool,
}

/// What a command produced, for display.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Stopped { node: String },
    Initialized { reached: Vec<String>, failed: Vec<String> },
    Reply(Response),
    /// The coordinator closed the connection without answering.
    NoReply { key: u32 },
    Reset { logs: Vec<PathBuf> },
}

impl CommandResult {
    pub fn print(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
        } else {
            println!("{}", self);
        }
        Ok(())
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Stopped { node } => write!(f, "{} stopped", node),
            CommandResult::Initialized { reached, failed } => {
                write!(f, "init sent to {}", reached.join(", "))?;
                if !failed.is_empty() {
                    write!(f, "; unreachable: {}", failed.join(", "))?;
                }
                Ok(())
            }
            CommandResult::Reply(r) if r.status && !r.value.is_empty() => write!(
                f,
                "key {} = {:?} (timestamp {}, from {}): {}",
                r.key, r.value, r.arrival, r.origin_replica, r.message
            ),
            CommandResult::Reply(r) if r.status => write!(f, "key {}: {}", r.key, r.message),
            CommandResult::Reply(r) => write!(f, "key {} failed: {}", r.key, r.message),
            CommandResult::NoReply { key } => {
                write!(f, "key {}: no acknowledgment from coordinator", key)
            }
            CommandResult::Reset { logs } => write!(f, "reset {} commit log(s)", logs.len()),
        }
    }
}

impl Command {
    pub fn wants_json(&self) -> bool {
        match self {
            Command::Serve(_) => false,
            Command::Init(args) => args.json,
            Command::Put(args) => args.json,
            Command::Get(args) => args.json,
            Command::Reset(args) => args.json,
        }
    }

    pub async fn execute(self) -> anyhow::Result<CommandResult> {
        match self {
            Command::Serve(args) => serve(args).await,
            Command::Init(args) => init(args).await,
            Command::Put(args) => {
                let message =
                    Message::ClientPut(PutRequest::client(args.key, args.value, args.consistency));
                client_request(args.node, args.key, &message).await
            }
            Command::Get(args) => {
                let message = Message::ClientRead {
                    key: args.key,
                    consistency: args.consistency,
                };
                client_request(args.node, args.key, &message).await
            }
            Command::Reset(args) => reset(args),
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<CommandResult> {
    let settings = args.settings()?;
    let addr = args.listen_addr()?;
    let local = NodeId::new(args.name.clone());

    let log_path = CommitLog::path_for(&args.data_dir, &local);
    let log = CommitLog::open(&log_path)
        .with_context(|| format!("cannot open commit log {}", log_path.display()))?;
    let peers = Arc::new(TcpPeerClient::new(args.peer_timeout()));
    let node = Arc::new(ReplicaNode::new(local.clone(), settings, log, peers));

    match args.boot_mode() {
        BootMode::Rebuild => {
            let roster = args.rebuild_roster()?;
            let applied = node
                .rebuild(roster)
                .with_context(|| format!("cannot rebuild {}", local))?;
            tracing::info!(node = %local, applied, "initialized from roster file");
        }
        BootMode::Fresh => tracing::info!(node = %local, "waiting for init message"),
    }

    let receiver = RequestReceiver::bind(addr, Arc::new(Router::new(Arc::clone(&node))))
        .await
        .with_context(|| format!("cannot listen on {}", addr))?
        .with_io_timeout(args.peer_timeout());
    tracing::info!(
        node = %local,
        %addr,
        mode = %node.recovery(),
        "replica serving"
    );

    receiver
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(CommandResult::Stopped {
        node: local.to_string(),
    })
}

async fn init(args: InitArgs) -> anyhow::Result<CommandResult> {
    let roster = Roster::load(&args.roster)
        .with_context(|| format!("cannot load roster {}", args.roster.display()))?;
    let message = Message::init(&roster);

    let mut reached = Vec::new();
    let mut failed = Vec::new();
    for member in roster.members() {
        match send(member.addr, &message, DEFAULT_PEER_TIMEOUT).await {
            Ok(()) => reached.push(member.name().to_string()),
            Err(err) => {
                tracing::warn!(node = %member, error = %err, "init not delivered");
                failed.push(member.name().to_string());
            }
        }
    }
    Ok(CommandResult::Initialized { reached, failed })
}

async fn client_request(
    node: SocketAddr,
    key: u32,
    message: &Message,
) -> anyhow::Result<CommandResult> {
    // The coordinator may probe and fan out before answering.
    let limit = DEFAULT_PEER_TIMEOUT * 4;
    match request(node, message, limit).await {
        Ok(Message::Response(response)) => Ok(CommandResult::Reply(response)),
        Ok(other) => bail!("unexpected {} from {}", other.kind(), node),
        Err(WireError::ConnectionClosed) => Ok(CommandResult::NoReply { key }),
        Err(err) => Err(err).with_context(|| format!("request to {} failed", node)),
    }
}

fn reset(args: ResetArgs) -> anyhow::Result<CommandResult> {
    let roster = Roster::load(&args.roster)
        .with_context(|| format!("cannot load roster {}", args.roster.display()))?;
    let mut logs = Vec::new();
    for id in roster.ids() {
        let path = CommitLog::path_for(&args.data_dir, id);
        CommitLog::reset(&path).with_context(|| format!("cannot reset {}", path.display()))?;
        logs.push(path);
    }
    Ok(CommandResult::Reset { logs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::Key;
    use tempfile::TempDir;

    #[test]
    fn test_reset_truncates_each_member_log() {
        let dir = TempDir::new().unwrap();
        let roster = dir.path().join("cluster.txt");
        std::fs::write(&roster, "A 127.0.0.1 9001\nB 127.0.0.1 9002\n").unwrap();
        {
            let log = CommitLog::open(dir.path().join("A.log")).unwrap();
            log.append(Key(1), "x", 1).unwrap();
        }

        let result = reset(ResetArgs {
            roster,
            data_dir: dir.path().to_path_buf(),
            json: false,
        })
        .unwrap();
        let CommandResult::Reset { logs } = result else {
            panic!("expected reset");
        };
        assert_eq!(logs.len(), 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("A.log")).unwrap(), "");
    }

    #[test]
    fn test_reply_display() {
        let ok = CommandResult::Reply(Response::success(10, "value retrieved").with_value("x", 5));
        assert!(ok.to_string().contains("\"x\""));
        let failed = CommandResult::Reply(Response::failure(10, "not enough replicas are up"));
        assert_eq!(failed.to_string(), "key 10 failed: not enough replicas are up");
    }

    #[test]
    fn test_json_output_is_tagged() {
        let value = serde_json::to_value(CommandResult::NoReply { key: 3 }).unwrap();
        assert_eq!(value["result"], "no_reply");
        assert_eq!(value["key"], 3);
    }
}
