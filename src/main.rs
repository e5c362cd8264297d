use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use meshchat::error::NodeError;
use meshchat::node::Node;
use meshchat::{config, election, membership, net, shell, shutdown, storage};

/// Peer-to-peer chat overlay with Bully leader election and leader-ordered
/// message replication.
///
/// Accepts the node id and port either as flags (`--node-id n1 --port
/// 5000`) or as the positional shorthand (`n1 5000`); a flag takes
/// precedence over a positional value given in the same invocation.
#[derive(Parser, Debug)]
#[command(name = "meshchat")]
struct Args {
    /// Node id (e.g. n1). Required unless --config is given.
    positional_node_id: Option<String>,
    /// TCP port to bind. Required unless --config is given.
    positional_port: Option<u16>,
    /// Node id, given as a flag instead of positionally.
    #[arg(long = "node-id")]
    node_id: Option<String>,
    /// TCP port, given as a flag instead of positionally.
    #[arg(long = "port")]
    port: Option<u16>,
    /// Load this node's identity, peers, and tunables from a TOML file
    /// instead of the compiled-in three-node mesh.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log verbosity used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn resolved_node_id(&self) -> Option<String> {
        self.node_id.clone().or_else(|| self.positional_node_id.clone())
    }

    fn resolved_port(&self) -> Option<u16> {
        self.port.or(self.positional_port)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.clone())).init();

    let cfg = match &args.config {
        Some(path) => config::load_from_file(path, args.resolved_node_id()).context("loading config file")?,
        None => {
            let node_id = args.resolved_node_id().context("NODE_ID is required when --config is not given")?;
            let port = args.resolved_port().context("PORT is required when --config is not given")?;
            config::load_default(node_id, port).context("resolving node id against the compiled-in network map")?
        }
    };

    let log_path = PathBuf::from(format!("{}_chat.jsonl", cfg.id));
    let file_log = storage::FileLog::init(log_path).await.context("initializing durable log")?;

    let bind_addr = (cfg.host.clone(), cfg.port);
    let listener = TcpListener::bind(bind_addr).await.map_err(NodeError::Bind).context("binding listener")?;

    log::info!("{}: listening on {}:{}", cfg.id, cfg.host, cfg.port);

    let node = Arc::new(Node::new(cfg, file_log));

    election::initialize(&node).await;

    tokio::spawn(net::listener::run(node.clone(), listener));
    tokio::spawn(membership::emit_loop(node.clone()));
    tokio::spawn(membership::scan_loop(node.clone()));
    tokio::spawn(election::election_loop(node.clone()));
    tokio::spawn(shutdown::watch(node.clone()));

    shell::run(node.clone()).await;

    log::info!("{}: shutting down", node.id);
    Ok(())
}
