use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "hadcoin-cli")]
#[command(about = "CLI client for a hadcoin node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block
    Mine,
    /// Print the node's chain
    Chain,
    /// Check the node's chain integrity
    Valid,
    /// Submit a transaction
    Submit {
        /// Sender
        #[arg(long)]
        sender: String,
        /// Receiver
        #[arg(long)]
        receiver: String,
        /// Amount (may be negative)
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
    },
    /// Register peers with the node
    Connect {
        /// Peer URLs, e.g. http://127.0.0.1:5001
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Replace the node's chain with the longest valid peer chain
    Reconcile,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    receiver: String,
    amount: i64,
}

#[derive(Serialize)]
struct Nodes {
    nodes: Vec<String>,
}

impl Command {
    fn path(&self) -> &'static str {
        match self {
            Command::Mine => "/mine_block",
            Command::Chain => "/get_chain",
            Command::Valid => "/is_valid",
            Command::Submit { .. } => "/add_transaction",
            Command::Connect { .. } => "/connect_node",
            Command::Reconcile => "/replace_chain",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let url = format!("{}{}", cli.node.trim_end_matches('/'), cli.cmd.path());
    debug!(%url, "sending request");

    let client = reqwest::Client::new();
    let request = match cli.cmd {
        Command::Submit {
            sender,
            receiver,
            amount,
        } => client.post(&url).json(&Tx {
            sender,
            receiver,
            amount,
        }),
        Command::Connect { nodes } => client.post(&url).json(&Nodes { nodes }),
        Command::Mine | Command::Chain | Command::Valid | Command::Reconcile => client.get(&url),
    };

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
