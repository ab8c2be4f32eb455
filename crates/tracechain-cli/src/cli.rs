use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracechain_types::{ActorId, EventId, EventType};

#[derive(Parser)]
#[command(
    name = "tracechain",
    about = "Tracechain: tamper-evident supply-chain event ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the ledger journal (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the data directory and an empty journal
    Init,
    /// Record events for a batch and commit them in one block
    Record(RecordArgs),
    /// Manage the actor directory
    Actor(ActorArgs),
    /// Verify the integrity of the whole chain
    Verify,
    /// Show the timeline of a batch
    History(BatchArgs),
    /// Show a batch's events with their committing blocks
    Audit(BatchArgs),
    /// List blocks, newest first
    Blocks(BlocksArgs),
    /// Show one block
    Show(ShowArgs),
    /// Print the Merkle inclusion proof of an event
    Proof(ProofArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct RecordArgs {
    pub batch: String,
    /// Event type; repeat to record several events in one block
    #[arg(short = 't', long = "type", required = true)]
    pub event_types: Vec<EventType>,
    /// Acting party (defaults to an anonymous actor)
    #[arg(short, long)]
    pub actor: Option<ActorId>,
    /// JSON object attached to every recorded event
    #[arg(short, long)]
    pub payload: Option<String>,
}

#[derive(Args)]
pub struct ActorArgs {
    #[command(subcommand)]
    pub action: ActorAction,
}

#[derive(Subcommand)]
pub enum ActorAction {
    /// Register a new actor
    Add { name: String },
}

#[derive(Args)]
pub struct BatchArgs {
    pub batch: String,
}

#[derive(Args)]
pub struct BlocksArgs {
    #[arg(long, default_value = "1")]
    pub page: u64,
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: u64,
}

#[derive(Args)]
pub struct ShowArgs {
    pub index: u64,
}

#[derive(Args)]
pub struct ProofArgs {
    pub event: EventId,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
