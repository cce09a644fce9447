use crate::commands;
use crate::config::Config;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "zeta-planner",
    version,
    about = "Compile strategy steps into ZetaChain transactions, execute them and track cross-chain completion"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        match self.command {
            Command::Plan(args) => commands::plan::run(args, config).await,
            Command::Track(args) => commands::track::run(args, config).await,
            Command::Execute(args) => commands::execute::run(args, config).await,
            Command::History(args) => commands::history::run(args, config).await,
            Command::Chains(args) => commands::chains::run(args, config).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a strategy file into unsigned transactions.
    Plan(PlanArgs),
    /// Follow the cross-chain transactions spawned by an inbound hash.
    Track(TrackArgs),
    /// Compile, sign and submit a strategy, resuming earlier runs.
    Execute(ExecuteArgs),
    /// Show the persisted execution log.
    History(HistoryArgs),
    /// Show registered chains, RPC endpoints and contracts.
    Chains(ChainsArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// JSON array of steps, or a strategy object with a `steps` field.
    #[arg(long)]
    pub steps: PathBuf,

    /// Sender/receiver address baked into calldata.
    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub batch_executor: Option<String>,

    /// Unix seconds used for swap deadlines (defaults to the current time).
    #[arg(long)]
    pub now: Option<u64>,

    #[arg(long)]
    pub allow_unsupported: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TrackArgs {
    #[arg(long)]
    pub hash: String,

    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    #[arg(long)]
    pub steps: PathBuf,

    /// Expected signer address; must match the key.
    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub batch_executor: Option<String>,

    #[arg(long)]
    pub allow_unsupported: bool,

    #[arg(long)]
    pub private_key: Option<String>,

    #[arg(long)]
    pub private_key_env: Option<String>,

    #[arg(long)]
    pub bridge_timeout_secs: Option<u64>,

    /// Keep the execution log in memory only.
    #[arg(long)]
    pub no_history: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[arg(long)]
    pub run: Option<String>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ChainsArgs {
    #[arg(long)]
    pub json: bool,
}
