use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "liftoff",
    about = "Post files to decentralized storage and host them on IPFS",
    long_about = "Liftoff posts files to a storage ledger and hosts them on IPFS. \
                  Folders are published as directory nodes, mirroring the layout on disk.",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML settings file; ignored when absent.
    #[arg(long, global = true, env = "LIFTOFF_CONFIG", default_value = "liftoff.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Publish a directory and print its root identifier
    Launch(LaunchArgs),
}

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Directory to publish
    pub dir: PathBuf,

    /// Signing ledger gateway URL
    #[arg(long, env = "LIFTOFF_LEDGER_URL")]
    pub ledger_url: Option<String>,

    /// Maximum file publishes in progress at once
    #[arg(long, env = "LIFTOFF_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Copies to store per file
    #[arg(long, env = "LIFTOFF_QUORUM")]
    pub quorum: Option<usize>,

    /// Where per-directory audit files are written
    #[arg(long, env = "LIFTOFF_AUDIT_DIR")]
    pub audit_dir: Option<PathBuf>,

    /// Skip writing audit files
    #[arg(long)]
    pub no_audit: bool,

    /// Seed for provider selection order
    #[arg(long, env = "LIFTOFF_SEED")]
    pub seed: Option<u64>,
}
