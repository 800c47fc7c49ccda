use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "helen-vault")]
#[command(about = "Seed, back up and restore the Helen knowledge store")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file (defaults to $HELEN_CONFIG, then config/helen.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Vector service base URL
    #[arg(long, global = true, value_name = "URL")]
    pub service_url: Option<String>,

    /// Directory holding chroma_db/ and seeded_content.json
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Where backups are written and listed
    #[arg(long, global = true, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a backup of the store and seed ledger
    Backup {
        /// Backup name (default: helen_backup_YYYYMMDD_HHMMSS)
        #[arg(long)]
        name: Option<String>,
    },
    /// Restore a backup over the live store
    Restore {
        /// Backup name or path to a .zip
        #[arg(long)]
        name: String,

        /// Do not ask for confirmation when the service is running
        #[arg(short, long)]
        yes: bool,
    },
    /// List available backups, newest first
    List,
    /// Seed curated content (skips anything already seeded)
    Seed {
        /// Conversation guide JSON
        #[arg(long, value_name = "PATH")]
        guide: Option<PathBuf>,
    },
    /// Show service health and collection counts
    Status,
    /// Seed everything and take the initial_system_setup backup
    Init {
        /// Skip the initial backup
        #[arg(long)]
        no_backup: bool,
    },
}
