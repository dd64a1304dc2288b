//! exmdb - command-line client for the exmdb store protocol
//!
//! Opens one session per invocation, runs a single call and prints the
//! decoded response.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use exmdb_client::{ConnectionConfig, ExmdbClient};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exmdb")]
#[command(about = "Command-line client for exmdb store servers")]
#[command(version)]
struct Cli {
    /// Server host name or address
    #[arg(long, env = "EXMDB_HOST", default_value = "::1")]
    host: String,

    /// Server port
    #[arg(short, long, env = "EXMDB_PORT", default_value_t = exmdb_protocol::DEFAULT_PORT)]
    port: u16,

    /// Data area prefix sent in the handshake
    #[arg(long, env = "EXMDB_PREFIX")]
    prefix: String,

    /// Store home directory passed to every call
    #[arg(long, env = "EXMDB_HOMEDIR")]
    homedir: String,

    /// Open a private (user) store session instead of a public one
    #[arg(long)]
    private: bool,

    /// Print responses as JSON
    #[arg(long)]
    json: bool,

    /// Socket timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the store is reachable
    Ping,

    /// Allocate a change number
    AllocateCn,

    /// List all property tags set on the store
    StoreTags,

    /// Read store properties
    StoreProps {
        /// Property tags (name, 0x hex or decimal)
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Read folder properties
    FolderProps {
        /// Folder id
        folder: String,

        /// Property tags (name, 0x hex or decimal)
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// List the subfolders of a folder
    Hierarchy {
        /// Parent folder id (defaults to the IPM subtree)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Delete a folder
    DeleteFolder {
        /// Folder id
        folder: String,

        /// Delete permanently
        #[arg(long)]
        hard: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let timeout = Duration::from_secs(cli.timeout);
    let config = ConnectionConfig::new(cli.host.clone(), cli.port)
        .with_connect_timeout(timeout)
        .with_read_timeout(timeout)
        .with_write_timeout(timeout);
    let mut client = ExmdbClient::new(config);

    if let Err(e) = client.connect(&cli.prefix, cli.private) {
        eprintln!("{}: {}", "Connection failed".red(), e);
        std::process::exit(1);
    }

    let session = commands::Session {
        homedir: &cli.homedir,
        private: cli.private,
        json: cli.json,
    };
    let result = commands::execute(&mut client, &session, cli.command);
    client.close();

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
