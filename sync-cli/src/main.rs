//! # dirsync
//!
//! Keep a folder in sync between two machines that never talk directly.
//! Each side publishes a journal of its changes and the changed files (as
//! envelopes) through an exchange directory; the other side applies them.
//!
//! ## Commands
//!
//! - `init`: Prepare the exchange area and record the initial manifest
//! - `keygen`: Generate an RSA key pair for public-key mode
//! - `push`: Publish local changes to the peer
//! - `pull`: Apply the peer's changes locally
//! - `status`: Show local sync state
//!
//! ## Example
//!
//! ```bash
//! # On each machine, once
//! dirsync keygen --private keys/me.pem --public keys/me.pub.pem
//! dirsync --settings dirsync.toml init
//!
//! # Whenever you like
//! dirsync push
//! dirsync pull
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sync_content::RSA_KEY_BITS;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{init, keygen, pull, push, status};
use config::Settings;

/// Two-sided folder synchronization through an exchange directory.
#[derive(Parser, Debug)]
#[command(name = "dirsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(long, short, global = true, default_value = "dirsync.toml")]
    settings: PathBuf,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create journals, staging directories and the initial manifest
    Init,

    /// Generate an RSA key pair for public-key mode
    Keygen {
        /// Where to write the private key (PKCS#8 PEM)
        #[arg(long)]
        private: PathBuf,

        /// Where to write the public key (SubjectPublicKeyInfo PEM)
        #[arg(long)]
        public: PathBuf,

        /// Modulus size in bits
        #[arg(long, default_value_t = RSA_KEY_BITS)]
        bits: usize,
    },

    /// Publish local changes to the peer
    Push,

    /// Apply the peer's pending changes
    Pull,

    /// Show sync status
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli).await;
    if let Err(err) = &result {
        eprintln!("Error: {err:#}");
    }
    ExitCode::from(exit_status(&result))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Keygen {
            private,
            public,
            bits,
        } => keygen::run(&private, &public, bits).await,
        Commands::Init => init::run(&load_settings(&cli.settings)?).await,
        Commands::Push => push::run(&load_settings(&cli.settings)?).await,
        Commands::Pull => pull::run(&load_settings(&cli.settings)?).await,
        Commands::Status => status::run(&load_settings(&cli.settings)?).await,
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    let settings = Settings::from_file(path)?;
    tracing::debug!(settings = %path.display(), side = %settings.side, "loaded settings");
    Ok(settings)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Any command that returned an error did not complete, whatever its class.
/// Per-item apply problems are reported by the command itself and exit 0.
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
