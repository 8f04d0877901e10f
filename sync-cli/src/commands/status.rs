//! Show local sync status.

use anyhow::{Context, Result};
use sync_types::unix_now;

use super::{format_age, open_session};
use crate::config::Settings;

/// Run the status command. Reads local state only; no transport calls.
pub async fn run(settings: &Settings) -> Result<()> {
    let session = open_session(settings)?;
    let status = session.status().context("Failed to read sync state")?;

    println!("=== dirsync status ===");
    println!();
    println!("Settings:");
    println!("  Side:      {}", status.side);
    println!("  Folder:    {}", settings.folder.display());
    println!("  Exchange:  {}", settings.exchange_dir.display());
    println!("  Envelope:  {}", settings.envelope.mode);
    match &settings.git {
        Some(git) => println!("  Transport: git (branch {})", git.branch),
        None => println!("  Transport: shared folder"),
    }
    println!();

    match &status.manifest {
        Some(manifest) => {
            println!("Manifest:");
            println!("  Files:   {}", manifest.files);
            println!("  Dirs:    {}", manifest.dirs);
            println!("  Size:    {} bytes", manifest.total_size);
            println!(
                "  Scanned: {}",
                format_age(manifest.generated_at, unix_now())
            );
        }
        None => {
            println!("Manifest: NOT INITIALIZED");
            println!();
            println!("Run 'dirsync init' to initialize.");
            return Ok(());
        }
    }
    println!();

    println!("Pending:");
    println!("  Outbox ({}): {}", status.side, status.outbox_pending);
    println!("  Inbox ({}):  {}", status.side.peer(), status.inbox_pending);
    Ok(())
}
