//! Apply the peer's pending changes to the local folder.

use anyhow::{Context, Result};

use super::open_session;
use crate::config::Settings;

/// Run the pull command.
pub async fn run(settings: &Settings) -> Result<()> {
    let session = open_session(settings)?;

    println!(
        "Pulling changes from {} into {}...",
        settings.side.peer(),
        settings.side
    );
    let report = session.pull().await.context("Pull failed")?;

    let Some(applied) = &report.applied else {
        println!("No updates.");
        return Ok(());
    };

    println!();
    println!("  Deleted:  {}", applied.deleted);
    println!("  Moved:    {}", applied.moved);
    println!("  Pruned:   {} empty dir(s)", applied.pruned);
    println!("  Added:    {}", applied.added);
    println!("  Updated:  {}", applied.updated);
    println!("  Envelopes removed: {}", report.envelopes_removed);

    if !applied.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &applied.warnings {
            println!("  {warning}");
        }
    }
    if !applied.errors.is_empty() {
        println!();
        println!("Errors ({} item(s) skipped):", applied.errors.len());
        for error in &applied.errors {
            println!("  [{}] {}: {}", error.class, error.path, error.message);
        }
    }
    println!();

    if applied.is_clean() {
        println!("Pull successful!");
    } else {
        println!("Pull finished with problems; see above.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{init, push, tests::plain_settings};
    use sync_types::Side;
    use tempfile::tempdir;

    #[tokio::test]
    async fn pull_without_updates_succeeds() {
        let dir = tempdir().unwrap();
        let settings = plain_settings(dir.path(), Side::Two);
        init::run(&settings).await.unwrap();

        run(&settings).await.unwrap();
    }

    #[tokio::test]
    async fn push_then_pull_copies_files() {
        let dir = tempdir().unwrap();
        let one = plain_settings(dir.path(), Side::One);
        let two = plain_settings(dir.path(), Side::Two);
        init::run(&one).await.unwrap();
        init::run(&two).await.unwrap();

        std::fs::write(one.folder.join("note.txt"), "hello").unwrap();
        push::run(&one).await.unwrap();
        run(&two).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(two.folder.join("note.txt")).unwrap(),
            "hello"
        );
        assert!(!one.exchange_dir.join("side-1/files/note.txt").exists());
    }
}
