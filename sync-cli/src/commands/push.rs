//! Record local changes and publish them to the peer.

use anyhow::{Context, Result};

use super::open_session;
use crate::config::Settings;

/// Run the push command.
pub async fn run(settings: &Settings) -> Result<()> {
    let session = open_session(settings)?;

    println!("Pushing changes from {}...", settings.side);
    let report = session.push().await.context("Push failed")?;

    let changes = &report.changes;
    println!();
    println!("  Added:      {}", changes.added.len());
    println!("  Deleted:    {}", changes.deleted.len());
    println!("  Modified:   {}", changes.modified.len());
    println!("  Moved:      {}", changes.moved.len());
    println!("  Empty dirs: {}", changes.deleted_dirs.len());
    println!();
    println!(
        "  Scanned: {} hashed, {} cached",
        report.scan.hashed, report.scan.reused
    );
    println!("  Outbox:  {} pending", report.pending);
    println!("  Staged:  {} file(s)", report.staged);
    for path in &report.skipped {
        println!("  Skipped: {path} (no longer in folder)");
    }
    for path in &report.scan.skipped {
        println!("  Not scanned: {path}");
    }
    println!();

    if report.published {
        println!("Push successful!");
    } else {
        println!("Nothing to push.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{init, tests::plain_settings};
    use sync_types::{Side, UpdateJournal};
    use tempfile::tempdir;

    #[tokio::test]
    async fn push_requires_init() {
        let dir = tempdir().unwrap();
        let settings = plain_settings(dir.path(), Side::One);

        let err = run(&settings).await.unwrap_err();
        assert!(err.to_string().contains("Push failed"), "got: {err}");
    }

    #[tokio::test]
    async fn push_stages_new_files() {
        let dir = tempdir().unwrap();
        let settings = plain_settings(dir.path(), Side::One);
        init::run(&settings).await.unwrap();

        std::fs::create_dir_all(settings.folder.join("docs")).unwrap();
        std::fs::write(settings.folder.join("docs/a.txt"), "alpha").unwrap();
        run(&settings).await.unwrap();

        let side = settings.exchange_dir.join("side-1");
        assert_eq!(
            std::fs::read_to_string(side.join("files/docs/a.txt")).unwrap(),
            "alpha"
        );
        let journal =
            UpdateJournal::from_json(&std::fs::read(side.join("journal.json")).unwrap()).unwrap();
        assert!(journal.changes.added.contains("docs/a.txt"));
    }
}
