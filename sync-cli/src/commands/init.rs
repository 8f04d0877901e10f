//! Prepare the exchange area and the initial manifest.

use anyhow::{Context, Result};

use super::open_session;
use crate::config::Settings;

/// Run the init command.
pub async fn run(settings: &Settings) -> Result<()> {
    let session = open_session(settings)?;
    let report = session.init().context("Failed to initialize")?;

    println!("Initialized {}", settings.side);
    println!();
    println!("  Exchange: {}", settings.exchange_dir.display());
    println!("  Journals created: {}", report.journals_created);
    if report.manifest_created {
        println!(
            "  Manifest: {} ({} files)",
            settings.manifest.display(),
            report.files
        );
    } else {
        println!(
            "  Manifest already exists: {} ({} files)",
            settings.manifest.display(),
            report.files
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::plain_settings;
    use sync_types::Side;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_creates_journals_and_manifest() {
        let dir = tempdir().unwrap();
        let settings = plain_settings(dir.path(), Side::One);
        std::fs::write(settings.folder.join("a.txt"), "a").unwrap();

        run(&settings).await.unwrap();

        assert!(settings.manifest.is_file());
        for side in ["side-1", "side-2"] {
            let side_dir = settings.exchange_dir.join(side);
            assert!(side_dir.join("journal.json").is_file());
            assert!(side_dir.join("files").is_dir());
        }
    }

    #[tokio::test]
    async fn init_twice_keeps_existing_manifest() {
        let dir = tempdir().unwrap();
        let settings = plain_settings(dir.path(), Side::Two);

        run(&settings).await.unwrap();
        let first = std::fs::read(&settings.manifest).unwrap();
        std::fs::write(settings.folder.join("late.txt"), "late").unwrap();
        run(&settings).await.unwrap();

        assert_eq!(std::fs::read(&settings.manifest).unwrap(), first);
    }
}
