//! End-to-end push → pull scenarios through a shared-folder transport.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dirsync_client::{
    load_journal, CycleError, LocalTransport, SessionConfig, SyncSession, Transport,
};
use sync_content::{
    generate_keypair, EnvelopeCodec, EnvelopeConfig, EnvelopeMode, PasswordCodec,
    PublicKeyCodec,
};
use sync_types::{ErrorClass, Side};
use tempfile::{tempdir, TempDir};

struct Pair {
    _dir: TempDir,
    root: PathBuf,
    one: SyncSession<LocalTransport>,
    two: SyncSession<LocalTransport>,
}

impl Pair {
    fn new(codec_one: Arc<dyn EnvelopeCodec>, codec_two: Arc<dyn EnvelopeCodec>) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let session = |side: Side, codec| {
            let n = side.number();
            let folder = root.join(format!("pc-{n}"));
            fs::create_dir_all(&folder).unwrap();
            SyncSession::new(
                SessionConfig {
                    side,
                    folder,
                    manifest_path: root.join(format!("pc-{n}.manifest.json")),
                },
                LocalTransport::new(root.join("exchange")),
                codec,
            )
        };
        let one = session(Side::One, codec_one);
        let two = session(Side::Two, codec_two);
        Self {
            _dir: dir,
            root,
            one,
            two,
        }
    }

    fn folder(&self, side: u8) -> PathBuf {
        self.root.join(format!("pc-{side}"))
    }

    fn write(&self, side: u8, rel: &str, contents: &[u8]) {
        let path = self.folder(side).join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn read(&self, side: u8, rel: &str) -> Vec<u8> {
        fs::read(self.folder(side).join(rel)).unwrap()
    }
}

fn password_codec(password: &str) -> Arc<dyn EnvelopeCodec> {
    let config = EnvelopeConfig::new(EnvelopeMode::Password).with_iterations(1_000);
    Arc::new(PasswordCodec::new(password, &config))
}

fn tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    for entry in walk(root) {
        let rel = entry
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        out.push((rel, fs::read(&entry).unwrap()));
    }
    out.sort();
    out
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(walk(&path));
        } else {
            files.push(path);
        }
    }
    files
}

#[tokio::test]
async fn password_mode_full_cycle_converges() {
    let pair = Pair::new(password_codec("shared"), password_codec("shared"));
    pair.write(1, "notes/todo.txt", b"buy milk");
    pair.write(1, "photos/2024/cat.jpg", &[7u8; 70_000]);
    pair.one.init().unwrap();
    pair.two.init().unwrap();

    let pushed = pair.one.push().await.unwrap();
    assert_eq!(pushed.changes.added.len(), 2);
    assert!(pushed.published);

    // Envelopes never hold plaintext.
    let staged = pair.root.join("exchange/side-1/files/notes/todo.txt.enc");
    assert!(!fs::read(&staged).unwrap().windows(8).any(|w| w == b"buy milk"));

    let pulled = pair.two.pull().await.unwrap();
    assert!(pulled.applied.unwrap().is_clean());
    assert_eq!(tree(&pair.folder(1)), tree(&pair.folder(2)));

    // Consumed envelopes are gone and the outbox is cleared.
    assert!(!staged.exists());
    assert!(!pair.root.join("exchange/side-1/files/notes").exists());
    assert!(load_journal(&pair.root.join("exchange/side-1/journal.json"))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn public_key_mode_full_cycle_with_deletes_and_dirs() {
    let (private, public) = generate_keypair(2048).unwrap();
    let sender: Arc<dyn EnvelopeCodec> = Arc::new(PublicKeyCodec::new(Some(public), None));
    let receiver: Arc<dyn EnvelopeCodec> = Arc::new(PublicKeyCodec::new(None, Some(private)));
    let pair = Pair::new(sender, receiver);

    for side in [1, 2] {
        pair.write(side, "keep.txt", b"keep");
        pair.write(side, "old/dir/file.txt", b"bye");
    }
    pair.one.init().unwrap();
    pair.two.init().unwrap();

    fs::remove_dir_all(pair.folder(1).join("old")).unwrap();
    pair.write(1, "fresh.txt", b"new content");
    let pushed = pair.one.push().await.unwrap();
    assert!(pushed.changes.deleted.contains("old/dir/file.txt"));
    assert!(pushed.changes.deleted_dirs.contains("old"));
    assert!(pushed.changes.deleted_dirs.contains("old/dir"));

    let pulled = pair.two.pull().await.unwrap();
    let applied = pulled.applied.unwrap();
    assert!(applied.is_clean(), "{:?}", applied.errors);
    assert!(!pair.folder(2).join("old").exists());
    assert_eq!(pair.read(2, "fresh.txt"), b"new content");
    assert_eq!(tree(&pair.folder(1)), tree(&pair.folder(2)));
}

#[tokio::test]
async fn wrong_password_fails_closed_per_item() {
    let pair = Pair::new(password_codec("right"), password_codec("wrong"));
    pair.write(2, "a.txt", b"original");
    pair.write(1, "a.txt", b"original");
    pair.one.init().unwrap();
    pair.two.init().unwrap();

    pair.write(1, "a.txt", b"changed by side one");
    pair.write(1, "b.txt", b"brand new");
    pair.one.push().await.unwrap();

    let pulled = pair.two.pull().await.unwrap();
    let applied = pulled.applied.unwrap();
    assert_eq!(applied.errors.len(), 2);
    assert!(applied
        .errors
        .iter()
        .all(|e| e.class == ErrorClass::Integrity));
    assert_eq!(pair.read(2, "a.txt"), b"original");
    assert!(!pair.folder(2).join("b.txt").exists());
}

#[tokio::test]
async fn missing_envelope_does_not_block_the_batch() {
    let pair = Pair::new(password_codec("pw"), password_codec("pw"));
    pair.one.init().unwrap();
    pair.two.init().unwrap();

    pair.write(1, "a.txt", b"a");
    pair.write(1, "b.txt", b"b");
    pair.one.push().await.unwrap();
    fs::remove_file(pair.root.join("exchange/side-1/files/a.txt.enc")).unwrap();

    let applied = pair.two.pull().await.unwrap().applied.unwrap();
    assert_eq!(applied.errors.len(), 1);
    assert_eq!(applied.errors[0].path, "a.txt");
    assert_eq!(applied.errors[0].class, ErrorClass::NotFound);
    assert_eq!(pair.read(2, "b.txt"), b"b");
}

#[tokio::test]
async fn corrupt_journal_aborts_the_pull() {
    let pair = Pair::new(password_codec("pw"), password_codec("pw"));
    pair.one.init().unwrap();
    pair.two.init().unwrap();
    pair.write(2, "untouched.txt", b"x");

    let exchange = pair.two.transport().exchange_dir().to_path_buf();
    fs::write(exchange.join("side-1/journal.json"), b"{not json").unwrap();

    let err = pair.two.pull().await.unwrap_err();
    assert!(matches!(err, CycleError::State(_)));
    assert_eq!(err.class(), ErrorClass::Structural);
    assert!(err.class().is_fatal());
    assert!(pair.folder(2).join("untouched.txt").exists());
}

#[tokio::test]
async fn changes_flow_both_directions() {
    let pair = Pair::new(password_codec("pw"), password_codec("pw"));
    pair.one.init().unwrap();
    pair.two.init().unwrap();

    pair.write(1, "from-one.txt", b"1");
    pair.one.push().await.unwrap();
    pair.two.pull().await.unwrap();

    pair.write(2, "from-two.txt", b"2");
    let pushed = pair.two.push().await.unwrap();
    assert_eq!(
        pushed.changes.added.iter().collect::<Vec<_>>(),
        vec!["from-two.txt"]
    );
    pair.one.pull().await.unwrap();

    assert_eq!(tree(&pair.folder(1)), tree(&pair.folder(2)));
    assert!(pair.one.pull().await.unwrap().no_updates());
}
