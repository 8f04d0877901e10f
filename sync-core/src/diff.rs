//! Diff engine: classify every change between two manifests.
//!
//! Pure function of its inputs. Given the same two manifests the resulting
//! [`ChangeSet`] is identical across runs, because every intermediate
//! collection is ordered.
//!
//! # Move pairing
//!
//! A deleted path and an added path that share a content hash are reported
//! as one move. When several files share a hash, deleted paths and added
//! paths are each sorted lexicographically and zipped pairwise; whichever
//! side has leftovers keeps them as plain deletes or adds. Identical-content
//! files are indistinguishable from renames, so this is a deterministic
//! heuristic rather than a ground truth.

use std::collections::{BTreeMap, BTreeSet};

use sync_types::{ChangeSet, ContentHash, Manifest, ROOT_DIR_SENTINEL};

/// Compare `old` against `new` and classify every difference.
pub fn diff(old: &Manifest, new: &Manifest) -> ChangeSet {
    let mut added: BTreeSet<String> = new
        .files
        .keys()
        .filter(|path| !old.files.contains_key(*path))
        .cloned()
        .collect();

    let mut deleted: BTreeSet<String> = old
        .files
        .keys()
        .filter(|path| !new.files.contains_key(*path))
        .cloned()
        .collect();

    // Hash is authoritative: a touched file with identical content is unchanged.
    let modified: BTreeSet<String> = old
        .files
        .iter()
        .filter(|(path, record)| {
            new.files
                .get(*path)
                .is_some_and(|current| current.hash != record.hash)
        })
        .map(|(path, _)| path.clone())
        .collect();

    let moved = pair_moves(old, new, &mut deleted, &mut added);
    let deleted_dirs = deleted_dirs(old, new);

    ChangeSet {
        added,
        deleted,
        modified,
        moved,
        deleted_dirs,
    }
}

/// Pair deleted and added paths with equal content hashes.
///
/// Paired paths are removed from `deleted` and `added`.
fn pair_moves(
    old: &Manifest,
    new: &Manifest,
    deleted: &mut BTreeSet<String>,
    added: &mut BTreeSet<String>,
) -> BTreeSet<(String, String)> {
    let deleted_by_hash = group_by_hash(deleted, old);
    let added_by_hash = group_by_hash(added, new);

    let mut moved = BTreeSet::new();
    for (hash, sources) in &deleted_by_hash {
        let Some(targets) = added_by_hash.get(hash) else {
            continue;
        };
        for (source, target) in sources.iter().zip(targets) {
            moved.insert((source.clone(), target.clone()));
        }
    }

    for (source, target) in &moved {
        deleted.remove(source);
        added.remove(target);
    }
    moved
}

/// Group `paths` by their hash in `manifest`, each group in ascending order.
fn group_by_hash(
    paths: &BTreeSet<String>,
    manifest: &Manifest,
) -> BTreeMap<ContentHash, Vec<String>> {
    let mut groups: BTreeMap<ContentHash, Vec<String>> = BTreeMap::new();
    // BTreeSet iteration is sorted, so each group comes out sorted too.
    for path in paths {
        if let Some(record) = manifest.get(path) {
            groups.entry(record.hash).or_default().push(path.clone());
        }
    }
    groups
}

/// Directories present in `old` but gone from `new` that hold no tracked file.
fn deleted_dirs(old: &Manifest, new: &Manifest) -> BTreeSet<String> {
    old.dirs
        .difference(&new.dirs)
        .filter(|dir| !new.has_files_under(dir))
        .map(|dir| {
            if dir.is_empty() {
                ROOT_DIR_SENTINEL.to_string()
            } else {
                dir.clone()
            }
        })
        .collect()
}
