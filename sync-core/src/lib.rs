//! # sync-core
//!
//! Pure logic for dirsync (no I/O, instant tests).
//!
//! This crate implements change classification and journal accumulation
//! without touching the filesystem, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take manifests and change
//! sets and produce new values without side effects. This enables:
//! - Instant unit tests (no temp dirs, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about what a push will publish
//!
//! Scanning, persistence and applying changes to a tree are performed by
//! `sync-client`, which feeds its results through these functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod journal;

pub use diff::diff;
pub use journal::{clear, merge};
