// src/watch/mod.rs

//! Change detection.
//!
//! This module is responsible for:
//! - Content digests and the change cache that decides whether a file
//!   really changed.
//! - Deciding which files under the source dir are monitored.
//! - Two monitoring strategies behind one [`ChangeObserver`] trait:
//!   OS notifications with burst coalescing, and periodic polling.
//!
//! It does **not** know how a build runs; it hands the orchestrator a mode
//! and the changed files.

pub mod cache;
pub mod debounce;
pub mod events;
pub mod hash;
pub mod observer;
pub mod path_utils;
pub mod patterns;
pub mod polling;

pub use cache::ChangeCache;
pub use debounce::Debouncer;
pub use events::EventObserver;
pub use hash::{Digest, EMPTY_DIGEST, compute_file_digest};
pub use observer::{ChangeObserver, initial_build, scan_changed, select_observer};
pub use patterns::{SourceFilter, collect_source_files};
pub use polling::PollingObserver;
