// src/build/mod.rs

//! Build orchestration.
//!
//! This module is responsible for:
//! - Probing for the compiler, with a one-shot activation fallback.
//! - Assembling the compiler command line for a build mode.
//! - Running it through a pluggable [`ProcessRunner`].
//! - Turning the result into an immutable [`BuildRecord`] and feeding stats,
//!   history and persistence.
//!
//! It does **not** know how changes are detected; observers hand it a mode
//! and a list of changed files.

pub mod command;
pub mod orchestrator;
pub mod record;
pub mod runner;
pub mod toolchain;

pub use command::{ArtifactPaths, BuildCommand, assemble};
pub use orchestrator::{BuildRequest, Orchestrator};
pub use record::{BuildOutcome, BuildRecord, PendingBuild, collect_warnings};
pub use runner::{ProcessOutput, ProcessRunner, ProcessSpec, RealProcessRunner};
pub use toolchain::{ResolvedToolchain, ensure_toolchain};
