// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::WatchSection;
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// Decides which files under the source directory are monitored.
///
/// A file qualifies when its extension is in the recognised source set
/// (`[watch].extensions`, e.g. `cpp`, `h`, `hpp`) and it does not match any
/// `[watch].exclude` glob. Globs are evaluated against the path relative to
/// the source directory, with forward slashes.
#[derive(Clone)]
pub struct SourceFilter {
    extensions: Vec<String>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFilter")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl SourceFilter {
    pub fn new(extensions: &[String], exclude: &[String]) -> Result<Self> {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        let include_patterns: Vec<String> =
            extensions.iter().map(|ext| format!("**/*.{ext}")).collect();
        let include_set =
            build_globset(&include_patterns).context("building source extension globset")?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            extensions,
            include_set,
            exclude_set,
        })
    }

    pub fn from_config(watch: &WatchSection) -> Result<Self> {
        Self::new(&watch.extensions, &watch.exclude)
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Returns true if `rel_path` (relative to the source dir) is monitored.
    pub fn matches(&self, rel_path: &str) -> bool {
        // Extensions are matched case-insensitively; globset is case-sensitive.
        let lowered = rel_path.to_lowercase();
        if !self.include_set.is_match(&lowered) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Same as [`matches`](Self::matches) for an absolute path under `root`.
    pub fn matches_path(&self, root: &Path, path: &Path) -> bool {
        match relative_str(root, path) {
            Some(rel) => self.matches(&rel),
            None => false,
        }
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect every monitored file under `root`, sorted.
///
/// Used by the polling strategy on every tick and by both strategies to prime
/// the change cache before the initial build. A missing `root` yields an
/// empty list.
pub fn collect_source_files(
    fs: &dyn FileSystem,
    root: &Path,
    filter: &SourceFilter,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if filter.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
