// src/watch/debounce.rs

//! Burst coalescing for the event-driven strategy.
//!
//! This is a pure state machine: callers pass the current `Instant` in, so it
//! can be unit tested without Tokio or real time.
//!
//! Flush rule: a burst is due once it has been quiet for `quiet` since its
//! most recent event, **or** once `max_wait` has elapsed since its first
//! event, whichever is earlier. Anchoring the cap to the first event means a
//! steady stream of events spaced just under `quiet` still flushes after at
//! most `max_wait`.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    max_wait: Duration,
    pending: BTreeSet<PathBuf>,
    first_event: Option<Instant>,
    last_event: Option<Instant>,
}

impl Debouncer {
    /// `max_wait` is clamped to at least `quiet`.
    pub fn new(quiet: Duration, max_wait: Duration) -> Self {
        Self {
            quiet,
            max_wait: max_wait.max(quiet),
            pending: BTreeSet::new(),
            first_event: None,
            last_event: None,
        }
    }

    /// Record a qualifying change to `path` observed at `now`.
    pub fn record(&mut self, path: PathBuf, now: Instant) {
        if self.first_event.is_none() {
            self.first_event = Some(now);
        }
        self.last_event = Some(now);
        self.pending.insert(path);
    }

    /// Put a batch back after a build was skipped.
    ///
    /// The batch starts a fresh quiet period from `now` but keeps the original
    /// burst anchor if one is still pending.
    pub fn requeue<I>(&mut self, paths: I, now: Instant)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            self.record(path, now);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// When the current burst becomes due, or `None` if nothing is pending.
    pub fn deadline(&self) -> Option<Instant> {
        let (first, last) = (self.first_event?, self.last_event?);
        Some((last + self.quiet).min(first + self.max_wait))
    }

    /// Take the pending burst if it is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        match self.deadline() {
            Some(deadline) if now >= deadline => Some(self.take_all()),
            _ => None,
        }
    }

    /// Take everything pending regardless of timing.
    pub fn take_all(&mut self) -> Vec<PathBuf> {
        self.first_event = None;
        self.last_event = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}
