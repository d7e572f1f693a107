//! Session-scoped anti-repetition state.

use crate::text::session_key;
use std::collections::HashSet;
use std::sync::Mutex;

/// Whether seen-track state survives across calls on one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionScope {
    /// One state for the orchestrator's lifetime: tracks already returned
    /// are never suggested again by that instance.
    #[default]
    Instance,
    /// A fresh state for every call.
    Request,
}

/// Keys of every track returned to a caller, append-only.
///
/// The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct SessionDedupState {
    seen: Mutex<HashSet<String>>,
}

impl SessionDedupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str, artist: &str) -> bool {
        self.contains_key(&session_key(name, artist))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.seen
            .lock()
            .map(|seen| seen.contains(key))
            .unwrap_or(false)
    }

    /// Record tracks that were returned to a caller.
    pub fn record<'a>(&self, tracks: impl IntoIterator<Item = (&'a str, &'a str)>) {
        if let Ok(mut seen) = self.seen.lock() {
            for (name, artist) in tracks {
                seen.insert(session_key(name, artist));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
