//! Registry of per-session reconciliation tasks.
//!
//! Each resident session has at most one scheduled check, identified by a
//! generation number so a finishing task never removes its successor.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Outcome of one reconciliation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The session is no longer resident; nothing was checked.
    Gone,
    /// Local and remote versions match.
    Unchanged,
    /// Remote version differed; the local copy was reloaded.
    Refreshed,
    /// The session vanished remotely and was dropped locally.
    Evicted,
}

impl ReconcileOutcome {
    /// Whether the periodic check for this session should stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Gone | Self::Evicted)
    }
}

struct Scheduled {
    generation: u64,
    token: CancellationToken,
}

/// Cancellation handles of scheduled checks, keyed by session id.
pub(crate) struct TaskRegistry {
    tasks: DashMap<String, Scheduled>,
    next_generation: AtomicU64,
    root: CancellationToken,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            next_generation: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    /// Register a check for `id`, cancelling any previous one.
    pub(crate) fn register(&self, id: &str) -> (u64, CancellationToken) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();
        let previous = self.tasks.insert(
            id.to_string(),
            Scheduled {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            trace!(session_id = %id, "Replacing scheduled check");
            previous.token.cancel();
        }
        (generation, token)
    }

    /// Cancel the check for `id` if it still belongs to `generation`.
    /// Returns true if a check was cancelled.
    pub(crate) fn cancel_generation(&self, id: &str, generation: u64) -> bool {
        match self.tasks.remove_if(id, |_, s| s.generation == generation) {
            Some((_, scheduled)) => {
                scheduled.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the registration for `id` if it still belongs to `generation`.
    pub(crate) fn release(&self, id: &str, generation: u64) {
        self.tasks.remove_if(id, |_, s| s.generation == generation);
    }

    /// Cancel every check, including ones registered concurrently.
    pub(crate) fn cancel_all(&self) {
        self.root.cancel();
        self.tasks.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_previous() {
        let registry = TaskRegistry::new();
        let (first_gen, first) = registry.register("s1");
        let (_, second) = registry.register("s1");

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(registry.len(), 1);

        // A stale generation does not remove the live registration.
        registry.release("s1", first_gen);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cancel_stale_generation_keeps_successor() {
        let registry = TaskRegistry::new();
        let (old_gen, old) = registry.register("s1");
        let (new_gen, new) = registry.register("s1");

        assert!(!registry.cancel_generation("s1", old_gen));
        assert!(old.is_cancelled());
        assert!(!new.is_cancelled());
        assert_eq!(registry.len(), 1);

        assert!(registry.cancel_generation("s1", new_gen));
        assert!(new.is_cancelled());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_cancel_and_cancel_all() {
        let registry = TaskRegistry::new();
        let (a_gen, a) = registry.register("a");
        let (_, b) = registry.register("b");

        assert!(registry.cancel_generation("a", a_gen));
        assert!(!registry.cancel_generation("a", a_gen));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());

        registry.cancel_all();
        assert!(b.is_cancelled());
        assert_eq!(registry.len(), 0);

        // Registered after shutdown: born cancelled.
        let (_, c) = registry.register("c");
        assert!(c.is_cancelled());
    }
}
