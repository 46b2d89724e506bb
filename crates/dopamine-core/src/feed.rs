//! Change feeds over the document store.
//!
//! A feed yields the current snapshot first, then a fresh snapshot after each
//! store change it cares about. Snapshots are re-read rather than patched, so
//! a lagging receiver only skips intermediate states.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::storage::ChangeEvent;

type Matcher = Box<dyn Fn(&ChangeEvent) -> bool + Send + Sync>;
type Reader<T> = Box<dyn Fn() -> T + Send + Sync>;

pub struct Feed<T> {
    changes: broadcast::Receiver<ChangeEvent>,
    matches: Matcher,
    read: Reader<T>,
    primed: bool,
}

impl<T> Feed<T> {
    pub(crate) fn new(
        changes: broadcast::Receiver<ChangeEvent>,
        matches: impl Fn(&ChangeEvent) -> bool + Send + Sync + 'static,
        read: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            changes,
            matches: Box::new(matches),
            read: Box::new(read),
            primed: false,
        }
    }

    /// Next snapshot, or `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some((self.read)());
        }

        loop {
            match self.changes.recv().await {
                Ok(event) if (self.matches)(&event) => return Some((self.read)()),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "feed lagged, re-reading snapshot");
                    return Some((self.read)());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
