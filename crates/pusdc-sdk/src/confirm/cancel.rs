//! Teardown signal shared by every in-flight balance poll.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use log::debug;
use tokio_util::sync::CancellationToken;

/// Issues one cancellation token per poll and cancels them all on teardown.
///
/// After [`PollScope::cancel_all`] a fresh parent is installed, so tokens
/// issued later start uncancelled. Clones share the same parent.
#[derive(Debug, Clone, Default)]
pub struct PollScope {
    parent: Arc<Mutex<CancellationToken>>,
}

impl PollScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide scope for the host's teardown handler.
    pub fn global() -> &'static PollScope {
        static GLOBAL: OnceLock<PollScope> = OnceLock::new();
        GLOBAL.get_or_init(PollScope::new)
    }

    /// Token for a single poll; cancelled by the next `cancel_all`.
    pub fn issue(&self) -> CancellationToken {
        self.parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    /// Cancels every outstanding token. A no-op when nothing is polling.
    pub fn cancel_all(&self) {
        let mut parent = self.parent.lock().unwrap_or_else(PoisonError::into_inner);
        parent.cancel();
        *parent = CancellationToken::new();
        debug!("poll scope: cancelled outstanding polls");
    }
}
