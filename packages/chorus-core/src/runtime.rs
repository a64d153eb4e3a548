//! Task spawning abstraction.
//!
//! Finished-notifications are handled on their own tasks so a slow transport
//! call for one conversation never holds up events for another. Services
//! spawn through [`TaskSpawner`] so a host can supply its own runtime handle.

use std::future::Future;

/// Spawns detached background work.
///
/// Spawned tasks are fire-and-forget: no join handle is returned and the
/// caller cannot cancel them. Shutdown is coordinated separately through a
/// cancellation token.
pub trait TaskSpawner: Send + Sync {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// [`TaskSpawner`] backed by a Tokio runtime handle.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the handle of the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
