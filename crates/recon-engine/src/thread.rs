use std::thread::{self, ThreadId};

/// Fail-fast check that blocking work stays off the primary thread.
#[derive(Clone, Debug)]
pub struct ThreadGuard {
    primary: Option<ThreadId>,
}

impl ThreadGuard {
    /// Treats the calling thread as the primary one.
    pub fn current_is_primary() -> Self {
        Self { primary: Some(thread::current().id()) }
    }

    /// No primary thread; every check passes.
    pub fn unrestricted() -> Self {
        Self { primary: None }
    }

    /// Panics when called on the primary thread.
    #[track_caller]
    pub fn assert_background(&self) {
        if self.primary == Some(thread::current().id()) {
            panic!("must not be called on the primary thread");
        }
    }
}
