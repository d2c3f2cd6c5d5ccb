//! Cooperative cancellation.
//!
//! The environment (for example a keystroke preempting a long injection
//! computation) raises the flag; injection code polls it at safe points and
//! returns [`InjectionError::Cancelled`], which is never converted into a
//! data error on the way up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{InjectionError, InjectionResult};

/// Cloneable cancellation flag shared between the environment and workers.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every computation holding a clone of this flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Return `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> InjectionResult<()> {
        if self.is_cancelled() {
            Err(InjectionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let token = Cancellation::new();
        let worker = token.clone();
        assert!(worker.check().is_ok());

        token.cancel();

        assert!(worker.is_cancelled());
        assert!(matches!(worker.check(), Err(InjectionError::Cancelled)));
    }
}
