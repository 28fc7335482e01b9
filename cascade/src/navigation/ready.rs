//! One-shot readiness barrier gating behavior initialization.

use tokio::sync::watch;

/// Opens once per engine lifetime; waiters resume when it opens.
#[derive(Debug)]
pub struct ReadyBarrier {
    state: watch::Sender<bool>,
}

impl ReadyBarrier {
    /// Creates a barrier, optionally already open.
    #[must_use]
    pub fn new(open: bool) -> Self {
        let (state, _) = watch::channel(open);
        Self { state }
    }

    /// Opens the barrier. Returns true if this call opened it.
    pub fn open(&self) -> bool {
        self.state.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    /// Returns true once the barrier is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.state.borrow()
    }

    /// Waits until the barrier is open.
    pub async fn wait(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = receiver.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadyBarrier {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_open_barrier_does_not_block() {
        let barrier = ReadyBarrier::new(true);
        barrier.wait().await;
        assert!(!barrier.open());
    }

    #[tokio::test]
    async fn test_waiters_resume_on_open() {
        let barrier = Arc::new(ReadyBarrier::new(false));
        let waiter = tokio::spawn({
            let barrier = Arc::clone(&barrier);
            async move { barrier.wait().await }
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        assert!(barrier.open());
        assert!(barrier.is_open());
        waiter.await.unwrap();
    }

    #[test]
    fn test_opens_once() {
        let barrier = ReadyBarrier::new(false);
        assert!(barrier.open());
        assert!(!barrier.open());
        tokio_test::block_on(barrier.wait());
    }
}
