//! Single outstanding request guard and session cancellation

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Admits at most one detection request at a time.
///
/// The flag is only cleared when the [`InFlightPermit`] is dropped.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` when a request is already outstanding
    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit {
                busy: self.busy.clone(),
            })
    }

    /// Whether a request is outstanding
    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`InFlightGuard`]; releases it on drop
#[derive(Debug)]
pub struct InFlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Cancellation token shared by every task of one capture session
#[derive(Debug, Clone)]
pub struct SessionToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<watch::Sender<bool>>,
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionToken {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(notify),
        }
    }

    /// Cancel the session; idempotent
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.notify.send_replace(true);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the session is cancelled
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.notify.subscribe();
        async move {
            // Sender lives in `self.notify`; an error means every token is gone
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_guard_admits_one() {
        let guard = InFlightGuard::new();

        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());
        assert!(guard.clone().try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_permit_released_across_threads() {
        let guard = InFlightGuard::new();
        let permit = guard.try_acquire().unwrap();

        std::thread::spawn(move || drop(permit)).join().unwrap();
        assert!(!guard.is_held());
    }

    #[tokio::test]
    async fn test_token_cancellation() {
        let token = SessionToken::new();
        let waiter = tokio::spawn(token.cancelled());
        assert!(!token.is_cancelled());

        token.clone().cancel();
        token.cancel();
        assert!(token.is_cancelled());

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_after_the_fact_resolves() {
        let token = SessionToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
