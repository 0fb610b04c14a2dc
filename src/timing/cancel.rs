use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Cooperative cancellation shared between a sequencing thread and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled and wakes any sleeper. Blocks while a
    /// `run_unless_cancelled` closure is running, so once this returns no
    /// further guarded work can start.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Runs `f` only if the token is still live, holding the token lock for
    /// the duration of the call.
    pub fn run_unless_cancelled<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let cancelled = self.inner.0.lock();
        if *cancelled {
            return None;
        }
        let result = f();
        drop(cancelled);
        Some(result)
    }

    /// Waits for `duration`. Returns false if cancelled before or during the wait.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = lock.lock();
        while !*cancelled {
            if cvar.wait_until(&mut cancelled, deadline).timed_out() {
                return !*cancelled;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_full_duration_when_live() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_sleeper() {
        let token = CancellationToken::new();
        let sleeper = token.clone();
        let handle = std::thread::spawn(move || sleeper.sleep(Duration::from_secs(10)));

        std::thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        token.cancel();
        assert!(!handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn guarded_work_skipped_after_cancel() {
        let token = CancellationToken::new();
        assert_eq!(token.run_unless_cancelled(|| 1), Some(1));
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.run_unless_cancelled(|| 2), None);
        assert!(!token.sleep(Duration::from_secs(10)));
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
