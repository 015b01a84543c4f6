//! Per-query completion barrier
//!
//! Each query submission creates one barrier initialized to the exact
//! number of work items it fans out. Every work item carries a guard that
//! signals the barrier exactly once, regardless of which worker ran it or
//! whether it ran at all; the submitting caller blocks in [`wait`] until
//! all guards have signalled.
//!
//! Signalling happens in the guard's `Drop` impl, so a work item that
//! unwinds (or is discarded before execution) still releases the waiter
//! instead of stalling it forever. A guard dropped during an unwind marks
//! the barrier interrupted and `wait` reports that to the caller.
//!
//! Barriers are never reused across query invocations.
//!
//! [`wait`]: CompletionBarrier::wait

use std::sync::{Arc, Condvar, Mutex};

use crate::viewtally::engine::error::{EngineError, EngineResult};

#[derive(Debug)]
struct BarrierState {
    outstanding: usize,
    interrupted: bool,
}

#[derive(Debug)]
struct BarrierInner {
    state: Mutex<BarrierState>,
    completed: Condvar,
}

/// Counts down from the submitted work-item count to zero.
#[derive(Debug)]
pub struct CompletionBarrier {
    inner: Arc<BarrierInner>,
}

impl CompletionBarrier {
    /// Create a barrier expecting exactly `count` guard signals.
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new(BarrierInner {
                state: Mutex::new(BarrierState {
                    outstanding: count,
                    interrupted: false,
                }),
                completed: Condvar::new(),
            }),
        }
    }

    /// Hand out one guard. The caller must create exactly as many guards
    /// as the count passed to [`CompletionBarrier::new`].
    pub fn guard(&self) -> BarrierGuard {
        BarrierGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Block until every guard has signalled.
    ///
    /// Spurious condvar wakeups are retried internally. Returns
    /// `Err(EngineError::Interrupted)` if any work item unwound instead of
    /// completing, so the caller can substitute its sentinel value.
    pub fn wait(&self, query: &'static str) -> EngineResult<()> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        while state.outstanding > 0 {
            state = self
                .inner
                .completed
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }

        if state.interrupted {
            Err(EngineError::Interrupted { query })
        } else {
            Ok(())
        }
    }
}

/// Exactly-once completion signal held by one work item.
#[derive(Debug)]
pub struct BarrierGuard {
    inner: Arc<BarrierInner>,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if std::thread::panicking() {
            state.interrupted = true;
        }

        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            self.inner.completed.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_for_zero_count() {
        let barrier = CompletionBarrier::new(0);
        assert!(barrier.wait("test").is_ok());
    }

    #[test]
    fn wait_blocks_until_all_guards_drop() {
        let barrier = CompletionBarrier::new(3);
        let guards: Vec<_> = (0..3).map(|_| barrier.guard()).collect();

        let handles: Vec<_> = guards
            .into_iter()
            .map(|guard| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    drop(guard);
                })
            })
            .collect();

        assert!(barrier.wait("test").is_ok());
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn guard_dropped_during_unwind_marks_interrupted() {
        let barrier = CompletionBarrier::new(2);
        let ok_guard = barrier.guard();
        let panicking_guard = barrier.guard();

        let handle = thread::spawn(move || {
            let _guard = panicking_guard;
            panic!("task blew up");
        });
        assert!(handle.join().is_err());

        drop(ok_guard);
        assert!(matches!(
            barrier.wait("test"),
            Err(EngineError::Interrupted { .. })
        ));
    }

    #[test]
    fn discarded_guard_still_signals() {
        let barrier = CompletionBarrier::new(1);
        drop(barrier.guard());
        assert!(barrier.wait("test").is_ok());
    }
}
