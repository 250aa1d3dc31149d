use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct LatchState {
    remaining: usize,
    abandoned: usize,
}

/// Countdown that an awaiting post blocks on.
///
/// Each submitted work unit holds one [`CompletionTicket`]; the ticket counts
/// the latch down exactly once when it is dropped, whether the unit
/// finished, failed, panicked, or was thrown away before it started.
pub struct CompletionLatch {
    state: Mutex<LatchState>,
    done: Condvar,
}

impl fmt::Debug for CompletionLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CompletionLatch")
            .field("remaining", &state.remaining)
            .field("abandoned", &state.abandoned)
            .finish()
    }
}

/// How a wait on a [`CompletionLatch`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every unit ran
    Completed,
    /// At least one unit was dropped without running
    Abandoned,
    /// The wait gave up before the count reached zero
    TimedOut,
}

impl CompletionLatch {
    /// A latch expecting `count` tickets
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LatchState {
                remaining: count,
                abandoned: 0,
            }),
            done: Condvar::new(),
        })
    }

    /// Hand out one ticket. Call exactly as many times as the latch count.
    pub fn ticket(self: &Arc<Self>) -> CompletionTicket {
        CompletionTicket {
            latch: Arc::clone(self),
            started: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    fn count_down(&self, abandoned: bool) {
        let mut state = self.state.lock();
        state.remaining = state.remaining.saturating_sub(1);
        if abandoned {
            state.abandoned += 1;
        }
        if state.remaining == 0 {
            self.done.notify_all();
        }
    }

    /// Block until every ticket has been dropped, or until `timeout` passes.
    pub fn wait(&self, timeout: Option<Duration>) -> WaitOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        while state.remaining > 0 {
            match deadline {
                Some(deadline) => {
                    if self.done.wait_until(&mut state, deadline).timed_out() && state.remaining > 0 {
                        return WaitOutcome::TimedOut;
                    }
                }
                None => self.done.wait(&mut state),
            }
        }
        if state.abandoned > 0 {
            WaitOutcome::Abandoned
        } else {
            WaitOutcome::Completed
        }
    }
}

/// One unit's claim on a [`CompletionLatch`]
#[derive(Debug)]
pub struct CompletionTicket {
    latch: Arc<CompletionLatch>,
    started: bool,
}

impl CompletionTicket {
    /// Record that the unit began running
    pub fn start(&mut self) {
        self.started = true;
    }
}

impl Drop for CompletionTicket {
    fn drop(&mut self) {
        self.latch.count_down(!self.started);
    }
}
