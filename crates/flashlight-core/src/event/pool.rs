use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};

use crate::config::WorkerPoolConfig;
use crate::event::error::{EventSystemError, ListenerResult, Result};
use crate::event::latch::CompletionTicket;
use crate::event::listener::Listener;

/// One listener invocation submitted to the worker pool.
///
/// Work returned by [`WorkerPool::shut_down`] never started. The caller may
/// [`run`](Self::run) it or drop it; dropping it releases any post that is
/// awaiting it, which then reports the event as not canceled.
pub struct PendingInvocation {
    listener: Listener,
    event: Arc<dyn Any + Send + Sync>,
    event_type: &'static str,
    ticket: Option<CompletionTicket>,
}

impl PendingInvocation {
    pub(crate) fn new(
        listener: Listener,
        event: Arc<dyn Any + Send + Sync>,
        event_type: &'static str,
        ticket: Option<CompletionTicket>,
    ) -> Self {
        Self {
            listener,
            event,
            event_type,
            ticket,
        }
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Type name of the event this invocation would deliver
    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Invoke the listener on the calling thread
    pub fn run(mut self) -> ListenerResult {
        if let Some(ticket) = self.ticket.as_mut() {
            ticket.start();
        }
        let event: &dyn Any = &*self.event;
        self.listener.invoke_dyn(event)
    }
}

impl fmt::Debug for PendingInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInvocation")
            .field("listener", &self.listener.label())
            .field("event_type", &self.event_type)
            .field("awaited", &self.ticket.is_some())
            .finish()
    }
}

enum PoolState {
    Idle,
    Running(Runtime),
    ShutDown,
}

/// Lazily started worker pool for asynchronous dispatch.
///
/// Nothing is spawned until the first asynchronous post or an explicit
/// [`pre_start`](Self::pre_start). Each invocation runs as a blocking unit on
/// a tokio runtime owned by the pool.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    state: Mutex<PoolState>,
    queue: Arc<Mutex<VecDeque<PendingInvocation>>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            PoolState::Idle => "idle",
            PoolState::Running(_) => "running",
            PoolState::ShutDown => "shut down",
        };
        f.debug_struct("WorkerPool")
            .field("state", &state)
            .field("queued", &self.queue.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState::Idle),
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.state.lock(), PoolState::Running(_))
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(&*self.state.lock(), PoolState::ShutDown)
    }

    /// Number of submitted invocations no worker has picked up yet
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Start the core worker threads ahead of the first asynchronous post.
    ///
    /// The threads that run listeners are spawned and left idle, where the
    /// keep-alive holds them until work arrives. Returns the number of threads
    /// started, which is zero when the pool is already running.
    pub fn pre_start(&self) -> Result<usize> {
        let mut state = self.state.lock();
        if matches!(&*state, PoolState::ShutDown) {
            return Err(EventSystemError::PoolShutDown);
        }
        if matches!(&*state, PoolState::Running(_)) {
            return Ok(0);
        }
        let runtime = self.build_runtime()?;
        let started = self.warm(&runtime);
        *state = PoolState::Running(runtime);
        Ok(started)
    }

    /// Occupy `core_threads` blocking workers at once so each one is a
    /// distinct thread, then release them to idle.
    fn warm(&self, runtime: &Runtime) -> usize {
        let threads = self.core_threads();
        let barrier = Arc::new(Barrier::new(threads + 1));
        for _ in 0..threads {
            let barrier = Arc::clone(&barrier);
            runtime.spawn_blocking(move || {
                barrier.wait();
            });
        }
        barrier.wait();
        log::debug!("Warmed {} worker thread(s) in '{}'", threads, self.config.thread_name);
        threads
    }

    /// Warm threads never exceed the blocking thread cap
    fn core_threads(&self) -> usize {
        self.config.core_threads.max(1).min(self.config.max_threads.max(1))
    }

    /// Queue `invocation` and hand it to a worker, starting the pool if
    /// needed.
    pub fn submit(&self, invocation: PendingInvocation) -> Result<()> {
        let mut state = self.state.lock();
        if matches!(&*state, PoolState::Idle) {
            *state = PoolState::Running(self.build_runtime()?);
        }
        let PoolState::Running(runtime) = &*state else {
            return Err(EventSystemError::PoolShutDown);
        };

        self.queue.lock().push_back(invocation);
        let queue = Arc::clone(&self.queue);
        runtime.spawn_blocking(move || {
            let next = queue.lock().pop_front();
            if let Some(invocation) = next {
                execute(invocation);
            }
        });
        Ok(())
    }

    /// Stop the pool and return the invocations that never started.
    ///
    /// Running invocations are not waited for. Later submissions fail with
    /// [`EventSystemError::PoolShutDown`].
    pub fn shut_down(&self) -> Vec<PendingInvocation> {
        let (runtime, pending) = {
            let mut state = self.state.lock();
            let runtime = match std::mem::replace(&mut *state, PoolState::ShutDown) {
                PoolState::Running(runtime) => Some(runtime),
                PoolState::Idle | PoolState::ShutDown => None,
            };
            let pending: Vec<PendingInvocation> = self.queue.lock().drain(..).collect();
            (runtime, pending)
        };

        if let Some(runtime) = runtime {
            runtime.shutdown_background();
            log::info!(
                "Worker pool '{}' shut down, {} invocation(s) never started",
                self.config.thread_name,
                pending.len()
            );
        }
        pending
    }

    fn build_runtime(&self) -> Result<Runtime> {
        let runtime = Builder::new_multi_thread()
            // Listeners run on blocking threads; the scheduler only drives them.
            .worker_threads(1)
            .max_blocking_threads(self.config.max_threads.max(1))
            .thread_keep_alive(Duration::from_secs(self.config.keep_alive_secs))
            .thread_name(self.config.thread_name.clone())
            .build()
            .map_err(|source| EventSystemError::PoolStartFailed { source })?;
        log::info!(
            "Started worker pool '{}' ({} core thread(s), up to {} workers)",
            self.config.thread_name,
            self.core_threads(),
            self.config.max_threads.max(1)
        );
        Ok(runtime)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let PoolState::Running(runtime) = std::mem::replace(self.state.get_mut(), PoolState::ShutDown) {
            runtime.shutdown_background();
        }
    }
}

/// Run one invocation on a worker, confining its failure to this unit.
fn execute(invocation: PendingInvocation) {
    let label = invocation.listener().label().to_owned();
    let event_type = invocation.event_type();
    match panic::catch_unwind(AssertUnwindSafe(move || invocation.run())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::warn!("Asynchronous listener '{}' failed on {}: {}", label, event_type, e);
        }
        Err(_) => {
            log::warn!("Asynchronous listener '{}' panicked on {}", label, event_type);
        }
    }
}
