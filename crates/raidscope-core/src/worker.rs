//! Cancellation and the tiered polling workers.
//!
//! Each tier of the engine runs on its own OS thread: a tick closure plus a
//! cadence, a sleep mode and a scheduling priority. Ticks report [`Flow`] so
//! raid teardown is an ordinary return value, not a special error path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Outcome of one worker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The raid this worker serves is over.
    Ended,
}

/// A cloneable cancellation token with an interruptible wait.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                mutex: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Signal cancellation and wake every waiter.
    pub fn trigger(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.inner.mutex.lock();
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep up to `timeout`, waking early on cancellation.
    /// Returns true if cancellation was observed.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let mut guard = self.inner.mutex.lock();
        if self.is_cancelled() {
            return true;
        }
        self.inner.condvar.wait_while_for(&mut guard, |_| !self.is_cancelled(), timeout);
        self.is_cancelled()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Lets an action run at most once per interval.
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: Mutex::new(None) }
    }

    /// True when the interval has elapsed; marks the action as run.
    /// The first call is always ready.
    pub fn ready(&self) -> bool {
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPriority {
    Normal,
    AboveNormal,
    BelowNormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMode {
    /// Sleep the full interval after every tick.
    Fixed,
    /// Subtract tick time from the interval.
    Dynamic,
}

pub struct WorkerConfig {
    pub name: &'static str,
    pub interval: Duration,
    pub sleep: SleepMode,
    pub priority: WorkerPriority,
}

/// One polling tier on its own OS thread.
pub struct WorkerThread {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn a worker that calls `tick` on the configured cadence.
    ///
    /// The worker exits when the token triggers, `tick` reports
    /// [`Flow::Ended`], or `tick` fails fatally; in the latter two cases
    /// `on_end` runs once so the owner can tear the session down.
    /// Non-fatal tick errors are logged and the loop keeps going.
    pub fn spawn<F, E>(
        config: WorkerConfig,
        token: CancelToken,
        mut tick: F,
        on_end: E,
    ) -> Result<Self>
    where
        F: FnMut() -> Result<Flow> + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let name = config.name;
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            apply_priority(config.priority);
            debug!(worker = name, "worker started");
            let mut ended_by_tick = false;
            while !token.is_cancelled() {
                let started = Instant::now();
                match tick() {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Ended) => {
                        info!(worker = name, "raid over, stopping");
                        ended_by_tick = true;
                        break;
                    }
                    Err(err) if err.is_fatal() => {
                        warn!(worker = name, error = %err, "fatal error, stopping");
                        ended_by_tick = true;
                        break;
                    }
                    Err(err) => {
                        warn!(worker = name, error = %err, "tick failed");
                    }
                }
                let sleep = match config.sleep {
                    SleepMode::Fixed => config.interval,
                    SleepMode::Dynamic => config.interval.saturating_sub(started.elapsed()),
                };
                if !sleep.is_zero() && token.wait(sleep) {
                    break;
                }
            }
            if ended_by_tick {
                on_end();
            }
            debug!(worker = name, "worker stopped");
        })?;
        Ok(Self { name, handle: Some(handle) })
    }

    /// Block until the worker exits.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = self.name, "worker panicked");
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn apply_priority(priority: WorkerPriority) {
    use windows::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_ABOVE_NORMAL,
        THREAD_PRIORITY_BELOW_NORMAL,
    };

    let value = match priority {
        WorkerPriority::Normal => return,
        WorkerPriority::AboveNormal => THREAD_PRIORITY_ABOVE_NORMAL,
        WorkerPriority::BelowNormal => THREAD_PRIORITY_BELOW_NORMAL,
    };
    // SAFETY: GetCurrentThread returns a pseudo handle that needs no cleanup.
    unsafe {
        if let Err(err) = SetThreadPriority(GetCurrentThread(), value) {
            warn!(error = %err, "failed to set thread priority");
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn apply_priority(_priority: WorkerPriority) {}
