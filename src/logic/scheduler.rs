//! Cancellable delayed tasks: the only source of "concurrency" in a draw.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Work to run once a delay has elapsed.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay. Every scheduled task can be disposed through its handle.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

/// Handle to a pending task. Cancelling after the task ran is a no-op.
#[derive(Debug)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<tokio::task::AbortHandle>,
}

impl TaskHandle {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<tokio::task::AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Timers on the tokio runtime the scheduler was created in.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Must be called from inside a tokio runtime.
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });
        TaskHandle::new(cancelled, Some(join.abort_handle()))
    }
}

struct Pending {
    cancelled: Arc<AtomicBool>,
    task: Task,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    /// Keyed by (due time, insertion order) so equal deadlines run FIFO.
    pending: BTreeMap<(Duration, u64), Pending>,
}

/// Virtual-clock scheduler. Nothing runs until [`ManualScheduler::advance`] or
/// [`ManualScheduler::run_until_idle`] is called.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.queue.lock().map(|q| q.now).unwrap_or_default()
    }

    /// Number of tasks waiting (cancelled ones included until their deadline passes).
    pub fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.pending.len()).unwrap_or_default()
    }

    /// Number of live (not cancelled) tasks.
    pub fn live(&self) -> usize {
        self.queue
            .lock()
            .map(|q| {
                q.pending
                    .values()
                    .filter(|p| !p.cancelled.load(Ordering::SeqCst))
                    .count()
            })
            .unwrap_or_default()
    }

    /// Move the clock forward by `by`, running every task that falls due, in order.
    /// Tasks scheduled by those tasks run too if they fall due within the window.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now() + by;
        let mut ran = 0;
        while let Some(pending) = self.pop_due(deadline) {
            if !pending.cancelled.load(Ordering::SeqCst) {
                (pending.task)();
                ran += 1;
            }
        }
        if let Ok(mut q) = self.queue.lock() {
            q.now = q.now.max(deadline);
        }
        ran
    }

    /// Run tasks in deadline order until none are left. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(pending) = self.pop_due(Duration::MAX) {
            if !pending.cancelled.load(Ordering::SeqCst) {
                (pending.task)();
                ran += 1;
            }
        }
        ran
    }

    fn pop_due(&self, deadline: Duration) -> Option<Pending> {
        let mut q = self.queue.lock().ok()?;
        let key = *q.pending.keys().next()?;
        if key.0 > deadline {
            return None;
        }
        q.now = q.now.max(key.0);
        q.pending.remove(&key)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        if let Ok(mut q) = self.queue.lock() {
            let due = q.now + delay;
            let seq = q.next_seq;
            q.next_seq += 1;
            q.pending.insert(
                (due, seq),
                Pending {
                    cancelled: cancelled.clone(),
                    task,
                },
            );
        }
        TaskHandle::new(cancelled, None)
    }
}
