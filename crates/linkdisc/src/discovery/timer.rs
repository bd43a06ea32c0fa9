// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared one-shot timer service.
//!
//! One dispatcher thread owns a deadline-ordered heap and hands expired tasks
//! to a small worker pool over a crossbeam channel, so a slow task delays only
//! its own follow-up, never the dispatch of other timeouts.
//!
//! ```text
//!  new_timeout() ──▶ [heap: deadline, seq] ──dispatcher──▶ channel ──▶ worker 0..N
//!                          ▲                                             │
//!                          └──────────── task reschedules itself ◀───────┘
//! ```
//!
//! Periodic work is built by having the task schedule its successor; every
//! scheduled run is represented by a [`Timeout`] that can be cancelled until
//! it fires.

use crossbeam::channel::{self, Sender};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

const STATE_PENDING: u8 = 0;
const STATE_CANCELLED: u8 = 1;
const STATE_EXPIRED: u8 = 2;

struct TimeoutInner {
    state: AtomicU8,
    pending: Arc<AtomicUsize>,
}

impl TimeoutInner {
    /// PENDING -> `to`; only one transition ever succeeds.
    fn transition(&self, to: u8) -> bool {
        let won = self
            .state
            .compare_exchange(STATE_PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
        won
    }
}

/// Handle to one scheduled task.
#[derive(Clone)]
pub struct Timeout {
    inner: Arc<TimeoutInner>,
}

impl Timeout {
    /// Cancel the task if it has not fired yet.
    ///
    /// Idempotent: returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        self.inner.transition(STATE_CANCELLED)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == STATE_CANCELLED
    }

    /// The task has been handed to a worker.
    pub fn is_expired(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == STATE_EXPIRED
    }
}

impl std::fmt::Debug for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.inner.state.load(Ordering::Acquire) {
            STATE_PENDING => "pending",
            STATE_CANCELLED => "cancelled",
            _ => "expired",
        };
        f.debug_struct("Timeout").field("state", &state).finish()
    }
}

struct Entry {
    deadline: Instant,
    seq: u64,
    timeout: Arc<TimeoutInner>,
    task: Task,
}

// BinaryHeap is a max-heap: invert so the earliest deadline is on top,
// FIFO among equal deadlines.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Entry {}

struct Queue {
    heap: BinaryHeap<Entry>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    cond: Condvar,
    pending: Arc<AtomicUsize>,
    seq: AtomicU64,
}

/// Timer service shared by every discovery agent of a node.
pub struct Timer {
    name: String,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Timer {
    /// Start the dispatcher and `workers` pool threads (at least one).
    pub fn new(name: &str, workers: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                heap: BinaryHeap::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            seq: AtomicU64::new(0),
        });

        let (job_tx, job_rx) = channel::unbounded::<Task>();
        let mut threads = Vec::with_capacity(workers.max(1) + 1);

        for idx in 0..workers.max(1) {
            let rx = job_rx.clone();
            #[allow(clippy::expect_used)] // thread spawn failure is unrecoverable
            let handle = thread::Builder::new()
                .name(format!("{}-worker-{}", name, idx))
                .spawn(move || {
                    for task in rx.iter() {
                        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                            log::debug!("[timer] Task panicked, worker continues");
                        }
                    }
                })
                .expect("failed to spawn timer worker thread");
            threads.push(handle);
        }

        let dispatcher_shared = Arc::clone(&shared);
        #[allow(clippy::expect_used)] // thread spawn failure is unrecoverable
        let dispatcher = thread::Builder::new()
            .name(format!("{}-timer", name))
            .spawn(move || dispatch_loop(&dispatcher_shared, &job_tx))
            .expect("failed to spawn timer dispatcher thread");
        threads.push(dispatcher);

        log::debug!(
            "[timer] Started '{}' with {} worker(s)",
            name,
            workers.max(1)
        );

        Self {
            name: name.to_string(),
            shared,
            threads: Mutex::new(threads),
        }
    }

    /// Schedule `task` to run once after `delay`.
    ///
    /// On a stopped timer the returned handle is already cancelled.
    pub fn new_timeout<F>(&self, delay: Duration, task: F) -> Timeout
    where
        F: FnOnce() + Send + 'static,
    {
        let inner = Arc::new(TimeoutInner {
            state: AtomicU8::new(STATE_PENDING),
            pending: Arc::clone(&self.shared.pending),
        });
        let timeout = Timeout {
            inner: Arc::clone(&inner),
        };

        let mut queue = self.shared.queue.lock();
        if queue.shutdown {
            inner.state.store(STATE_CANCELLED, Ordering::Release);
            log::debug!("[timer] '{}' is stopped, timeout discarded", self.name);
            return timeout;
        }

        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        queue.heap.push(Entry {
            deadline: Instant::now() + delay,
            seq: self.shared.seq.fetch_add(1, Ordering::Relaxed),
            timeout: inner,
            task: Box::new(task),
        });
        drop(queue);
        self.shared.cond.notify_one();

        timeout
    }

    /// Timeouts scheduled but neither fired nor cancelled.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.queue.lock().shutdown
    }

    /// Stop dispatching. Pending timeouts are cancelled, tasks already
    /// handed to workers finish.
    pub fn stop(&self) {
        let dropped = {
            let mut queue = self.shared.queue.lock();
            if queue.shutdown {
                return;
            }
            queue.shutdown = true;
            let entries: Vec<Entry> = queue.heap.drain().collect();
            entries
        };
        self.shared.cond.notify_all();

        let cancelled = dropped
            .iter()
            .filter(|e| e.timeout.transition(STATE_CANCELLED))
            .count();
        drop(dropped);

        // A task running on a worker may hold the last reference to us.
        let current = thread::current().id();
        let handles: Vec<JoinHandle<()>> = self.threads.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        log::debug!(
            "[timer] Stopped '{}' ({} pending timeout(s) cancelled)",
            self.name,
            cancelled
        );
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch_loop(shared: &Shared, jobs: &Sender<Task>) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            break;
        }

        let next_deadline = queue.heap.peek().map(|e| e.deadline);
        match next_deadline {
            None => shared.cond.wait(&mut queue),
            Some(deadline) if deadline > Instant::now() => {
                let _ = shared.cond.wait_until(&mut queue, deadline);
            }
            Some(_) => {
                if let Some(entry) = queue.heap.pop() {
                    // Cancelled entries are skipped here, lazily.
                    if entry.timeout.transition(STATE_EXPIRED) && jobs.send(entry.task).is_err() {
                        break;
                    }
                }
            }
        }
    }
    log::trace!("[timer] Dispatcher exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_timeout_fires() {
        let timer = Timer::new("test", 1);
        let (tx, rx) = mpsc::channel();

        let t = timer.new_timeout(Duration::from_millis(10), move || {
            tx.send(42).unwrap();
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 42);
        assert!(t.is_expired());
        assert!(!t.is_cancelled());
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let timer = Timer::new("test", 1);
        let (tx, rx) = mpsc::channel();

        for (delay, tag) in [(60u64, 'c'), (20, 'a'), (40, 'b')] {
            let tx = tx.clone();
            timer.new_timeout(Duration::from_millis(delay), move || {
                tx.send(tag).unwrap();
            });
        }

        let got: Vec<char> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(got, vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_cancel_prevents_run() {
        let timer = Timer::new("test", 1);
        let (tx, rx) = mpsc::channel::<()>();

        let t = timer.new_timeout(Duration::from_millis(50), move || {
            tx.send(()).unwrap();
        });
        assert_eq!(timer.pending_count(), 1);

        assert!(t.cancel());
        assert!(!t.cancel()); // idempotent
        assert!(t.is_cancelled());
        assert_eq!(timer.pending_count(), 0);

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let timer = Timer::new("test", 1);
        let (tx, rx) = mpsc::channel();
        let t = timer.new_timeout(Duration::ZERO, move || tx.send(()).unwrap());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        assert!(!t.cancel());
        assert!(t.is_expired());
    }

    #[test]
    fn test_self_rescheduling_chain() {
        fn chain(timer: Arc<Timer>, remaining: u32, tx: mpsc::Sender<u32>) {
            let next = Arc::clone(&timer);
            timer.new_timeout(Duration::from_millis(5), move || {
                tx.send(remaining).unwrap();
                if remaining > 1 {
                    chain(next, remaining - 1, tx);
                }
            });
        }

        let timer = Arc::new(Timer::new("test", 2));
        let (tx, rx) = mpsc::channel();
        chain(Arc::clone(&timer), 3, tx);

        let got: Vec<u32> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(got, vec![3, 2, 1]);
    }

    #[test]
    fn test_stop_cancels_pending() {
        let timer = Timer::new("test", 1);
        let t = timer.new_timeout(Duration::from_secs(60), || {});
        assert_eq!(timer.pending_count(), 1);

        timer.stop();
        assert!(timer.is_stopped());
        assert!(t.is_cancelled());
        assert_eq!(timer.pending_count(), 0);

        let late = timer.new_timeout(Duration::ZERO, || {});
        assert!(late.is_cancelled());
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let timer = Timer::new("test", 1);
        timer.new_timeout(Duration::ZERO, || panic!("boom"));

        let (tx, rx) = mpsc::channel();
        timer.new_timeout(Duration::from_millis(10), move || tx.send(()).unwrap());
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }
}
