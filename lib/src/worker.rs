//! Single-worker task processors and the pass join barrier.

use parking_lot::{Condvar, Mutex};
use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    sync::Arc,
    thread::{self, JoinHandle},
};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    priority: i32,
    seq: u64,
    task: Task,
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest priority first, FIFO within a priority.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Queue {
    jobs: BinaryHeap<Job>,
    seq: u64,
    done: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    cond: Condvar,
}

/// A single worker thread draining a priority queue of tasks.
///
/// Tasks with equal priority run in submission order. On shutdown the
/// worker drains everything still queued before exiting. Tasks must not
/// block on their own processor.
pub struct DeferredProcessor {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl DeferredProcessor {
    pub fn new() -> DeferredProcessor {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: BinaryHeap::new(),
                seq: 0,
                done: false,
            }),
            cond: Condvar::new(),
        });

        let handle = {
            let shared = Arc::clone(&shared);

            thread::spawn(move || loop {
                let job = {
                    let mut queue = shared.queue.lock();

                    while queue.jobs.is_empty() && !queue.done {
                        shared.cond.wait(&mut queue);
                    }

                    match queue.jobs.pop() {
                        Some(job) => job,
                        None => break,
                    }
                };

                (job.task)();
            })
        };

        DeferredProcessor {
            shared,
            handle: Some(handle),
        }
    }

    /// Enqueue a task at the default priority.
    pub fn add_operation(&self, task: impl FnOnce() + Send + 'static) {
        self.add_operation_with_priority(task, 0);
    }

    /// Enqueue a task; higher priorities run first.
    pub fn add_operation_with_priority(&self, task: impl FnOnce() + Send + 'static, priority: i32) {
        {
            let mut queue = self.shared.queue.lock();
            let seq = queue.seq;
            queue.seq += 1;
            queue.jobs.push(Job {
                priority,
                seq,
                task: Box::new(task),
            });
        }

        self.shared.cond.notify_one();
    }
}

impl Default for DeferredProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredProcessor {
    fn drop(&mut self) {
        self.shared.queue.lock().done = true;
        self.shared.cond.notify_all();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A fixed array of processors used as a worker pool.
///
/// The i-th unit of work is pinned to processor `i mod n`; there is no work
/// stealing.
pub struct WorkerPool {
    workers: Vec<DeferredProcessor>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> WorkerPool {
        WorkerPool {
            workers: (0..workers).map(|_| DeferredProcessor::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Dispatch the `slot`-th unit of work to its pinned processor.
    pub fn dispatch(&self, slot: usize, task: impl FnOnce() + Send + 'static) {
        self.workers[slot % self.workers.len()].add_operation(task);
    }
}

/// Counts outstanding tasks of a pass and lets the driver join on them.
pub struct PassBarrier {
    pending: Mutex<usize>,
    cond: Condvar,
}

impl PassBarrier {
    pub fn new() -> PassBarrier {
        PassBarrier {
            pending: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Account for `count` tasks about to be dispatched.
    pub fn add(&self, count: usize) {
        *self.pending.lock() += count;
    }

    /// Mark one task complete.
    pub fn done(&self) {
        let mut pending = self.pending.lock();
        *pending -= 1;

        if *pending == 0 {
            self.cond.notify_all();
        }
    }

    /// Block until every accounted task has completed.
    pub fn wait(&self) {
        let mut pending = self.pending.lock();

        while *pending > 0 {
            self.cond.wait(&mut pending);
        }
    }
}

impl Default for PassBarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{DeferredProcessor, PassBarrier, WorkerPool};
    use parking_lot::Mutex;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    };

    #[test]
    fn test_tasks_run_and_drain_on_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let processor = DeferredProcessor::new();

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            processor.add_operation(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        drop(processor);
        assert_eq!(100, counter.load(Ordering::SeqCst));
    }

    #[test]
    fn test_priority_order_with_fifo_ties() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let processor = DeferredProcessor::new();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        // Hold the worker so the queue builds up.
        processor.add_operation(move || {
            gate_rx.recv().unwrap();
        });

        for (label, priority) in [("low", 0), ("high-a", 5), ("mid", 3), ("high-b", 5)] {
            let order = Arc::clone(&order);
            processor.add_operation_with_priority(
                move || {
                    order.lock().push(label);
                },
                priority,
            );
        }

        gate_tx.send(()).unwrap();
        drop(processor);

        assert_eq!(vec!["high-a", "high-b", "mid", "low"], *order.lock());
    }

    #[test]
    fn test_pool_dispatch_and_barrier() {
        let pool = WorkerPool::new(4);
        let barrier = Arc::new(PassBarrier::new());
        let counter = Arc::new(AtomicUsize::new(0));

        barrier.add(32);

        for slot in 0..32 {
            let barrier = Arc::clone(&barrier);
            let counter = Arc::clone(&counter);

            pool.dispatch(slot, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                barrier.done();
            });
        }

        barrier.wait();
        assert_eq!(32, counter.load(Ordering::SeqCst));
    }
}
