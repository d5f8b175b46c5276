//! The process-wide work queue.

use crate::core::event::{Event, JobFn};
use std::collections::VecDeque;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;

struct Job {
    func: JobFn,
    event: Arc<Event>,
}

struct JobNode {
    job: Job,
    next: *mut JobNode,
}

struct Inner {
    /// Push side: a lock-free intake stack. Producers swap themselves in
    /// as the new head.
    intake: AtomicPtr<JobNode>,

    /// Pull side: jobs drained from the intake, reversed back into
    /// submission order.
    ready: Mutex<VecDeque<Job>>,

    cv: Condvar,
}

unsafe impl Send for Inner {}
unsafe impl Sync for Inner {}

impl Inner {
    fn new() -> Self {
        Self {
            intake: AtomicPtr::new(ptr::null_mut()),
            ready: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
        }
    }

    fn enqueue(&self, job: Job) {
        let node = Box::into_raw(Box::new(JobNode {
            job,
            next: ptr::null_mut(),
        }));
        loop {
            let head = self.intake.load(Ordering::Acquire);
            unsafe { (*node).next = head };
            if self
                .intake
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
        // Taking the lock before notifying closes the window where a
        // worker checked an empty queue but has not started waiting yet.
        drop(self.ready.lock().unwrap());
        self.cv.notify_one();
    }

    /// Moves everything currently in the intake stack into `ready`,
    /// restoring submission order. Returns whether anything was drained.
    fn drain_intake(&self, ready: &mut VecDeque<Job>) -> bool {
        let mut node = self.intake.swap(ptr::null_mut(), Ordering::AcqRel);
        if node.is_null() {
            return false;
        }
        let mut drained = Vec::new();
        while !node.is_null() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next;
            drained.push(boxed.job);
        }
        for job in drained.into_iter().rev() {
            ready.push_back(job);
        }
        true
    }

    fn dequeue(&self) -> Job {
        let mut ready = self.ready.lock().unwrap();
        loop {
            if let Some(job) = ready.pop_front() {
                return job;
            }
            if self.drain_intake(&mut ready) {
                continue;
            }
            ready = self.cv.wait(ready).unwrap();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut node = self.intake.swap(ptr::null_mut(), Ordering::AcqRel);
        while !node.is_null() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next;
        }
    }
}

/// A pool of worker threads fed by a job queue. One process-wide instance
/// exists (see [`get_queue`]); workers run jobs to completion and signal
/// each job's event, and there is no cancellation.
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    fn with_concurrency(concurrency: usize) -> Self {
        let inner = Arc::new(Inner::new());
        for i in 0..concurrency.max(1) {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name(format!("rt1w-worker-{}", i))
                .spawn(move || loop {
                    let job = inner.dequeue();
                    (job.func)();
                    job.event.signal();
                })
                .expect("failed to spawn worker thread");
        }
        Self { inner }
    }

    fn enqueue(&self, job: Job) {
        self.inner.enqueue(job);
    }
}

/// The process-wide queue, started lazily with one worker per hardware
/// thread. Workers live until process exit.
pub fn get_queue() -> &'static WorkQueue {
    static QUEUE: OnceLock<WorkQueue> = OnceLock::new();
    QUEUE.get_or_init(|| {
        let n = thread::available_parallelism().map_or(1, |n| n.get());
        info!("Starting work queue with {} workers", n);
        WorkQueue::with_concurrency(n)
    })
}

/// Runs `func` on `queue` and returns an event that completes when it has
/// run. Without a queue the function runs immediately on the calling
/// thread and the returned event is already complete.
pub fn execute<F>(queue: Option<&'static WorkQueue>, func: F) -> Arc<Event>
where
    F: FnOnce() + Send + 'static,
{
    match queue {
        Some(q) => {
            let event = Event::new(1);
            q.enqueue(Job {
                func: Box::new(func),
                event: Arc::clone(&event),
            });
            event
        }
        None => {
            func();
            Event::new(0)
        }
    }
}

/// Runs `func` on `queue`, signalling `event` when it has run; inline on
/// the calling thread when `queue` is `None`.
pub fn execute_with_event(queue: Option<&'static WorkQueue>, event: Arc<Event>, func: JobFn) {
    match queue {
        Some(q) => q.enqueue(Job { func, event }),
        None => {
            func();
            event.signal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn inline_execution_completes_immediately() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let e = execute(None, move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert!(e.test());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_enqueued_jobs_run() {
        let q = get_queue();
        let count = Arc::new(AtomicUsize::new(0));

        let events: Vec<_> = (0..64)
            .map(|_| {
                let c = Arc::clone(&count);
                execute(Some(q), move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        Event::when_all(&events).wait();
        assert_eq!(count.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn jobs_can_enqueue_more_jobs() {
        let q = get_queue();
        let count = Arc::new(AtomicUsize::new(0));
        let inner_events = Arc::new(Mutex::new(Vec::new()));

        let c = Arc::clone(&count);
        let ev = Arc::clone(&inner_events);
        let outer = execute(Some(q), move || {
            let mut ev = ev.lock().unwrap();
            for _ in 0..8 {
                let c = Arc::clone(&c);
                ev.push(execute(Some(get_queue()), move || {
                    c.fetch_add(1, Ordering::SeqCst);
                }));
            }
        });

        outer.wait();
        let events = inner_events.lock().unwrap().clone();
        Event::when_all(&events).wait();
        assert_eq!(count.load(Ordering::SeqCst), 8);
    }
}
