//! Completion events.

use crate::core::workq::{self, WorkQueue};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Condvar, Mutex};

pub type JobFn = Box<dyn FnOnce() + Send>;

struct Notification {
    queue: Option<&'static WorkQueue>,
    func: JobFn,
    event: Arc<Event>,
}

struct Pending {
    notifs: Vec<Notification>,
}

/// A countdown latch. Created with a count `n >= 0`; every `signal`
/// decrements it, and the decrement that reaches zero performs the
/// once-only completion transition: waiters are released and registered
/// notifications fire, most recently registered first.
///
/// The pending state lives in a `Mutex<Option<_>>`; taking it out on the
/// final signal is the single transition to the completed state, so
/// completion happens exactly once no matter how signals race.
pub struct Event {
    counter: AtomicI32,
    pending: Mutex<Option<Pending>>,
    cv: Condvar,
}

impl Event {
    /// Creates an event that completes after `n` signals. With `n == 0`
    /// the event is already complete.
    pub fn new(n: i32) -> Arc<Self> {
        assert!(n >= 0);
        Arc::new(Self {
            counter: AtomicI32::new(n),
            pending: Mutex::new(if n > 0 {
                Some(Pending { notifs: Vec::new() })
            } else {
                None
            }),
            cv: Condvar::new(),
        })
    }

    /// An event that completes once every event in `events` has completed.
    pub fn when_all(events: &[Arc<Event>]) -> Arc<Self> {
        let re = Event::new(events.len() as i32);
        for e in events {
            let re = Arc::clone(&re);
            e.notify(None, move || {
                re.signal();
            });
        }
        re
    }

    /// True once the event has completed.
    pub fn test(&self) -> bool {
        self.pending.lock().unwrap().is_none()
    }

    /// Blocks the calling thread until the event completes. Returns
    /// immediately if it already has.
    pub fn wait(&self) {
        let mut pending = self.pending.lock().unwrap();
        while pending.is_some() {
            pending = self.cv.wait(pending).unwrap();
        }
    }

    /// Decrements the counter. The signal that reaches zero releases all
    /// waiters and fires the registered notifications in LIFO order;
    /// notifications with a queue are enqueued there, the rest run inline
    /// on the signalling thread.
    pub fn signal(&self) {
        let prev = self.counter.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "Event signalled after completion");
        if prev != 1 {
            return;
        }

        let pending = self.pending.lock().unwrap().take();
        self.cv.notify_all();

        if let Some(p) = pending {
            for n in p.notifs.into_iter().rev() {
                workq::execute_with_event(n.queue, n.event, n.func);
            }
        }
    }

    /// Registers a continuation to run once the event completes, or runs
    /// it immediately if it already has. Returns an event that completes
    /// when the continuation has finished, strictly after this event.
    pub fn notify<F>(&self, queue: Option<&'static WorkQueue>, func: F) -> Arc<Event>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap();
        if let Some(p) = pending.as_mut() {
            let event = Event::new(1);
            p.notifs.push(Notification {
                queue,
                func: Box::new(func),
                event: Arc::clone(&event),
            });
            event
        } else {
            drop(pending);
            workq::execute(queue, func)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn zero_count_is_already_complete() {
        let e = Event::new(0);
        assert!(e.test());
        e.wait();
    }

    #[test]
    fn completes_after_exactly_n_signals() {
        let e = Event::new(3);
        e.signal();
        e.signal();
        assert!(!e.test());
        e.signal();
        assert!(e.test());
    }

    #[test]
    fn concurrent_waiters_all_return() {
        let e = Event::new(1);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let e = Arc::clone(&e);
            handles.push(thread::spawn(move || e.wait()));
        }
        thread::sleep(std::time::Duration::from_millis(20));
        e.signal();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn notify_fires_once_on_completion() {
        let e = Event::new(1);
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let done = e.notify(None, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.load(Ordering::SeqCst), 0);
        e.signal();
        done.wait();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notify_after_completion_runs_immediately() {
        let e = Event::new(0);
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let done = e.notify(None, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(done.test());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn child_event_completes_strictly_after_parent() {
        let parent = Event::new(1);
        let observed = Arc::new(AtomicUsize::new(0));

        let p = Arc::clone(&parent);
        let o = Arc::clone(&observed);
        let child = parent.notify(None, move || {
            // The parent must already be complete when this runs.
            o.store(p.test() as usize, Ordering::SeqCst);
        });

        parent.signal();
        child.wait();
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn when_all_requires_every_input() {
        let a = Event::new(1);
        let b = Event::new(2);
        let all = Event::when_all(&[Arc::clone(&a), Arc::clone(&b)]);

        a.signal();
        b.signal();
        assert!(!all.test());
        b.signal();
        all.wait();
        assert!(all.test());
    }

    #[test]
    fn notifications_fire_lifo() {
        let e = Event::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let o = Arc::clone(&order);
            e.notify(None, move || {
                o.lock().unwrap().push(i);
            });
        }
        e.signal();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }
}
