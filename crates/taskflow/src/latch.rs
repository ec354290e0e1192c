//! Once-only delivery of a run's terminal outcome

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

type Notify<T> = Box<dyn FnOnce(T) + Send>;

/// Forwards the first outcome it is given to a callback and drops the rest.
///
/// `signal` may be called from any number of threads at once; exactly one
/// call observes `true` and runs the callback. Later calls return `false`
/// and their outcomes are dropped without being inspected.
pub struct CompletionLatch<T> {
    fired: AtomicBool,
    notify: Mutex<Option<Notify<T>>>,
}

impl<T> CompletionLatch<T> {
    /// Create a latch that hands the winning outcome to `on_done`
    pub fn new<F>(on_done: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            fired: AtomicBool::new(false),
            notify: Mutex::new(Some(Box::new(on_done))),
        }
    }

    /// Deliver `outcome` if nothing was delivered before.
    ///
    /// Returns whether this call won.
    pub fn signal(&self, outcome: T) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let notify = self
            .notify
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(notify) = notify {
            notify(outcome);
        }
        true
    }

    /// Check if the latch has already fired
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl<T> fmt::Debug for CompletionLatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionLatch")
            .field("fired", &self.is_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_first_signal_wins() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let latch = CompletionLatch::new(move |value: u32| sink.lock().unwrap().push(value));

        assert!(!latch.is_fired());
        assert!(latch.signal(1));
        assert!(latch.is_fired());
        assert!(!latch.signal(2));
        assert!(!latch.signal(3));

        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_concurrent_signals_fire_once() {
        const THREADS: usize = 16;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let latch = Arc::new(CompletionLatch::new(move |_: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let latch = latch.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    latch.signal(i)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_output() {
        let latch = CompletionLatch::new(|_: ()| {});
        assert_eq!(format!("{latch:?}"), "CompletionLatch { fired: false }");
        latch.signal(());
        assert_eq!(format!("{latch:?}"), "CompletionLatch { fired: true }");
    }
}
