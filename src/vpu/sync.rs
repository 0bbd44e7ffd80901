//! Synchronization primitives of the device.
//!
//! The platform provides two things beyond the mutex: a counting semaphore
//! shared by all hardware threads, and an interrupt line to the host. Both
//! are modelled with their contracts only (wait/signal, raise/consume),
//! independent of how a target implements them.

use std::sync::{Condvar, Mutex};

/// A counting semaphore.
///
/// `up` increments the counter; `down` blocks the calling thread until the
/// counter is positive and decrements it. This is the completion-protocol
/// primitive: worker threads `up` it exactly once, the completion root
/// `down`s it once per worker.
pub struct Semaphore {
    count: Mutex<u32>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with the given initial count.
    pub fn new(initial: u32) -> Self {
        Semaphore {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Increments the counter and wakes one waiter.
    pub fn up(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.available.notify_one();
    }

    /// Blocks until the counter is positive, then decrements it.
    pub fn down(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
    }
}

/// The host-visible completion interrupt.
///
/// Exactly one thread raises it per launch; the host consumes it with
/// [`InterruptLine::wait`], which resets the line so the device can be
/// launched again.
pub struct InterruptLine {
    raised: Mutex<bool>,
    fired: Condvar,
}

impl InterruptLine {
    /// A quiescent interrupt line.
    pub fn new() -> Self {
        InterruptLine {
            raised: Mutex::new(false),
            fired: Condvar::new(),
        }
    }

    /// Raises the interrupt.
    pub fn raise(&self) {
        let mut raised = self.raised.lock().unwrap();
        *raised = true;
        self.fired.notify_all();
    }

    /// Blocks until the interrupt is raised, then clears it.
    pub fn wait(&self) {
        let mut raised = self.raised.lock().unwrap();
        while !*raised {
            raised = self.fired.wait(raised).unwrap();
        }
        *raised = false;
    }
}

impl Default for InterruptLine {
    fn default() -> Self {
        InterruptLine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_semaphore_counts_signals() {
        let sem = Arc::new(Semaphore::new(0));
        let n = 5;

        thread::scope(|scope| {
            for _ in 0..n {
                let sem = Arc::clone(&sem);
                scope.spawn(move || sem.up());
            }
            for _ in 0..n {
                sem.down();
            }
        });

        // All signals consumed: the counter is back at zero.
        assert_eq!(*sem.count.lock().unwrap(), 0);
    }

    #[test]
    fn test_semaphore_down_blocks_until_up() {
        let sem = Arc::new(Semaphore::new(0));
        thread::scope(|scope| {
            let waiter = {
                let sem = Arc::clone(&sem);
                scope.spawn(move || {
                    sem.down();
                    42
                })
            };
            sem.up();
            assert_eq!(waiter.join().unwrap(), 42);
        });
    }

    #[test]
    fn test_interrupt_wait_consumes_the_signal() {
        let irq = InterruptLine::new();
        irq.raise();
        irq.wait();
        assert!(!*irq.raised.lock().unwrap());

        // The line is reusable after a wait.
        irq.raise();
        irq.wait();
    }

    #[test]
    fn test_interrupt_wakes_waiting_host() {
        let irq = Arc::new(InterruptLine::new());
        thread::scope(|scope| {
            let host = {
                let irq = Arc::clone(&irq);
                scope.spawn(move || irq.wait())
            };
            irq.raise();
            host.join().unwrap();
        });
    }
}
