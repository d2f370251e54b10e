use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::utils::CancelToken;

type Listeners = Arc<Mutex<Vec<Box<dyn Fn() + Send>>>>;

/// Wall-clock tick source. A timer owns a set of listener callbacks and an
/// execution entry point meant to run on its own thread: notify all
/// listeners, wait, repeat until stopped. `run` must return promptly once
/// the timer is stopped.
pub trait Timer: Send + Sync {
    /// Register a callback invoked on every tick. Listeners are called with
    /// the listener list locked and should only flag work, not do it.
    fn listen(&self, listener: Box<dyn Fn() + Send>);

    fn stop(&self);

    fn stopped(&self) -> bool;

    /// Block the calling thread, ticking, until stopped.
    fn run(&self);
}

/// Concrete timer that ticks at a fixed interval.
#[derive(Clone)]
pub struct MonotonousTimer {
    interval: Duration,
    listeners: Listeners,
    cancel: CancelToken,
}

impl MonotonousTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            listeners: Arc::new(Mutex::new(Vec::new())),
            cancel: CancelToken::new(),
        }
    }

    /// Run the timer on its own thread. The handle is joinable after
    /// [`Timer::stop`].
    pub fn spawn(&self) -> thread::JoinHandle<()> {
        let timer = self.clone();
        thread::spawn(move || timer.run())
    }
}

impl Timer for MonotonousTimer {
    fn listen(&self, listener: Box<dyn Fn() + Send>) {
        self.listeners.lock().push(listener);
    }

    fn stop(&self) {
        self.cancel.cancel();
    }

    fn stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn run(&self) {
        while !self.cancel.is_cancelled() {
            for listener in self.listeners.lock().iter() {
                listener();
            }
            if !self.cancel.sleep_cancellable(self.interval) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn ticks_fan_out_to_listeners() {
        let timer = MonotonousTimer::new(Duration::from_millis(10));
        let ticks = Arc::new(AtomicUsize::new(0));

        let t = ticks.clone();
        timer.listen(Box::new(move || {
            t.fetch_add(1, Ordering::Relaxed);
        }));

        let handle = timer.spawn();
        let start = Instant::now();
        while ticks.load(Ordering::Relaxed) < 3 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        timer.stop();
        handle.join().unwrap();

        assert!(ticks.load(Ordering::Relaxed) >= 3);
    }

    #[test]
    fn stop_interrupts_the_wait() {
        let timer = MonotonousTimer::new(Duration::from_secs(60));
        let handle = timer.spawn();

        thread::sleep(Duration::from_millis(30));
        let stopped_at = Instant::now();
        timer.stop();
        handle.join().unwrap();

        // broke out of a 60 s interval well before it elapsed
        assert!(stopped_at.elapsed() < Duration::from_secs(5));
        assert!(timer.stopped());
    }
}
