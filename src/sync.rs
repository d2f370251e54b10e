use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// Lifecycle state of a node. Nodes are created `Paused`; only the graph
/// initiates transitions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    Started,
    Paused,
    Stopped,
}

impl State {
    #[inline]
    fn as_u8(self) -> u8 {
        match self {
            State::Started => 0,
            State::Paused => 1,
            State::Stopped => 2,
        }
    }

    #[inline]
    fn from_u8(v: u8) -> State {
        match v {
            0 => State::Started,
            1 => State::Paused,
            _ => State::Stopped,
        }
    }
}

type Hook = Box<dyn Fn(State) + Send + Sync>;

/// Per-node transition signal: the node's state behind a mutex/condvar pair,
/// with a lock-free snapshot for hot-path reads.
///
/// The condvar is pulsed both on state transitions and when an upstream pin
/// queues a packet for the node, so a consumer's wait covers "state left
/// `Started` OR input is available" with a single primitive.
///
/// Transition hooks run under the state lock and must not block; they are
/// meant to open auxiliary gates and flags (see `WaitFlag`, `Gate`) so user
/// code sleeping on its own conditions notices the transition promptly.
/// Hooks read state through [`current`](Self::current), which never takes
/// the lock.
pub struct TransitionSignal {
    state: Mutex<State>,
    cv: Condvar,
    snap: AtomicU8,
    hooks: Mutex<Vec<Hook>>,
}

impl TransitionSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Paused),
            cv: Condvar::new(),
            snap: AtomicU8::new(State::Paused.as_u8()),
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Current state, read without locking.
    #[inline]
    pub fn current(&self) -> State {
        State::from_u8(self.snap.load(Ordering::Acquire))
    }

    /// Register a transition hook. Hooks must not block.
    pub fn on_transition(&self, hook: impl Fn(State) + Send + Sync + 'static) {
        self.hooks.lock().push(Box::new(hook));
    }

    /// Move the node to `next`, run the hooks, wake the worker.
    pub(crate) fn transition(&self, next: State) {
        let mut state = self.state.lock();
        *state = next;
        self.snap.store(next.as_u8(), Ordering::Release);
        for hook in self.hooks.lock().iter() {
            hook(next);
        }
        self.cv.notify_all();
    }

    /// Wake the worker without changing state. Called by the upstream pin
    /// after a successful push; the state lock is taken briefly so a worker
    /// between its predicate check and its wait cannot miss the pulse.
    pub(crate) fn pulse(&self) {
        let _state = self.state.lock();
        self.cv.notify_all();
    }

    /// Block until the state leaves `Paused`; returns the new state.
    pub(crate) fn wait_while_paused(&self) -> State {
        let mut state = self.state.lock();
        while *state == State::Paused {
            self.cv.wait(&mut state);
        }
        *state
    }

    /// Block until the state leaves `Started` or `has_input` reports work.
    /// Returns the observed state and whether input is available.
    pub(crate) fn wait_for_input(&self, mut has_input: impl FnMut() -> bool) -> (State, bool) {
        let mut state = self.state.lock();
        loop {
            if *state != State::Started {
                return (*state, false);
            }
            if has_input() {
                return (State::Started, true);
            }
            self.cv.wait(&mut state);
        }
    }
}

impl Default for TransitionSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// One-slot monitor: `set` raises the flag, `wait` blocks until raised and
/// lowers it again. Used by tick-gated producers.
pub struct WaitFlag {
    flag: Mutex<bool>,
    cv: Condvar,
}

impl WaitFlag {
    pub fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    pub fn set(&self) {
        let mut flag = self.flag.lock();
        *flag = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut flag = self.flag.lock();
        while !*flag {
            self.cv.wait(&mut flag);
        }
        *flag = false;
    }
}

impl Default for WaitFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulse-only gate for deadline waits. `wait_deadline` sleeps until the
/// deadline passes, the gate is pulsed, or `keep_waiting` turns false;
/// pulses are not latched.
pub struct Gate {
    inner: Mutex<()>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(()),
            cv: Condvar::new(),
        }
    }

    pub fn pulse(&self) {
        let _inner = self.inner.lock();
        self.cv.notify_all();
    }

    pub fn wait_deadline(&self, deadline: Instant, mut keep_waiting: impl FnMut() -> bool) {
        let mut inner = self.inner.lock();
        while keep_waiting() && Instant::now() < deadline {
            if self.cv.wait_until(&mut inner, deadline).timed_out() {
                break;
            }
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}
