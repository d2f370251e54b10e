use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

use crate::node::{Consume, ConsumeCtx, Produce, ProduceCtx, Transform, TransformCtx};
use crate::pin::{InputPins, OutputPins};
use crate::sync::{State, TransitionSignal};
use crate::utils::HealthFlag;

// Downs the health flag when the worker exits, cleanly or by panic. A panic
// also means the body was dropped mid-flight and the node cannot restart.
struct Alive<'a> {
    health: &'a HealthFlag,
    node: &'a str,
}

impl Drop for Alive<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(node = %self.node, "worker terminated by panic");
        }
        self.health.down();
    }
}

fn thread_name() -> String {
    thread::current().name().unwrap_or("node").to_string()
}

pub(crate) fn run_producer<P: Produce>(
    slot: Arc<Mutex<Option<P>>>,
    signal: Arc<TransitionSignal>,
    outputs: OutputPins<P::Output>,
    health: HealthFlag,
) {
    let Some(mut body) = slot.lock().take() else {
        return;
    };
    health.up();
    let node = thread_name();
    let _alive = Alive {
        health: &health,
        node: &node,
    };

    let mut state = signal.current();
    while state != State::Stopped {
        if state == State::Paused {
            state = signal.wait_while_paused();
        }
        if state == State::Started {
            let mut ctx = ProduceCtx {
                outputs: &outputs,
                signal: &signal,
            };
            body.produce(&mut ctx);
            state = signal.current();
        }
    }

    *slot.lock() = Some(body);
}

pub(crate) fn run_consumer<C: Consume>(
    slot: Arc<Mutex<Option<C>>>,
    signal: Arc<TransitionSignal>,
    inputs: InputPins<C::Input>,
    health: HealthFlag,
) {
    let Some(mut body) = slot.lock().take() else {
        return;
    };
    health.up();
    let node = thread_name();
    let _alive = Alive {
        health: &health,
        node: &node,
    };

    let mut state = signal.current();
    while state != State::Stopped {
        if state == State::Paused {
            state = signal.wait_while_paused();
        } else if state == State::Started {
            let (next, fire) = signal.wait_for_input(|| inputs.peek_any());
            state = next;
            if fire {
                for i in 0..inputs.len() {
                    if inputs.pin(i).peek() {
                        let mut ctx = ConsumeCtx {
                            inputs: &inputs,
                            signal: &signal,
                        };
                        body.ready(i, &mut ctx);
                    }
                }
                state = signal.current();
            }
        }
    }

    *slot.lock() = Some(body);
}

pub(crate) fn run_transformer<X: Transform>(
    slot: Arc<Mutex<Option<X>>>,
    signal: Arc<TransitionSignal>,
    inputs: InputPins<X::Input>,
    outputs: OutputPins<X::Output>,
    health: HealthFlag,
) {
    let Some(mut body) = slot.lock().take() else {
        return;
    };
    health.up();
    let node = thread_name();
    let _alive = Alive {
        health: &health,
        node: &node,
    };

    let mut state = signal.current();
    while state != State::Stopped {
        if state == State::Paused {
            state = signal.wait_while_paused();
        } else if state == State::Started {
            let (next, fire) = signal.wait_for_input(|| inputs.peek_any());
            state = next;
            if fire {
                for i in 0..inputs.len() {
                    if inputs.pin(i).peek() {
                        let mut ctx = TransformCtx {
                            inputs: &inputs,
                            outputs: &outputs,
                            signal: &signal,
                        };
                        body.ready(i, &mut ctx);
                    }
                }
                state = signal.current();
            }
        }
    }

    *slot.lock() = Some(body);
}
