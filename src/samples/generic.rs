use std::fmt::Display;
use std::io::Write;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::node::{Consume, ConsumeCtx, Produce, ProduceCtx, Transform, TransformCtx};
use crate::packet::Packet;
use crate::sync::{Gate, State, TransitionSignal, WaitFlag};
use crate::timer::Timer;

/// Producer that emits one packet per timer tick, built by a user function.
///
/// The timer callback only raises a flag; `produce` parks on that flag so
/// the worker sleeps between ticks. Stopping the node raises the flag too,
/// so the worker never stays parked past its stop.
pub struct Generator<F, T> {
    gen: F,
    awake: Arc<WaitFlag>,
    _out: PhantomData<fn() -> T>,
}

impl<F, T> Generator<F, T>
where
    F: FnMut() -> T,
{
    pub fn new(timer: &dyn Timer, gen: F) -> Self {
        let awake = Arc::new(WaitFlag::new());
        let tick = awake.clone();
        timer.listen(Box::new(move || tick.set()));
        Self {
            gen,
            awake,
            _out: PhantomData,
        }
    }
}

impl<F, T> Produce for Generator<F, T>
where
    F: FnMut() -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn configure(&mut self, signal: &TransitionSignal) {
        let awake = self.awake.clone();
        signal.on_transition(move |state| {
            if state == State::Stopped {
                awake.set();
            }
        });
    }

    fn produce(&mut self, ctx: &mut ProduceCtx<'_, T>) {
        self.awake.wait();

        if ctx.state() == State::Started {
            let value = (self.gen)();
            if let Err(e) = ctx.output(0).push(Packet::new(value)) {
                tracing::warn!(reason = %e.reason, "generator dropped a packet");
            }
        }
    }
}

/// Consumer that writes each packet's payload to a stream, one line per
/// packet, honouring consumption times: unset means write immediately, a
/// future time means sleep until then (or until the node leaves `Started`),
/// a past time means the packet is late and is discarded.
pub struct Ostreamer<T, W> {
    out: W,
    stopped: Arc<Gate>,
    _in: PhantomData<fn() -> T>,
}

impl<T, W: Write> Ostreamer<T, W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stopped: Arc::new(Gate::new()),
            _in: PhantomData,
        }
    }
}

impl<T, W> Consume for Ostreamer<T, W>
where
    T: Display + Send + 'static,
    W: Write + Send + 'static,
{
    type Input = T;

    fn configure(&mut self, signal: &TransitionSignal) {
        let stopped = self.stopped.clone();
        signal.on_transition(move |state| {
            if state != State::Started {
                stopped.pulse();
            }
        });
    }

    fn ready(&mut self, _index: usize, ctx: &mut ConsumeCtx<'_, T>) {
        loop {
            let popped = ctx.input(0).pop();
            let Some(packet) = popped else { break };
            if ctx.state() != State::Started {
                break;
            }

            match packet.consumption_time() {
                None => {
                    writeln!(self.out, "{}", packet.data()).ok();
                }
                Some(at) if at > Instant::now() => {
                    self.stopped
                        .wait_deadline(at, || ctx.state() == State::Started);
                    if ctx.state() == State::Started {
                        writeln!(self.out, "{}", packet.data()).ok();
                    }
                }
                Some(_) => {
                    tracing::debug!("consumption time already passed, packet discarded");
                }
            }
        }
    }
}

/// Transformer with one input and N outputs: forwards the original packet to
/// output 0 and a clone to every other output.
pub struct Tee<T> {
    _elem: PhantomData<fn() -> T>,
}

impl<T> Tee<T> {
    pub fn new() -> Self {
        Self { _elem: PhantomData }
    }
}

impl<T> Default for Tee<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transform for Tee<T>
where
    T: Clone + Send + 'static,
{
    type Input = T;
    type Output = T;

    fn ready(&mut self, _index: usize, ctx: &mut TransformCtx<'_, T, T>) {
        loop {
            let popped = ctx.input(0).pop();
            let Some(packet) = popped else { break };

            for i in 1..ctx.outs() {
                if let Err(e) = ctx.output(i).push(packet.clone()) {
                    tracing::warn!(pin = i, reason = %e.reason, "tee dropped a clone");
                }
            }
            if let Err(e) = ctx.output(0).push(packet) {
                tracing::warn!(pin = 0usize, reason = %e.reason, "tee dropped a packet");
            }
        }
    }
}

/// Transformer that pushes a packet's consumption time out by a fixed
/// offset. A packet without one gets `arrival + offset`.
pub struct Delay<T> {
    offset: Duration,
    _elem: PhantomData<fn() -> T>,
}

impl<T> Delay<T> {
    pub fn new(offset: Duration) -> Self {
        Self {
            offset,
            _elem: PhantomData,
        }
    }
}

impl<T> Transform for Delay<T>
where
    T: Send + 'static,
{
    type Input = T;
    type Output = T;

    fn ready(&mut self, _index: usize, ctx: &mut TransformCtx<'_, T, T>) {
        loop {
            let popped = ctx.input(0).pop();
            let Some(mut packet) = popped else { break };

            let at = match packet.consumption_time() {
                None => Instant::now() + self.offset,
                Some(at) => at + self.offset,
            };
            packet.set_consumption_time(at);

            if let Err(e) = ctx.output(0).push(packet) {
                tracing::warn!(reason = %e.reason, "delay dropped a packet");
            }
        }
    }
}
