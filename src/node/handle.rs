use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context};

use crate::node::{worker, Consume, Node, NodeKind, Produce, Transform};
use crate::pin::{InputPins, OutputPins};
use crate::sync::{State, TransitionSignal};
use crate::utils::{HealthFlag, Named};

// The body lives in a shared slot: the worker takes it at spawn and puts it
// back on clean exit, so a stopped node can be restarted. A panicked worker
// never returns the body, which makes the node unrestartable.
type BodySlot<B> = Arc<Mutex<Option<B>>>;

fn spawn_thread(
    node_name: &str,
    run: impl FnOnce() + Send + 'static,
) -> anyhow::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(node_name.to_string())
        .spawn(run)
        .with_context(|| format!("failed to spawn worker for node {node_name}"))
}

fn take_body_error(node_name: &str) -> anyhow::Error {
    anyhow!("node {node_name} has no body (worker panicked earlier)")
}

/// A pure producer: a [`Produce`] body plus `outs` output pins, runnable on
/// its own worker thread.
pub struct ProducerNode<P: Produce> {
    name: String,
    signal: Arc<TransitionSignal>,
    health: HealthFlag,
    outputs: OutputPins<P::Output>,
    body: BodySlot<P>,
}

impl<P: Produce> ProducerNode<P> {
    pub fn new(name: impl Into<String>, outs: usize, mut body: P) -> Self {
        let name = name.into();
        let signal = Arc::new(TransitionSignal::new());
        body.configure(&signal);
        Self {
            outputs: OutputPins::new(&name, outs),
            body: Arc::new(Mutex::new(Some(body))),
            health: HealthFlag::new(false),
            signal,
            name,
        }
    }

    #[inline]
    pub fn outputs(&self) -> &OutputPins<P::Output> {
        &self.outputs
    }
}

impl<P: Produce> Named for ProducerNode<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        for i in 0..self.outputs.len() {
            self.outputs.pin(i).rename(&format!("{to}_out{i}"));
        }
        std::mem::replace(&mut self.name, to.to_string())
    }
}

impl<P: Produce> Node for ProducerNode<P> {
    fn kind(&self) -> NodeKind {
        NodeKind::Producer
    }

    fn state(&self) -> State {
        self.signal.current()
    }

    fn is_healthy(&self) -> bool {
        self.health.get()
    }

    fn signal(&self) -> &Arc<TransitionSignal> {
        &self.signal
    }

    fn spawn_worker(&mut self) -> anyhow::Result<JoinHandle<()>> {
        if self.body.lock().is_none() {
            return Err(take_body_error(&self.name));
        }
        let body = self.body.clone();
        let signal = self.signal.clone();
        let outputs = self.outputs.clone();
        let health = self.health.clone();
        spawn_thread(&self.name, move || {
            worker::run_producer(body, signal, outputs, health)
        })
    }

    fn sever(&mut self) {
        for i in 0..self.outputs.len() {
            self.outputs.pin(i).disconnect();
        }
    }

    fn outputs_any(&self) -> Option<&dyn Any> {
        Some(&self.outputs)
    }

    fn inputs_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// A pure consumer: a [`Consume`] body plus `ins` input pins.
pub struct ConsumerNode<C: Consume> {
    name: String,
    signal: Arc<TransitionSignal>,
    health: HealthFlag,
    inputs: InputPins<C::Input>,
    body: BodySlot<C>,
}

impl<C: Consume> ConsumerNode<C> {
    pub fn new(name: impl Into<String>, ins: usize, mut body: C) -> Self {
        let name = name.into();
        let signal = Arc::new(TransitionSignal::new());
        body.configure(&signal);
        Self {
            inputs: InputPins::new(&name, ins, &signal),
            body: Arc::new(Mutex::new(Some(body))),
            health: HealthFlag::new(false),
            signal,
            name,
        }
    }

    #[inline]
    pub fn inputs(&self) -> &InputPins<C::Input> {
        &self.inputs
    }
}

impl<C: Consume> Named for ConsumerNode<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        for i in 0..self.inputs.len() {
            self.inputs.pin(i).rename(&format!("{to}_in{i}"));
        }
        std::mem::replace(&mut self.name, to.to_string())
    }
}

impl<C: Consume> Node for ConsumerNode<C> {
    fn kind(&self) -> NodeKind {
        NodeKind::Consumer
    }

    fn state(&self) -> State {
        self.signal.current()
    }

    fn is_healthy(&self) -> bool {
        self.health.get()
    }

    fn signal(&self) -> &Arc<TransitionSignal> {
        &self.signal
    }

    fn spawn_worker(&mut self) -> anyhow::Result<JoinHandle<()>> {
        if self.body.lock().is_none() {
            return Err(take_body_error(&self.name));
        }
        let body = self.body.clone();
        let signal = self.signal.clone();
        let inputs = self.inputs.clone();
        let health = self.health.clone();
        spawn_thread(&self.name, move || {
            worker::run_consumer(body, signal, inputs, health)
        })
    }

    fn sever(&mut self) {
        for i in 0..self.inputs.len() {
            self.inputs.pin(i).disconnect();
        }
    }

    fn outputs_any(&self) -> Option<&dyn Any> {
        None
    }

    fn inputs_any(&self) -> Option<&dyn Any> {
        Some(&self.inputs)
    }
}

/// A transformer: a [`Transform`] body with both input and output pins. Runs
/// the consumer loop; production is driven by input arrival.
pub struct TransformerNode<X: Transform> {
    name: String,
    signal: Arc<TransitionSignal>,
    health: HealthFlag,
    inputs: InputPins<X::Input>,
    outputs: OutputPins<X::Output>,
    body: BodySlot<X>,
}

impl<X: Transform> TransformerNode<X> {
    pub fn new(name: impl Into<String>, ins: usize, outs: usize, mut body: X) -> Self {
        let name = name.into();
        let signal = Arc::new(TransitionSignal::new());
        body.configure(&signal);
        Self {
            inputs: InputPins::new(&name, ins, &signal),
            outputs: OutputPins::new(&name, outs),
            body: Arc::new(Mutex::new(Some(body))),
            health: HealthFlag::new(false),
            signal,
            name,
        }
    }

    #[inline]
    pub fn inputs(&self) -> &InputPins<X::Input> {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &OutputPins<X::Output> {
        &self.outputs
    }
}

impl<X: Transform> Named for TransformerNode<X> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        for i in 0..self.inputs.len() {
            self.inputs.pin(i).rename(&format!("{to}_in{i}"));
        }
        for i in 0..self.outputs.len() {
            self.outputs.pin(i).rename(&format!("{to}_out{i}"));
        }
        std::mem::replace(&mut self.name, to.to_string())
    }
}

impl<X: Transform> Node for TransformerNode<X> {
    fn kind(&self) -> NodeKind {
        NodeKind::Transformer
    }

    fn state(&self) -> State {
        self.signal.current()
    }

    fn is_healthy(&self) -> bool {
        self.health.get()
    }

    fn signal(&self) -> &Arc<TransitionSignal> {
        &self.signal
    }

    fn spawn_worker(&mut self) -> anyhow::Result<JoinHandle<()>> {
        if self.body.lock().is_none() {
            return Err(take_body_error(&self.name));
        }
        let body = self.body.clone();
        let signal = self.signal.clone();
        let inputs = self.inputs.clone();
        let outputs = self.outputs.clone();
        let health = self.health.clone();
        spawn_thread(&self.name, move || {
            worker::run_transformer(body, signal, inputs, outputs, health)
        })
    }

    fn sever(&mut self) {
        for i in 0..self.inputs.len() {
            self.inputs.pin(i).disconnect();
        }
        for i in 0..self.outputs.len() {
            self.outputs.pin(i).disconnect();
        }
    }

    fn outputs_any(&self) -> Option<&dyn Any> {
        Some(&self.outputs)
    }

    fn inputs_any(&self) -> Option<&dyn Any> {
        Some(&self.inputs)
    }
}
