mod handle;
pub(crate) mod worker;

pub use handle::{ConsumerNode, ProducerNode, TransformerNode};

use std::any::Any;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::pin::{InPin, InputPins, OutPin, OutputPins};
use crate::sync::{State, TransitionSignal};
use crate::utils::Named;

/// Closed set of node variants. Determines which graph map a node lands in
/// and therefore its place in the staged start/pause/stop order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Producer,
    Transformer,
    Consumer,
}

/// Body of a pure producer. The worker invokes `produce` in a loop while the
/// node is started; each call should push packets on the ctx's outpins.
pub trait Produce: Send + 'static {
    type Output: Send + 'static;

    fn produce(&mut self, ctx: &mut ProduceCtx<'_, Self::Output>);

    /// Called once when the body is wrapped into a node. Register transition
    /// hooks here (see [`TransitionSignal::on_transition`]); hooks must not
    /// block.
    fn configure(&mut self, _signal: &TransitionSignal) {}
}

/// Body of a pure consumer. `ready(i)` is invoked whenever input pin `i` has
/// a packet; pins are visited in index order on each wake.
pub trait Consume: Send + 'static {
    type Input: Send + 'static;

    fn ready(&mut self, index: usize, ctx: &mut ConsumeCtx<'_, Self::Input>);

    fn configure(&mut self, _signal: &TransitionSignal) {}
}

/// Body of a transformer: consumes on one element type, produces on another.
/// Production is driven by input arrival; `ready(i)` pops from inpins and
/// pushes to outpins in the same call.
pub trait Transform: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn ready(&mut self, index: usize, ctx: &mut TransformCtx<'_, Self::Input, Self::Output>);

    fn configure(&mut self, _signal: &TransitionSignal) {}
}

/// Execution context handed to a producer body.
pub struct ProduceCtx<'a, T: Send + 'static> {
    pub(crate) outputs: &'a OutputPins<T>,
    pub(crate) signal: &'a TransitionSignal,
}

impl<'a, T: Send + 'static> ProduceCtx<'a, T> {
    #[inline]
    pub fn outs(&self) -> usize {
        self.outputs.len()
    }

    /// Lock output pin `n` for a push. Panics if out of range.
    #[inline]
    pub fn output(&self, n: usize) -> parking_lot::MutexGuard<'_, OutPin<T>> {
        self.outputs.pin(n)
    }

    /// Lock-free read of the node's state.
    #[inline]
    pub fn state(&self) -> State {
        self.signal.current()
    }
}

/// Execution context handed to a consumer body.
pub struct ConsumeCtx<'a, T: Send + 'static> {
    pub(crate) inputs: &'a InputPins<T>,
    pub(crate) signal: &'a TransitionSignal,
}

impl<'a, T: Send + 'static> ConsumeCtx<'a, T> {
    #[inline]
    pub fn ins(&self) -> usize {
        self.inputs.len()
    }

    /// Lock input pin `n` for a peek or pop. Panics if out of range.
    #[inline]
    pub fn input(&self, n: usize) -> parking_lot::MutexGuard<'_, InPin<T>> {
        self.inputs.pin(n)
    }

    #[inline]
    pub fn state(&self) -> State {
        self.signal.current()
    }
}

/// Execution context handed to a transformer body.
pub struct TransformCtx<'a, C: Send + 'static, P: Send + 'static> {
    pub(crate) inputs: &'a InputPins<C>,
    pub(crate) outputs: &'a OutputPins<P>,
    pub(crate) signal: &'a TransitionSignal,
}

impl<'a, C: Send + 'static, P: Send + 'static> TransformCtx<'a, C, P> {
    #[inline]
    pub fn ins(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn input(&self, n: usize) -> parking_lot::MutexGuard<'_, InPin<C>> {
        self.inputs.pin(n)
    }

    #[inline]
    pub fn outs(&self) -> usize {
        self.outputs.len()
    }

    #[inline]
    pub fn output(&self, n: usize) -> parking_lot::MutexGuard<'_, OutPin<P>> {
        self.outputs.pin(n)
    }

    #[inline]
    pub fn state(&self) -> State {
        self.signal.current()
    }
}

/// Graph-facing node surface, implemented by [`ProducerNode`],
/// [`ConsumerNode`] and [`TransformerNode`]. Not meant to be implemented
/// outside this crate; user logic goes into the body traits above.
pub trait Node: Named + Send {
    fn kind(&self) -> NodeKind;

    fn state(&self) -> State;

    /// False once the node's worker has panicked or exited.
    fn is_healthy(&self) -> bool;

    fn signal(&self) -> &Arc<TransitionSignal>;

    /// Spawn the node's worker thread. Fails if the body has been lost to a
    /// previous worker panic.
    fn spawn_worker(&mut self) -> anyhow::Result<JoinHandle<()>>;

    /// Disconnect every pin.
    fn sever(&mut self);

    /// Type-erased output pin table, for nodes that produce. Downcasts to
    /// `OutputPins<T>`.
    fn outputs_any(&self) -> Option<&dyn Any>;

    /// Type-erased input pin table, for nodes that consume. Downcasts to
    /// `InputPins<T>`.
    fn inputs_any(&self) -> Option<&dyn Any>;
}
