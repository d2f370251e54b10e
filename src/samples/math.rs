use std::marker::PhantomData;
use std::ops::AddAssign;

use crate::node::{Transform, TransformCtx};
use crate::packet::Packet;

/// Transformer with K inputs and one output that fires only when every
/// input has a packet: one packet is popped from each, folded with `+=` in
/// input-index order, and the sum pushed.
pub struct Adder<T> {
    _elem: PhantomData<fn() -> T>,
}

impl<T> Adder<T> {
    pub fn new() -> Self {
        Self { _elem: PhantomData }
    }
}

impl<T> Default for Adder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transform for Adder<T>
where
    T: AddAssign + Send + 'static,
{
    type Input = T;
    type Output = T;

    fn ready(&mut self, _index: usize, ctx: &mut TransformCtx<'_, T, T>) {
        // an incomplete tuple waits for the next arrival
        for i in 0..ctx.ins() {
            if !ctx.input(i).peek() {
                return;
            }
        }

        let mut terms = Vec::with_capacity(ctx.ins());
        for i in 0..ctx.ins() {
            let popped = ctx.input(i).pop();
            let Some(packet) = popped else { return };
            terms.push(packet);
        }

        let mut terms = terms.into_iter();
        let Some(first) = terms.next() else { return };
        let mut sum = first.into_data();
        for term in terms {
            sum += term.into_data();
        }

        if let Err(e) = ctx.output(0).push(Packet::new(sum)) {
            tracing::warn!(reason = %e.reason, "adder dropped a sum");
        }
    }
}

/// Transformer that adds a fixed value to every packet with `+=`; the
/// packet's consumption time is preserved.
pub struct ConstAdder<T> {
    addend: T,
}

impl<T> ConstAdder<T> {
    pub fn new(addend: T) -> Self {
        Self { addend }
    }
}

impl<T> Transform for ConstAdder<T>
where
    T: AddAssign + Clone + Send + 'static,
{
    type Input = T;
    type Output = T;

    fn ready(&mut self, _index: usize, ctx: &mut TransformCtx<'_, T, T>) {
        let popped = ctx.input(0).pop();
        let Some(mut packet) = popped else { return };

        *packet.data_mut() += self.addend.clone();

        if let Err(e) = ctx.output(0).push(packet) {
            tracing::warn!(reason = %e.reason, "const_adder dropped a packet");
        }
    }
}
