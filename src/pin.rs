use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::PushError;
use crate::packet::Packet;
use crate::pipe::{DownstreamEnd, Pipe, PipeCell, UpstreamEnd};
use crate::sync::TransitionSignal;
use crate::utils::Named;

// Epoch source for upstream displacement; see `UpstreamEnd`.
static PIPE_EPOCH: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_token() -> u64 {
    PIPE_EPOCH.fetch_add(1, Ordering::Relaxed)
}

struct OutRef<T> {
    cell: Arc<PipeCell<T>>,
    token: u64,
}

/// A node outlet. Producers and transformers push packets through outpins.
///
/// Even when one pin disconnects, the pipe stays attached to the remaining
/// pin to minimise packet loss if a new peer is attached later.
pub struct OutPin<T> {
    name: String,
    pipe: Option<OutRef<T>>,
}

impl<T: Send + 'static> OutPin<T> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pipe: None,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.pipe.is_some()
    }

    /// Move a packet onto the pipe.
    ///
    /// The pipe is mutated under its lock; the downstream transition signal
    /// is pulsed only after the lock is released. This ordering (pipe mutex,
    /// released, then transition mutex) must be preserved.
    pub fn push(&mut self, packet: Packet<T>) -> Result<(), PushError<T>> {
        let (cell, token) = match &self.pipe {
            Some(out) => (out.cell.clone(), out.token),
            None => return Err(PushError::detached(packet)),
        };

        let wake = {
            let mut pipe = cell.lock();
            if !upstream_matches(&pipe, token) {
                drop(pipe);
                self.pipe = None;
                return Err(PushError::detached(packet));
            }
            pipe.push(packet)?;
            pipe.downstream.as_ref().map(|end| end.wake.clone())
        };

        if let Some(signal) = wake {
            signal.pulse();
        }
        Ok(())
    }

    /// Connect this outpin to `inpin` through a pipe.
    ///
    /// If this outpin already has a pipe, it is disconnected first (the pipe
    /// may survive on its inpin's side). If `inpin` already has a pipe, that
    /// pipe is adopted: its previous upstream is displaced, its name and
    /// caps are rewritten, and any queued packets remain visible to the
    /// consumer. Otherwise a new pipe is allocated and shared by both pins.
    pub fn connect(&mut self, inpin: &mut InPin<T>, max_length: usize, max_weight: usize) {
        if self.pipe.is_some() {
            self.disconnect();
        }

        let token = next_token();
        if let Some(cell) = inpin.pipe.clone() {
            {
                let mut pipe = cell.lock();
                pipe.upstream = Some(UpstreamEnd {
                    name: self.name.clone(),
                    token,
                });
                pipe.cap_length(max_length);
                pipe.cap_weight(max_weight);
                pipe.recompose_name();
            }
            self.pipe = Some(OutRef { cell, token });
        } else {
            let pipe = Pipe::between(
                UpstreamEnd {
                    name: self.name.clone(),
                    token,
                },
                DownstreamEnd {
                    name: inpin.name.clone(),
                    wake: inpin.signal.clone(),
                },
                max_length,
                max_weight,
            );
            let cell = PipeCell::new_arc(pipe);
            inpin.pipe = Some(cell.clone());
            self.pipe = Some(OutRef { cell, token });
        }
    }

    /// Relinquish this pin's share of the pipe, renaming it to reflect the
    /// detached upstream end.
    pub fn disconnect(&mut self) {
        if let Some(out) = self.pipe.take() {
            let mut pipe = out.cell.lock();
            if upstream_matches(&pipe, out.token) {
                pipe.upstream = None;
                pipe.recompose_name();
            }
        }
    }

    /// Name of the attached pipe, if any. Diagnostics only.
    pub fn pipe_name(&self) -> Option<String> {
        self.pipe
            .as_ref()
            .map(|out| out.cell.lock().name().to_string())
    }
}

impl<T: Send + 'static> Named for OutPin<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        if let Some(out) = &self.pipe {
            let mut pipe = out.cell.lock();
            if upstream_matches(&pipe, out.token) {
                if let Some(end) = pipe.upstream.as_mut() {
                    end.name = to.to_string();
                }
                pipe.recompose_name();
            }
        }
        std::mem::replace(&mut self.name, to.to_string())
    }
}

#[inline]
fn upstream_matches<T>(pipe: &Pipe<T>, token: u64) -> bool {
    pipe.upstream.as_ref().map(|end| end.token) == Some(token)
}

/// A node inlet. Consumers and transformers pop packets from inpins.
///
/// The inpin carries its owning node's transition signal; the upstream pin
/// pulses that signal after each successful push, waking the consumer.
pub struct InPin<T> {
    name: String,
    pipe: Option<Arc<PipeCell<T>>>,
    signal: Arc<TransitionSignal>,
}

impl<T: Send + 'static> InPin<T> {
    pub(crate) fn new(name: impl Into<String>, signal: Arc<TransitionSignal>) -> Self {
        Self {
            name: name.into(),
            pipe: None,
            signal,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.pipe.is_some()
    }

    /// True iff there is a pipe and it holds at least one packet.
    pub fn peek(&self) -> bool {
        self.pipe
            .as_ref()
            .map_or(false, |cell| cell.lock().length() != 0)
    }

    /// Next packet, or `None` when the pin is detached or the pipe is empty.
    /// Never blocks.
    pub fn pop(&mut self) -> Option<Packet<T>> {
        self.pipe.as_ref()?.lock().pop()
    }

    /// Relinquish this pin's share of the pipe, renaming it to reflect the
    /// detached downstream end.
    pub fn disconnect(&mut self) {
        if let Some(cell) = self.pipe.take() {
            let mut pipe = cell.lock();
            pipe.downstream = None;
            pipe.recompose_name();
        }
    }

    /// Name of the attached pipe, if any. Diagnostics only.
    pub fn pipe_name(&self) -> Option<String> {
        self.pipe.as_ref().map(|cell| cell.lock().name().to_string())
    }
}

impl<T: Send + 'static> Named for InPin<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        if let Some(cell) = &self.pipe {
            let mut pipe = cell.lock();
            if let Some(end) = pipe.downstream.as_mut() {
                end.name = to.to_string();
            }
            pipe.recompose_name();
        }
        std::mem::replace(&mut self.name, to.to_string())
    }
}

/// A node's output pin table: one mutex per pin, shared between the node
/// handle (for wiring and renames) and the node's worker (for pushes).
/// This is the `Any`-downcast target that carries the element type witness
/// across the graph's type-erased node storage.
pub struct OutputPins<T: Send + 'static>(Arc<Vec<Mutex<OutPin<T>>>>);

impl<T: Send + 'static> OutputPins<T> {
    pub(crate) fn new(node_name: &str, count: usize) -> Self {
        let pins = (0..count)
            .map(|i| Mutex::new(OutPin::new(format!("{node_name}_out{i}"))))
            .collect();
        Self(Arc::new(pins))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lock pin `n`. Panics if out of range; the graph validates indices.
    #[inline]
    pub fn pin(&self, n: usize) -> MutexGuard<'_, OutPin<T>> {
        self.0[n].lock()
    }
}

impl<T: Send + 'static> Clone for OutputPins<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// A node's input pin table; see [`OutputPins`].
pub struct InputPins<T: Send + 'static>(Arc<Vec<Mutex<InPin<T>>>>);

impl<T: Send + 'static> InputPins<T> {
    pub(crate) fn new(node_name: &str, count: usize, signal: &Arc<TransitionSignal>) -> Self {
        let pins = (0..count)
            .map(|i| Mutex::new(InPin::new(format!("{node_name}_in{i}"), signal.clone())))
            .collect();
        Self(Arc::new(pins))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn pin(&self, n: usize) -> MutexGuard<'_, InPin<T>> {
        self.0[n].lock()
    }

    /// True iff any pin has a packet ready.
    pub fn peek_any(&self) -> bool {
        self.0.iter().any(|pin| pin.lock().peek())
    }
}

impl<T: Send + 'static> Clone for InputPins<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
