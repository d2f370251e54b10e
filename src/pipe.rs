use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::PushError;
use crate::packet::Packet;
use crate::sync::TransitionSignal;
use crate::utils::Named;

/// Label substituted for a detached pipe end in auto-generated names.
pub(crate) const NOTHING: &str = "nothing";

/// The producing end of a pipe. The token is an epoch: when another outpin
/// adopts the pipe, a fresh token displaces this one, and the old outpin
/// discovers the mismatch on its next access.
pub(crate) struct UpstreamEnd {
    pub name: String,
    pub token: u64,
}

/// The consuming end of a pipe. The wake signal is the consuming node's
/// transition signal, pulsed by the upstream pin after a successful push.
pub(crate) struct DownstreamEnd {
    pub name: String,
    pub wake: Arc<TransitionSignal>,
}

/// Carries packets from node to node on a FIFO basis.
///
/// Capacity may be capped by packet count (`max_length`) and by payload
/// bytes (`max_weight`); a cap of 0 means uncapped. Packets accumulate when
/// the consuming end is slower than the producing end; a graph that steadily
/// produces more than it consumes is unbalanced and should be rewired.
///
/// The pipe itself is not synchronised — it is only reachable through
/// [`PipeCell`], which pairs it with its mutex.
pub struct Pipe<T> {
    name: String,
    packets: VecDeque<Packet<T>>,
    max_length: usize,
    max_weight: usize,
    weight: usize,
    pub(crate) upstream: Option<UpstreamEnd>,
    pub(crate) downstream: Option<DownstreamEnd>,
}

impl<T> Pipe<T> {
    /// A detached pipe, mostly useful for tests and diagnostics. Pipes used
    /// by the runtime are created through pin connection.
    pub fn new(name: impl Into<String>, max_length: usize, max_weight: usize) -> Self {
        Self {
            name: name.into(),
            packets: VecDeque::new(),
            max_length,
            max_weight,
            weight: 0,
            upstream: None,
            downstream: None,
        }
    }

    pub(crate) fn between(
        upstream: UpstreamEnd,
        downstream: DownstreamEnd,
        max_length: usize,
        max_weight: usize,
    ) -> Self {
        let name = format!("{}_to_{}", upstream.name, downstream.name);
        Self {
            name,
            packets: VecDeque::new(),
            max_length,
            max_weight,
            weight: 0,
            upstream: Some(upstream),
            downstream: Some(downstream),
        }
    }

    /// Number of queued packets.
    #[inline]
    pub fn length(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Sum of `Packet::size()` over all queued packets.
    #[inline]
    pub fn weight(&self) -> usize {
        self.weight
    }

    #[inline]
    pub fn max_weight(&self) -> usize {
        self.max_weight
    }

    /// Set the packet-count cap; returns the previous cap. Packets already
    /// queued beyond a lowered cap are not dropped.
    pub fn cap_length(&mut self, max_length: usize) -> usize {
        std::mem::replace(&mut self.max_length, max_length)
    }

    /// Set the byte-weight cap; returns the previous cap. No retroactive
    /// drops.
    pub fn cap_weight(&mut self, max_weight: usize) -> usize {
        std::mem::replace(&mut self.max_weight, max_weight)
    }

    /// Queue a packet. If either cap would be exceeded, the packet is handed
    /// back inside the error and the pipe is unchanged.
    pub fn push(&mut self, packet: Packet<T>) -> Result<(), PushError<T>> {
        if self.max_length != 0 && self.packets.len() == self.max_length {
            return Err(PushError::length_cap(packet));
        }
        if self.max_weight != 0 && self.weight + Packet::<T>::size() > self.max_weight {
            return Err(PushError::weight_cap(packet));
        }

        self.weight += Packet::<T>::size();
        self.packets.push_back(packet);
        Ok(())
    }

    /// Remove and return the front packet, or `None` when empty.
    pub fn pop(&mut self) -> Option<Packet<T>> {
        let packet = self.packets.pop_front()?;
        self.weight -= Packet::<T>::size();
        Some(packet)
    }

    /// Discard all queued packets; returns how many were discarded.
    pub fn flush(&mut self) -> usize {
        let flushed = self.packets.len();
        self.packets.clear();
        self.weight = 0;
        flushed
    }

    pub(crate) fn upstream_label(&self) -> &str {
        self.upstream.as_ref().map_or(NOTHING, |end| end.name.as_str())
    }

    pub(crate) fn downstream_label(&self) -> &str {
        self.downstream.as_ref().map_or(NOTHING, |end| end.name.as_str())
    }

    /// Rebuild the auto-generated name from the current end labels.
    pub(crate) fn recompose_name(&mut self) {
        self.name = format!("{}_to_{}", self.upstream_label(), self.downstream_label());
    }
}

impl<T> Named for Pipe<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        std::mem::replace(&mut self.name, to.to_string())
    }
}

/// A pipe paired with its mutex. Both pins share one cell, so a reference to
/// the pipe's contents is always taken under lock.
pub struct PipeCell<T> {
    inner: Mutex<Pipe<T>>,
}

impl<T> PipeCell<T> {
    pub(crate) fn new_arc(pipe: Pipe<T>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(pipe),
        })
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, Pipe<T>> {
        self.inner.lock()
    }
}
