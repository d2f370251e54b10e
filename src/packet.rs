use std::mem;
use std::time::Instant;

/// Envelope carrying one element from node to node through a pipe.
///
/// A packet may carry a consumption time: a consumer ought to wait before
/// consuming a packet that arrives early, and ought to discard one that
/// arrives late. Transformers may adjust the consumption time in flight
/// (see `samples::generic::Delay`).
#[derive(Clone, Debug)]
pub struct Packet<T> {
    data: T,
    consumption_time: Option<Instant>,
}

impl<T> Packet<T> {
    /// A packet with no consumption time: consume on arrival.
    pub fn new(data: T) -> Self {
        Self {
            data,
            consumption_time: None,
        }
    }

    pub fn with_consumption_time(data: T, at: Instant) -> Self {
        Self {
            data,
            consumption_time: Some(at),
        }
    }

    /// Payload size in bytes, as counted by pipe weight accounting.
    #[inline]
    pub const fn size() -> usize {
        mem::size_of::<T>()
    }

    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    #[inline]
    pub fn into_data(self) -> T {
        self.data
    }

    #[inline]
    pub fn consumption_time(&self) -> Option<Instant> {
        self.consumption_time
    }

    #[inline]
    pub fn set_consumption_time(&mut self, at: Instant) {
        self.consumption_time = Some(at);
    }
}
