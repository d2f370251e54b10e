use crossbeam::utils::CachePadded;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply clonable flag tracking whether a node's worker is alive. Padded
/// to avoid false sharing with neighbouring hot state.
#[derive(Clone)]
#[repr(transparent)]
pub struct HealthFlag(Arc<CachePadded<AtomicBool>>);

impl HealthFlag {
    #[inline]
    pub fn new(initial: bool) -> Self {
        Self(Arc::new(CachePadded::new(AtomicBool::new(initial))))
    }

    #[inline(always)]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn set(&self, v: bool) {
        self.0.store(v, Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn up(&self) {
        self.set(true);
    }

    #[inline(always)]
    pub fn down(&self) {
        self.set(false);
    }
}

impl fmt::Debug for HealthFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthFlag").field("value", &self.get()).finish()
    }
}
