use std::sync::atomic::{AtomicBool, Ordering};

/// Busy flag guarding a job that must not overlap with itself.
#[derive(Debug, Default)]
pub struct BusyGate {
    busy: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate, or `None` if it is already held. The gate reopens
    /// when the permit drops.
    pub fn try_acquire(&self) -> Option<BusyPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyPermit { gate: self })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct BusyPermit<'a> {
    gate: &'a BusyGate,
}

impl Drop for BusyPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
