//! Scheduler guard — at most one poll cycle in flight.
//!
//! A tick that finds the latch set is dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct SchedulerGuard {
    running: AtomicBool,
}

impl SchedulerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latch if it is free. The returned permit releases it on drop,
    /// including when the cycle future is cancelled or panics.
    pub fn try_enter(&self) -> Option<CyclePermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof that the holder owns the running latch.
#[derive(Debug)]
pub struct CyclePermit<'a> {
    guard: &'a SchedulerGuard,
}

impl Drop for CyclePermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_refused_while_held() {
        let guard = SchedulerGuard::new();
        let permit = guard.try_enter();
        assert!(permit.is_some());
        assert!(guard.is_running());
        assert!(guard.try_enter().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_enter().is_some());
    }
}
