//! Contention backoff
//!
//! A losing attempt waits briefly before retrying: first a bounded
//! exponential spin, then yielding the processor. This is polling by
//! design, not blocking on a condition variable; contention windows are
//! expected to be short, and the registry has no wait queues to park on.

/// Spin-then-yield backoff for commit retries
///
/// Escalates from `spin_loop` hints to `thread::yield_now`, capping the
/// step counter so a long-losing attempt settles into yielding rather than
/// burning a core.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const STEP_LIMIT: u32 = 10;

    /// Fresh backoff, starting at the shortest spin
    pub fn new() -> Self {
        Backoff { step: 0 }
    }

    /// Wait one escalation step
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                std::hint::spin_loop();
            }
        } else {
            std::thread::yield_now();
        }
        if self.step < Self::STEP_LIMIT {
            self.step += 1;
        }
    }

    /// Check whether the next snooze would yield instead of spin
    pub fn is_yielding(&self) -> bool {
        self.step > Self::SPIN_LIMIT
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalates_to_yielding() {
        let mut b = Backoff::new();
        assert!(!b.is_yielding());
        for _ in 0..=Backoff::SPIN_LIMIT {
            b.snooze();
        }
        assert!(b.is_yielding(), "past the spin limit the backoff must yield");
    }

    #[test]
    fn test_step_is_capped() {
        let mut b = Backoff::new();
        for _ in 0..100 {
            b.snooze();
        }
        assert_eq!(b.step, Backoff::STEP_LIMIT);
    }
}
