/*!
 * Bounded Counting Semaphore
 *
 * The value starts at the construction-time maximum. `acquire` decrements
 * and parks while the count is exhausted; `release` increments and hands one
 * parked thread a dedicated wakeup. Releasing above the maximum is a
 * protocol error, never a silent saturation.
 */

use super::condition::Condition;
use crate::core::errors::{SyncError, SyncResult};

const WAITERS: usize = 0;

struct SemState {
    value: i64,
    // dedicated wakeups handed out by release(); waiters consume exactly one
    wakeups: u64,
    epoch: u64,
}

/// Bounded counting semaphore with waiter/worker queries and reset
pub struct Semaphore {
    cond: Condition<SemState>,
    max: i64,
}

impl Semaphore {
    /// Create a semaphore holding `max` resources
    pub fn new(max: u32) -> Self {
        Self {
            cond: Condition::new(
                1,
                SemState {
                    value: i64::from(max),
                    wakeups: 0,
                    epoch: 0,
                },
            ),
            max: i64::from(max),
        }
    }

    /// Take one resource, parking until one is available
    ///
    /// A negative internal value counts the parked threads; `reset` releases
    /// them all without handing out resources.
    pub fn acquire(&self) {
        let mut guard = self.cond.lock();
        guard.value -= 1;
        if guard.value < 0 {
            let epoch = guard.epoch;
            loop {
                guard.wait(WAITERS);
                if guard.epoch != epoch {
                    break;
                }
                if guard.wakeups > 0 {
                    guard.wakeups -= 1;
                    break;
                }
            }
        }
    }

    /// Return one resource, waking one parked thread if any
    ///
    /// Fails with a protocol error if the value is already at the maximum
    /// (more releases than acquires).
    pub fn release(&self) -> SyncResult<()> {
        let mut guard = self.cond.lock();
        if guard.value >= self.max {
            return Err(SyncError::Protocol(format!(
                "semaphore released above its maximum value {}",
                self.max
            )));
        }
        guard.value += 1;
        if guard.value <= 0 {
            guard.wakeups += 1;
            guard.signal(WAITERS);
        }
        Ok(())
    }

    /// Current value; negative values count parked threads
    pub fn value(&self) -> i64 {
        self.cond.lock().value
    }

    /// Whether at least one thread is parked in `acquire`
    pub fn has_waiting(&self) -> bool {
        self.cond.lock().value < 0
    }

    /// Whether at least one resource is currently held
    pub fn has_working(&self) -> bool {
        self.cond.lock().value < self.max
    }

    /// Back to the initial value, force-waking every parked thread
    pub fn reset(&self) {
        let mut guard = self.cond.lock();
        guard.value = self.max;
        guard.wakeups = 0;
        guard.epoch = guard.epoch.wrapping_add(1);
        guard.broadcast(WAITERS);
    }
}
