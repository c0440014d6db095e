/*!
 * Freezer
 *
 * Unbounded counting semaphore starting at zero. Every `acquire` decrements,
 * parking while the result is negative; every `release` increments, waking
 * one parked thread. There is no upper bound, so a burst of releases can
 * bank credit for later acquires.
 */

use super::condition::Condition;

const WAITERS: usize = 0;

struct FreezerState {
    value: i64,
    wakeups: u64,
    epoch: u64,
}

/// Unbounded semaphore; negative values count parked threads
pub struct Freezer {
    cond: Condition<FreezerState>,
}

impl Freezer {
    pub fn new() -> Self {
        Self {
            cond: Condition::new(
                1,
                FreezerState {
                    value: 0,
                    wakeups: 0,
                    epoch: 0,
                },
            ),
        }
    }

    /// Take one unit, parking while the value is negative
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

    /// Add one unit, waking one parked thread if any
    pub fn release(&self) {
        let mut guard = self.cond.lock();
        guard.value += 1;
        if guard.value <= 0 {
            guard.wakeups += 1;
            guard.signal(WAITERS);
        }
    }

    /// Current value; negative values count parked threads
    pub fn value(&self) -> i64 {
        self.cond.lock().value
    }

    /// Whether at least one thread is parked in `acquire`
    pub fn has_waiting(&self) -> bool {
        self.cond.lock().value < 0
    }

    /// Back to zero, force-waking every parked thread
    pub fn reset(&self) {
        let mut guard = self.cond.lock();
        guard.value = 0;
        guard.wakeups = 0;
        guard.epoch = guard.epoch.wrapping_add(1);
        guard.broadcast(WAITERS);
    }
}

impl Default for Freezer {
    fn default() -> Self {
        Self::new()
    }
}
