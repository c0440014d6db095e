/*!
 * Cyclic Barrier
 * N-thread rendezvous that rearms itself after each cohort releases
 */

use super::condition::Condition;

const ARRIVALS: usize = 0;

struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// Blocks each caller of `wait` until `count` threads have arrived
pub struct Barrier {
    cond: Condition<BarrierState>,
    count: usize,
}

impl Barrier {
    /// Create a barrier for a cohort of `count` threads
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "barrier cohort size must be at least 1");
        Self {
            cond: Condition::new(
                1,
                BarrierState {
                    arrived: 0,
                    generation: 0,
                },
            ),
            count,
        }
    }

    /// Park until `count` threads have called `wait`, then release them all
    ///
    /// The generation counter distinguishes cohorts, so a thread re-entering
    /// immediately cannot consume a wakeup belonging to the previous cycle.
    pub fn wait(&self) {
        let mut guard = self.cond.lock();
        guard.arrived += 1;
        if guard.arrived == self.count {
            guard.arrived = 0;
            guard.generation = guard.generation.wrapping_add(1);
            guard.broadcast(ARRIVALS);
        } else {
            let generation = guard.generation;
            while guard.generation == generation {
                guard.wait(ARRIVALS);
            }
        }
    }

    /// Cohort size fixed at construction
    pub fn count(&self) -> usize {
        self.count
    }
}
