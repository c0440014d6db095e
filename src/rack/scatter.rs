/*!
 * Scatter Queue
 *
 * Single-feeder, multi-worker ring that stamps every item with a strictly
 * increasing sequence index. Workers claim items in ascending index order
 * (a worker can never skip ahead), so results pushed into a matching
 * `GatherQueue` under the claimed index can be reassembled into the
 * original order without any coordination between the two sides.
 */

use super::types::{RackStats, Slot};
use crate::core::errors::{RackError, RackResult};
use crate::core::limits::MAX_RACK_CAPACITY;
use crate::core::types::{Flag, SeqIndex, SlotPos};
use crate::sync::Condition;
use log::debug;
use std::collections::BTreeMap;

/// Instance workers park on while nothing is claimable
const DATA: usize = 0;
/// Instance the feeder parks on while the ring is full
const ROOM: usize = 1;

struct ScatterState<T> {
    /// Index the next `scatter` call will assign
    next_index: SeqIndex,
    /// Index the next `worker_get_one` call must claim
    lowest_index: SeqIndex,
    table: Vec<Slot<T>>,
    corres: BTreeMap<SeqIndex, SlotPos>,
    free: Vec<SlotPos>,
}

/// Order-preserving work dispatch ring
///
/// # Examples
///
/// ```
/// use seqrack::rack::ScatterQueue;
///
/// let queue = ScatterQueue::new(4, 0).unwrap();
/// queue.scatter("job", 0);
/// let (item, index, _flag) = queue.worker_get_one();
/// assert_eq!((item, index), ("job", 0));
/// ```
pub struct ScatterQueue<T> {
    cond: Condition<ScatterState<T>>,
}

impl<T> ScatterQueue<T> {
    /// Create a ring of `capacity` slots; `default_flag` seeds every slot
    pub fn new(capacity: usize, default_flag: Flag) -> RackResult<Self> {
        if capacity == 0 || capacity > MAX_RACK_CAPACITY {
            return Err(RackError::InvalidCapacity {
                what: "capacity",
                requested: capacity,
                max: MAX_RACK_CAPACITY,
            });
        }

        let mut table = Vec::new();
        table
            .try_reserve_exact(capacity)
            .map_err(|e| RackError::AllocationFailed(e.to_string()))?;
        table.extend((0..capacity).map(|_| Slot::new(default_flag)));

        let mut free = Vec::new();
        free.try_reserve_exact(capacity)
            .map_err(|e| RackError::AllocationFailed(e.to_string()))?;
        free.extend(0..capacity);

        Ok(Self {
            cond: Condition::new(
                2,
                ScatterState {
                    next_index: 0,
                    lowest_index: 0,
                    table,
                    corres: BTreeMap::new(),
                    free,
                },
            ),
        })
    }

    /// Feeder side: store `item` under the next sequence index
    ///
    /// Parks while the ring is full. Indices are assigned in strict call
    /// order; the matching index is what `worker_get_one` hands back.
    /// Wakes one parked worker if any were waiting for data.
    pub fn scatter(&self, item: T, flag: Flag) {
        let mut guard = self.cond.lock();

        while guard.free.is_empty() {
            guard.wait(ROOM);
        }

        let pos = match guard.free.pop() {
            Some(pos) => pos,
            None => unreachable!("free pool emptied while the lock was held"),
        };
        if guard.table[pos].payload.is_some() {
            panic!("scatter: internal consistency violation: free slot {pos} is occupied");
        }

        let index = guard.next_index;
        guard.table[pos].payload = Some(item);
        guard.table[pos].index = index;
        guard.table[pos].flag = flag;
        if guard.corres.insert(index, pos).is_some() {
            panic!("scatter: internal consistency violation: index {index} already mapped");
        }
        guard.next_index = guard.next_index.wrapping_add(1);

        if guard.waiting_count(DATA) > 0 {
            guard.signal(DATA);
        }
    }

    /// Worker side: claim the item with the smallest available index
    ///
    /// Parks while nothing is claimable. The claim advances the watermark,
    /// so concurrent workers observe strictly ascending indices. Returns
    /// the item, its sequence index, and the flag the feeder attached.
    pub fn worker_get_one(&self) -> (T, SeqIndex, Flag) {
        let mut guard = self.cond.lock();

        loop {
            // First entry at or above the watermark; anything below is a
            // stale leftover from index wraparound and stays skipped.
            let lowest = guard.lowest_index;
            let found = guard
                .corres
                .range(lowest..)
                .next()
                .map(|(&index, &pos)| (index, pos));

            let (index, pos) = match found {
                Some(entry) => entry,
                None => {
                    guard.wait(DATA);
                    continue;
                }
            };

            if index != guard.lowest_index {
                panic!(
                    "scatter: internal consistency violation: first claimable index {} is not the watermark {}",
                    index, guard.lowest_index
                );
            }
            let item = match guard.table[pos].payload.take() {
                Some(item) => item,
                None => panic!(
                    "scatter: internal consistency violation: mapped slot {pos} is empty"
                ),
            };
            let flag = guard.table[pos].flag;

            guard.lowest_index = index.wrapping_add(1);
            // LIFO reuse keeps the most recently touched slot hot
            guard.free.push(pos);
            guard.corres.remove(&index);

            if guard.waiting_count(ROOM) > 0 {
                guard.signal(ROOM);
            }

            return (item, index, flag);
        }
    }

    /// Back to the initial empty configuration, force-waking all waiters
    pub fn reset(&self) {
        let mut guard = self.cond.lock();
        let capacity = guard.table.len();

        guard.next_index = 0;
        guard.lowest_index = 0;
        guard.corres.clear();
        for slot in guard.table.iter_mut() {
            slot.payload = None;
        }
        guard.free.clear();
        guard.free.extend(0..capacity);

        guard.broadcast(DATA);
        guard.broadcast(ROOM);
        debug!("scatter: reset with {capacity} slots");
    }

    /// Number of slots fixed at construction
    pub fn capacity(&self) -> usize {
        self.cond.lock().table.len()
    }

    /// Point-in-time snapshot for diagnostics
    pub fn stats(&self) -> RackStats {
        let guard = self.cond.lock();
        RackStats {
            capacity: guard.table.len(),
            occupied: guard.corres.len(),
            next_index: guard.next_index,
            watermark: guard.lowest_index,
            waiting_consumers: guard.waiting_count(DATA),
            waiting_producers: guard.waiting_count(ROOM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fill_then_drain_in_order() {
        let queue = ScatterQueue::new(3, 0).unwrap();
        queue.scatter("a", 10);
        queue.scatter("b", 20);
        queue.scatter("c", 30);

        assert_eq!(queue.worker_get_one(), ("a", 0, 10));
        assert_eq!(queue.worker_get_one(), ("b", 1, 20));
        assert_eq!(queue.worker_get_one(), ("c", 2, 30));
    }

    #[test]
    fn test_scatter_blocks_when_full() {
        let queue = Arc::new(ScatterQueue::new(2, 0).unwrap());
        queue.scatter(1u32, 0);
        queue.scatter(2u32, 0);

        let handle = {
            let queue = queue.clone();
            thread::spawn(move || queue.scatter(3u32, 0))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());
        assert_eq!(queue.stats().waiting_producers, 1);

        let (item, index, _) = queue.worker_get_one();
        assert_eq!((item, index), (1, 0));
        handle.join().unwrap();
        assert_eq!(queue.stats().occupied, 2);
    }

    #[test]
    fn test_worker_blocks_until_scatter() {
        let queue = Arc::new(ScatterQueue::new(2, 0).unwrap());

        let handle = {
            let queue = queue.clone();
            thread::spawn(move || queue.worker_get_one())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished());

        queue.scatter(7u32, -1);
        assert_eq!(handle.join().unwrap(), (7, 0, -1));
    }

    #[test]
    fn test_reset_restores_empty_state() {
        let queue = ScatterQueue::new(2, 0).unwrap();
        queue.scatter(1u32, 0);
        queue.reset();

        let stats = queue.stats();
        assert_eq!(stats.occupied, 0);
        assert_eq!(stats.next_index, 0);
        assert_eq!(stats.watermark, 0);

        // Indices restart from zero after a reset
        queue.scatter(2u32, 0);
        assert_eq!(queue.worker_get_one(), (2, 0, 0));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            ScatterQueue::<u32>::new(0, 0),
            Err(RackError::InvalidCapacity { .. })
        ));
    }
}
