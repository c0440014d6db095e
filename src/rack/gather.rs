/*!
 * Gather Queue
 *
 * Multi-worker, single-collector ring. Workers push results tagged with the
 * sequence index their scatter item carried, in whatever order they finish;
 * the collector drains strictly in ascending index order, parking until the
 * gap at the front is filled.
 *
 * The collector and the workers park on two separate instances of the
 * ring's single condition, so a worker freeing room never steals a wakeup
 * meant for the collector and vice versa. When only one free slot remains
 * it is reserved for the index the collector is actually waiting on;
 * pushes of any other index park until room reappears, which keeps the
 * pipeline from wedging with every slot holding an undeliverable result.
 */

use super::types::{RackStats, Slot};
use crate::core::errors::{RackError, RackResult};
use crate::core::limits::MAX_RACK_CAPACITY;
use crate::core::types::{Flag, SeqIndex, SlotPos};
use crate::sync::Condition;
use log::debug;
use std::collections::BTreeMap;

/// Instance the collector parks on while the front of the run is missing
const DATA: usize = 0;
/// Instance workers park on while no usable slot is free
const ROOM: usize = 1;

struct GatherState<T> {
    /// Watermark: index the next `gather` call will yield first
    next_index: SeqIndex,
    table: Vec<Slot<T>>,
    corres: BTreeMap<SeqIndex, SlotPos>,
    free: Vec<SlotPos>,
}

/// Order-restoring result collection ring
pub struct GatherQueue<T> {
    cond: Condition<GatherState<T>>,
}

impl<T> GatherQueue<T> {
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
                GatherState {
                    next_index: 0,
                    table,
                    corres: BTreeMap::new(),
                    free,
                },
            ),
        })
    }

    /// Worker side: deposit a result under the sequence index it was
    /// claimed with
    ///
    /// Fails with a range error if `index` already has a pending entry.
    /// Parks while no slot is free, and also while only the reserved last
    /// slot is free and `index` is not the one the collector expects next.
    /// Wakes the collector when this push fills the front of the run.
    ///
    /// With capacity 1 the reservation means an out-of-order push from the
    /// only producing thread parks forever; a single worker at capacity 1
    /// must push in index order.
    pub fn worker_push_one(&self, index: SeqIndex, item: T, flag: Flag) -> RackResult<()> {
        let mut guard = self.cond.lock();

        loop {
            if guard.corres.contains_key(&index) {
                return Err(RackError::DuplicateIndex(index));
            }
            let usable = match guard.free.len() {
                0 => false,
                1 => index == guard.next_index,
                _ => true,
            };
            if usable {
                break;
            }
            guard.wait(ROOM);
        }

        let pos = match guard.free.pop() {
            Some(pos) => pos,
            None => unreachable!("free pool emptied while the lock was held"),
        };
        if guard.table[pos].payload.is_some() {
            panic!("gather: internal consistency violation: free slot {pos} is occupied");
        }

        guard.table[pos].payload = Some(item);
        guard.table[pos].index = index;
        guard.table[pos].flag = flag;
        guard.corres.insert(index, pos);

        if index == guard.next_index && guard.waiting_count(DATA) > 0 {
            guard.signal(DATA);
        }
        Ok(())
    }

    /// Collector side: take the contiguous run starting at the watermark
    ///
    /// Parks until the watermark index is present, then drains every
    /// contiguous index from there (several, if workers got ahead while the
    /// collector was parked) and advances the watermark past the run.
    /// Wakes parked workers for every slot freed. Entries below the
    /// watermark (wraparound leftovers) are dropped without being yielded.
    pub fn gather(&self) -> Vec<(T, Flag)> {
        let mut guard = self.cond.lock();
        let mut out = Vec::new();

        loop {
            let mut freed = 0usize;

            loop {
                let front = guard
                    .corres
                    .iter()
                    .next()
                    .map(|(&index, &pos)| (index, pos));
                let (index, pos) = match front {
                    Some(entry) => entry,
                    None => break,
                };

                if index > guard.next_index {
                    // Gap at the front of the run
                    break;
                }

                if index == guard.next_index {
                    if guard.table[pos].index != index {
                        panic!(
                            "gather: internal consistency violation: slot {pos} holds index {} not {}",
                            guard.table[pos].index, index
                        );
                    }
                    let item = match guard.table[pos].payload.take() {
                        Some(item) => item,
                        None => panic!(
                            "gather: internal consistency violation: mapped slot {pos} is empty"
                        ),
                    };
                    out.push((item, guard.table[pos].flag));
                    guard.next_index = guard.next_index.wrapping_add(1);
                } else {
                    // Stale leftover from index wraparound
                    guard.table[pos].payload = None;
                }

                guard.free.push(pos);
                guard.corres.remove(&index);
                freed += 1;
            }

            if freed > 0 && guard.waiting_count(ROOM) > 0 {
                guard.broadcast(ROOM);
            }
            if !out.is_empty() {
                return out;
            }
            guard.wait(DATA);
        }
    }

    /// Back to the initial empty configuration, force-waking all waiters
    pub fn reset(&self) {
        let mut guard = self.cond.lock();
        let capacity = guard.table.len();

        guard.next_index = 0;
        guard.corres.clear();
        for slot in guard.table.iter_mut() {
            slot.payload = None;
        }
        guard.free.clear();
        guard.free.extend(0..capacity);

        guard.broadcast(DATA);
        guard.broadcast(ROOM);
        debug!("gather: reset with {capacity} slots");
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
            watermark: guard.next_index,
            waiting_consumers: guard.waiting_count(DATA),
            waiting_producers: guard.waiting_count(ROOM),
        }
    }
}
