/*!
 * Exchange Buffer
 *
 * Asynchronous hand-off of fixed-size blocks between exactly one feeder
 * thread and exactly one fetcher thread, over a fixed-capacity ring.
 *
 * The feeder proceeds in two steps: `acquire_feed_block` yields a checkout
 * token with write access to the next free block, and `commit_feed`
 * publishes it with the number of elements actually written (or
 * `cancel_feed_block` returns it unpublished). The fetcher mirrors this
 * with `acquire_fetch_block` and `recycle_fetch_block` (or
 * `push_back_fetch_block` to re-queue a partially consumed block in place).
 *
 * A buffer of capacity K holds up to K published blocks: the feeder parks
 * once K blocks are published and unrecycled, the fetcher parks while none
 * are. Each role may have at most one block checked out at a time; the
 * token protocol makes double-return unrepresentable and validates the rest
 * on return. Publishing a block of length zero is the conventional
 * end-of-stream marker between cooperating threads; the buffer itself does
 * not interpret it.
 */

use super::types::{ExchangeStats, FeedBlock, FetchBlock};
use crate::core::errors::{ExchangeError, ExchangeResult};
use crate::core::limits::{MAX_BLOCK_SIZE, MAX_EXCHANGE_CAPACITY};
use crate::sync::Condition;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Instance the feeder parks on while the ring is full
const FEEDER: usize = 0;
/// Instance the fetcher parks on while the ring is empty
const FETCHER: usize = 1;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

struct BlockCell<T> {
    /// None while the block is checked out to a role
    storage: Option<Vec<T>>,
    /// Published element count, meaningful between commit and recycle
    len: usize,
}

struct ExchangeState<T> {
    blocks: Vec<BlockCell<T>>,
    next_feed: usize,
    next_fetch: usize,
    /// Published blocks not yet recycled; next_feed == next_fetch + occupied (mod capacity)
    occupied: usize,
    feed_out: bool,
    fetch_out: bool,
}

/// Bounded single-feeder/single-fetcher block ring
pub struct ExchangeBuffer<T> {
    id: u64,
    capacity: usize,
    block_size: usize,
    cond: Condition<ExchangeState<T>>,
}

impl<T: Default + Clone> ExchangeBuffer<T> {
    /// Create a buffer of `capacity` blocks of `block_size` elements each
    ///
    /// All storage is allocated here; failure rolls back atomically and
    /// surfaces as a distinct allocation error.
    pub fn new(capacity: usize, block_size: usize) -> ExchangeResult<Self> {
        if capacity == 0 || capacity > MAX_EXCHANGE_CAPACITY {
            return Err(ExchangeError::InvalidCapacity {
                what: "capacity",
                requested: capacity,
                max: MAX_EXCHANGE_CAPACITY,
            });
        }
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(ExchangeError::InvalidCapacity {
                what: "block size",
                requested: block_size,
                max: MAX_BLOCK_SIZE,
            });
        }

        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(capacity)
            .map_err(|e| ExchangeError::AllocationFailed(e.to_string()))?;
        for _ in 0..capacity {
            blocks.push(BlockCell {
                storage: Some(Self::alloc_block(block_size)?),
                len: 0,
            });
        }

        let id = NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "exchange {}: created with {} blocks of {} elements",
            id, capacity, block_size
        );

        Ok(Self {
            id,
            capacity,
            block_size,
            cond: Condition::new(
                2,
                ExchangeState {
                    blocks,
                    next_feed: 0,
                    next_fetch: 0,
                    occupied: 0,
                    feed_out: false,
                    fetch_out: false,
                },
            ),
        })
    }

    fn alloc_block(block_size: usize) -> ExchangeResult<Vec<T>> {
        let mut block = Vec::new();
        block
            .try_reserve_exact(block_size)
            .map_err(|e| ExchangeError::AllocationFailed(e.to_string()))?;
        block.resize(block_size, T::default());
        Ok(block)
    }

    /// Feeder step 1: check out the next free block for writing
    ///
    /// Parks while the ring is full, until the fetcher recycles a block.
    /// Fails with a protocol error if a feed block is already outstanding.
    pub fn acquire_feed_block(&self) -> ExchangeResult<FeedBlock<T>> {
        let mut guard = self.cond.lock();
        if guard.feed_out {
            warn!("exchange {}: feed block already checked out", self.id);
            return Err(ExchangeError::Protocol(
                "a feed block is already checked out".into(),
            ));
        }

        while guard.occupied == self.capacity {
            guard.wait(FEEDER);
        }

        let pos = guard.next_feed;
        let data = match guard.blocks[pos].storage.take() {
            Some(data) => data,
            None => panic!(
                "exchange {}: internal consistency violation: free block {} has no storage",
                self.id, pos
            ),
        };
        guard.feed_out = true;

        Ok(FeedBlock {
            data,
            pos,
            owner: self.id,
        })
    }

    /// Feeder step 2: publish the checked-out block
    ///
    /// `written` is the number of leading elements that carry data; the
    /// fetcher will see exactly that prefix. Wakes the fetcher if it was
    /// parked on an empty ring.
    ///
    /// The token is consumed even on failure; if it is rejected (foreign
    /// token, stale after `reset`), the slot storage it carried is restored
    /// by the owning buffer's next `reset`.
    pub fn commit_feed(&self, block: FeedBlock<T>, written: usize) -> ExchangeResult<()> {
        if written > self.block_size {
            return Err(ExchangeError::LengthOutOfRange {
                requested: written,
                limit: self.block_size,
            });
        }

        let mut guard = self.cond.lock();
        self.check_feed_return(&guard, &block)?;

        let pos = block.pos;
        guard.blocks[pos].storage = Some(block.data);
        guard.blocks[pos].len = written;
        guard.feed_out = false;
        guard.next_feed = (pos + 1) % self.capacity;
        guard.occupied += 1;

        if guard.waiting_count(FETCHER) > 0 {
            guard.signal(FETCHER);
        }
        Ok(())
    }

    /// Feeder step 2 alternative: return the block unpublished
    ///
    /// The next `acquire_feed_block` hands out the same physical block.
    pub fn cancel_feed_block(&self, block: FeedBlock<T>) -> ExchangeResult<()> {
        let mut guard = self.cond.lock();
        self.check_feed_return(&guard, &block)?;

        guard.blocks[block.pos].storage = Some(block.data);
        guard.feed_out = false;
        Ok(())
    }

    /// Fetcher step 1: check out the oldest published block for reading
    ///
    /// Parks while the ring is empty, until the feeder publishes a block.
    /// Fails with a protocol error if a fetch block is already outstanding.
    pub fn acquire_fetch_block(&self) -> ExchangeResult<FetchBlock<T>> {
        let mut guard = self.cond.lock();
        if guard.fetch_out {
            warn!("exchange {}: fetch block already checked out", self.id);
            return Err(ExchangeError::Protocol(
                "a fetch block is already checked out".into(),
            ));
        }

        while guard.occupied == 0 {
            guard.wait(FETCHER);
        }

        let pos = guard.next_fetch;
        let available = guard.blocks[pos].len;
        let data = match guard.blocks[pos].storage.take() {
            Some(data) => data,
            None => panic!(
                "exchange {}: internal consistency violation: published block {} has no storage",
                self.id, pos
            ),
        };
        guard.fetch_out = true;

        Ok(FetchBlock {
            data,
            available,
            pos,
            owner: self.id,
        })
    }

    /// Fetcher step 2: return the block to the free pool
    ///
    /// Advances the fetch cursor and wakes the feeder if it was parked on a
    /// full ring. The token is consumed even on failure.
    pub fn recycle_fetch_block(&self, block: FetchBlock<T>) -> ExchangeResult<()> {
        let mut guard = self.cond.lock();
        self.check_fetch_return(&guard, &block)?;

        let pos = block.pos;
        guard.blocks[pos].storage = Some(block.data);
        guard.blocks[pos].len = 0;
        guard.fetch_out = false;
        guard.next_fetch = (pos + 1) % self.capacity;
        guard.occupied -= 1;

        if guard.waiting_count(FEEDER) > 0 {
            guard.signal(FEEDER);
        }
        Ok(())
    }

    /// Fetcher step 2 alternative: re-queue a partially consumed block
    ///
    /// The caller must have compacted the unread elements to the front of
    /// the block; `remaining` is how many are left. The next
    /// `acquire_fetch_block` returns the same block with that length.
    pub fn push_back_fetch_block(
        &self,
        block: FetchBlock<T>,
        remaining: usize,
    ) -> ExchangeResult<()> {
        if remaining > block.available {
            return Err(ExchangeError::LengthOutOfRange {
                requested: remaining,
                limit: block.available,
            });
        }

        let mut guard = self.cond.lock();
        self.check_fetch_return(&guard, &block)?;

        guard.blocks[block.pos].storage = Some(block.data);
        guard.blocks[block.pos].len = remaining;
        guard.fetch_out = false;
        Ok(())
    }

    /// Back to the just-constructed state, force-waking all waiters
    ///
    /// Checkout tokens outstanding across a reset are invalidated; their
    /// orphaned slot storage is reallocated here.
    pub fn reset(&self) {
        let mut guard = self.cond.lock();
        let block_size = self.block_size;
        for cell in guard.blocks.iter_mut() {
            if cell.storage.is_none() {
                cell.storage = Some(vec![T::default(); block_size]);
            }
            cell.len = 0;
        }
        guard.next_feed = 0;
        guard.next_fetch = 0;
        guard.occupied = 0;
        guard.feed_out = false;
        guard.fetch_out = false;
        guard.broadcast(FEEDER);
        guard.broadcast(FETCHER);
        debug!("exchange {}: reset", self.id);
    }

    /// Whether no published block is pending fetch
    pub fn is_empty(&self) -> bool {
        self.cond.lock().occupied == 0
    }

    /// Whether the next `acquire_feed_block` would park
    pub fn is_full(&self) -> bool {
        self.cond.lock().occupied == self.capacity
    }

    /// Number of blocks fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Elements per block fixed at construction
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Point-in-time snapshot for diagnostics
    pub fn stats(&self) -> ExchangeStats {
        let guard = self.cond.lock();
        ExchangeStats {
            capacity: self.capacity,
            block_size: self.block_size,
            occupied: guard.occupied,
            feed_block_out: guard.feed_out,
            fetch_block_out: guard.fetch_out,
            waiting_feeder: guard.waiting_count(FEEDER),
            waiting_fetcher: guard.waiting_count(FETCHER),
        }
    }

    fn check_feed_return(
        &self,
        guard: &crate::sync::ConditionGuard<'_, ExchangeState<T>>,
        block: &FeedBlock<T>,
    ) -> ExchangeResult<()> {
        if block.owner != self.id {
            warn!("exchange {}: foreign feed block returned", self.id);
            return Err(ExchangeError::Protocol(
                "block belongs to another exchange buffer".into(),
            ));
        }
        if !guard.feed_out {
            return Err(ExchangeError::Protocol("no feed block is checked out".into()));
        }
        if block.pos != guard.next_feed {
            return Err(ExchangeError::Protocol(
                "returned block does not match the checked-out feed block".into(),
            ));
        }
        Ok(())
    }

    fn check_fetch_return(
        &self,
        guard: &crate::sync::ConditionGuard<'_, ExchangeState<T>>,
        block: &FetchBlock<T>,
    ) -> ExchangeResult<()> {
        if block.owner != self.id {
            warn!("exchange {}: foreign fetch block returned", self.id);
            return Err(ExchangeError::Protocol(
                "block belongs to another exchange buffer".into(),
            ));
        }
        if !guard.fetch_out {
            return Err(ExchangeError::Protocol(
                "no fetch block is checked out".into(),
            ));
        }
        if block.pos != guard.next_fetch {
            return Err(ExchangeError::Protocol(
                "returned block does not match the checked-out fetch block".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_data() {
        let buffer = ExchangeBuffer::<u8>::new(2, 4).unwrap();

        let mut block = buffer.acquire_feed_block().unwrap();
        assert_eq!(block.max_len(), 4);
        block[0] = b'A';
        block[1] = b'B';
        buffer.commit_feed(block, 2).unwrap();

        let fetched = buffer.acquire_fetch_block().unwrap();
        assert_eq!(fetched.available_len(), 2);
        assert_eq!(&*fetched, b"AB");
        buffer.recycle_fetch_block(fetched).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_double_acquire_is_protocol_error() {
        let buffer = ExchangeBuffer::<u8>::new(2, 4).unwrap();
        let block = buffer.acquire_feed_block().unwrap();
        assert!(matches!(
            buffer.acquire_feed_block(),
            Err(ExchangeError::Protocol(_))
        ));
        buffer.cancel_feed_block(block).unwrap();
        // After cancel the checkout is available again
        let block = buffer.acquire_feed_block().unwrap();
        buffer.commit_feed(block, 0).unwrap();
    }

    #[test]
    fn test_foreign_token_rejected() {
        let ours = ExchangeBuffer::<u8>::new(2, 4).unwrap();
        let theirs = ExchangeBuffer::<u8>::new(2, 4).unwrap();

        let block = theirs.acquire_feed_block().unwrap();
        assert!(matches!(
            ours.commit_feed(block, 1),
            Err(ExchangeError::Protocol(_))
        ));
    }

    #[test]
    fn test_oversize_commit_rejected() {
        let buffer = ExchangeBuffer::<u8>::new(2, 4).unwrap();
        let block = buffer.acquire_feed_block().unwrap();
        assert_eq!(
            buffer.commit_feed(block, 5),
            Err(ExchangeError::LengthOutOfRange {
                requested: 5,
                limit: 4
            })
        );
    }

    #[test]
    fn test_push_back_returns_same_block() {
        let buffer = ExchangeBuffer::<u8>::new(2, 4).unwrap();

        let mut block = buffer.acquire_feed_block().unwrap();
        block[..3].copy_from_slice(b"XYZ");
        buffer.commit_feed(block, 3).unwrap();

        let mut fetched = buffer.acquire_fetch_block().unwrap();
        assert_eq!(&*fetched, b"XYZ");
        // Consume "X", compact the rest to the front
        fetched.copy_within(1..3, 0);
        buffer.push_back_fetch_block(fetched, 2).unwrap();

        let again = buffer.acquire_fetch_block().unwrap();
        assert_eq!(&*again, b"YZ");
        buffer.recycle_fetch_block(again).unwrap();
    }

    #[test]
    fn test_cancel_hands_out_same_block_position() {
        let buffer = ExchangeBuffer::<u8>::new(3, 2).unwrap();
        let block = buffer.acquire_feed_block().unwrap();
        let pos = block.pos;
        buffer.cancel_feed_block(block).unwrap();
        let block = buffer.acquire_feed_block().unwrap();
        assert_eq!(block.pos, pos);
        buffer.cancel_feed_block(block).unwrap();
    }

    #[test]
    fn test_capacity_accounting() {
        let buffer = ExchangeBuffer::<u32>::new(2, 1).unwrap();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());

        for value in [1u32, 2] {
            let mut block = buffer.acquire_feed_block().unwrap();
            block[0] = value;
            buffer.commit_feed(block, 1).unwrap();
        }
        assert!(buffer.is_full());

        let stats = buffer.stats();
        assert_eq!(stats.occupied, 2);
        assert!(!stats.feed_block_out);
    }

    #[test]
    fn test_reset_invalidates_outstanding_token() {
        let buffer = ExchangeBuffer::<u8>::new(2, 4).unwrap();
        let block = buffer.acquire_feed_block().unwrap();
        buffer.reset();
        assert!(matches!(
            buffer.commit_feed(block, 1),
            Err(ExchangeError::Protocol(_))
        ));
        // The orphaned slot storage was reallocated by reset
        let block = buffer.acquire_feed_block().unwrap();
        assert_eq!(block.max_len(), 4);
        buffer.cancel_feed_block(block).unwrap();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            ExchangeBuffer::<u8>::new(0, 4),
            Err(ExchangeError::InvalidCapacity { .. })
        ));
        assert!(matches!(
            ExchangeBuffer::<u8>::new(4, 0),
            Err(ExchangeError::InvalidCapacity { .. })
        ));
    }
}
