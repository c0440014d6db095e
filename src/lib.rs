/*!
 * seqrack
 *
 * Blocking hand-off structures for thread pipelines: a single-feeder/
 * single-fetcher block exchange buffer, an order-preserving scatter/gather
 * ring pair keyed by sequence indices, and the layered primitives they are
 * built from (multi-instance condition, semaphores, barrier).
 *
 * Every structure owns exactly one internal lock; all blocking is
 * condition-variable parking under that lock, released by the
 * complementary operation or by an explicit `reset`.
 */

pub mod core;
pub mod exchange;
pub mod rack;
pub mod sync;

// Re-exports
pub use crate::core::errors::{
    ExchangeError, ExchangeResult, RackError, RackResult, SyncError, SyncResult,
};
pub use crate::core::types::{Flag, SeqIndex, SlotPos};
pub use exchange::{ExchangeBuffer, ExchangeStats, FeedBlock, FetchBlock};
pub use rack::{GatherQueue, RackStats, ScatterQueue};
pub use sync::{Barrier, Condition, ConditionGuard, Freezer, Semaphore};
