/*!
 * Construction Limits
 *
 * Centralized bounds validated by the constructors. All structures allocate
 * their full storage up front, so these caps bound worst-case memory per
 * instance rather than steady-state behavior.
 */

/// Maximum number of slots in a scatter or gather rack
///
/// Slot metadata (correspondence map + free list) stays in the low MB range
/// at this bound.
pub const MAX_RACK_CAPACITY: usize = 1 << 20;

/// Maximum number of blocks in an exchange buffer
pub const MAX_EXCHANGE_CAPACITY: usize = 1 << 16;

/// Maximum number of elements per exchange block
pub const MAX_BLOCK_SIZE: usize = 1 << 24;

/// Maximum wait/signal instances on a single condition
///
/// Nothing in the crate needs more than two; the cap catches accidental
/// huge values passed as an instance count.
pub const MAX_CONDITION_INSTANCES: usize = 64;
