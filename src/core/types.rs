/*!
 * Core Types
 * Common types used across the crate
 */

/// Logical position of an item in the overall stream
///
/// Assigned by the scattering side, strictly increasing by one per item.
/// Wide enough that wraparound is not reachable during a structure's
/// lifetime; the below-watermark skip logic is defensive only.
pub type SeqIndex = u64;

/// Physical position of a slot inside a ring's storage table
pub type SlotPos = usize;

/// Caller-supplied out-of-band signal carried alongside a payload
pub type Flag = i32;
