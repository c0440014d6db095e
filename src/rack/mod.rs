/*!
 * Sequence Rack
 *
 * The order-preserving scatter/gather pair. A dispatcher thread feeds a
 * `ScatterQueue` with work items that receive strictly increasing sequence
 * indices; a pool of workers claims items in ascending index order,
 * processes them at any pace, and pushes results into a `GatherQueue`
 * tagged with the same index; a collector drains the gather side strictly
 * in index order, whatever order workers finished in.
 *
 * Both rings share the same slot/arena model: a fixed table of slots, an
 * ordered correspondence map from sequence index to slot position, and a
 * LIFO free-slot pool.
 */

mod gather;
mod scatter;
mod types;

pub use gather::GatherQueue;
pub use scatter::ScatterQueue;
pub use types::RackStats;
