/*!
 * Synchronization Primitives
 *
 * Layered blocking primitives for preemptive OS threads:
 * - `Condition<T>`: one exclusive lock guarding a value, with N
 *   independently signalable wait instances and exact waiter counts
 * - `Semaphore`: bounded counting semaphore
 * - `Freezer`: unbounded counting semaphore starting at zero
 * - `Barrier`: cyclic N-thread rendezvous
 *
 * The ring structures in `rack` and `exchange` are built on `Condition`
 * with two named instances sharing the structure's single lock, so waiters
 * of different roles never receive each other's wakeups.
 */

mod barrier;
mod condition;
mod freezer;
mod semaphore;

pub use barrier::Barrier;
pub use condition::{Condition, ConditionGuard};
pub use freezer::Freezer;
pub use semaphore::Semaphore;
