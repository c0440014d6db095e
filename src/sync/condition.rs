/*!
 * Multi-Instance Condition
 *
 * One exclusive lock guarding a value of type `T`, plus a fixed number of
 * independently addressable wait/signal/broadcast instances. Each instance
 * has its own condition variable and an exact waiter count maintained under
 * the lock, so callers can signal only when someone is actually parked.
 */

use crate::core::limits::MAX_CONDITION_INSTANCES;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};

struct Inner<T> {
    value: T,
    waiting: Box<[usize]>,
}

/// A lock with N signalable wait instances guarding a value of type `T`
///
/// # Examples
///
/// ```
/// use seqrack::sync::Condition;
///
/// const READY: usize = 0;
///
/// let cond = Condition::new(1, 0u32);
/// let mut guard = cond.lock();
/// *guard = 7;
/// guard.signal(READY);
/// ```
pub struct Condition<T> {
    inner: Mutex<Inner<T>>,
    posts: Box<[Condvar]>,
}

impl<T> Condition<T> {
    /// Create a condition with `instances` wait instances guarding `value`
    ///
    /// # Panics
    ///
    /// Panics if `instances` is zero or above `MAX_CONDITION_INSTANCES`.
    pub fn new(instances: usize, value: T) -> Self {
        assert!(
            instances >= 1 && instances <= MAX_CONDITION_INSTANCES,
            "condition instance count {} not in 1..={}",
            instances,
            MAX_CONDITION_INSTANCES
        );

        let posts: Box<[Condvar]> = (0..instances).map(|_| Condvar::new()).collect();
        Self {
            inner: Mutex::new(Inner {
                value,
                waiting: vec![0; instances].into_boxed_slice(),
            }),
            posts,
        }
    }

    /// Acquire the lock, blocking until it is available
    pub fn lock(&self) -> ConditionGuard<'_, T> {
        ConditionGuard {
            inner: self.inner.lock(),
            posts: &self.posts,
        }
    }

    /// Acquire the lock only if it is not currently held
    pub fn try_lock(&self) -> Option<ConditionGuard<'_, T>> {
        self.inner.try_lock().map(|inner| ConditionGuard {
            inner,
            posts: &self.posts,
        })
    }

    /// Number of wait instances fixed at construction
    pub fn instances(&self) -> usize {
        self.posts.len()
    }
}

/// Exclusive access to the guarded value plus wait/signal operations
///
/// Instance arguments index like slices: an out-of-range instance panics.
pub struct ConditionGuard<'a, T> {
    inner: MutexGuard<'a, Inner<T>>,
    posts: &'a [Condvar],
}

impl<'a, T> ConditionGuard<'a, T> {
    /// Atomically release the lock, park on `instance`, reacquire on wakeup
    ///
    /// Wakeups are not tied to any predicate; callers loop and re-check
    /// their condition after every return.
    pub fn wait(&mut self, instance: usize) {
        self.inner.waiting[instance] += 1;
        let posts = self.posts;
        posts[instance].wait(&mut self.inner);
        self.inner.waiting[instance] -= 1;
    }

    /// Wake one waiter parked on `instance`; returns whether one was woken
    pub fn signal(&self, instance: usize) -> bool {
        self.posts[instance].notify_one()
    }

    /// Wake all waiters parked on `instance`; returns how many were woken
    pub fn broadcast(&self, instance: usize) -> usize {
        self.posts[instance].notify_all()
    }

    /// Exact number of threads currently parked on `instance`
    pub fn waiting_count(&self, instance: usize) -> usize {
        self.inner.waiting[instance]
    }
}

impl<'a, T> Deref for ConditionGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<'a, T> DerefMut for ConditionGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner.value
    }
}
