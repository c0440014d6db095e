/*!
 * Exchange Types
 * Checkout tokens and serializable stats for the exchange buffer
 */

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Exclusive write access to one block, checked out by the feeder
///
/// Dereferences to the whole block (`max_len` elements). The token must be
/// returned to the buffer it came from via `commit_feed` or
/// `cancel_feed_block`; it is consumed either way, so the checkout can never
/// be returned twice.
pub struct FeedBlock<T> {
    pub(super) data: Vec<T>,
    pub(super) pos: usize,
    pub(super) owner: u64,
}

impl<T> FeedBlock<T> {
    /// Maximum number of elements the block can carry
    pub fn max_len(&self) -> usize {
        self.data.len()
    }
}

impl<T> Deref for FeedBlock<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for FeedBlock<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Exclusive read access to one published block, checked out by the fetcher
///
/// Dereferences to the published prefix (`available_len` elements). Mutable
/// access is provided so a partial consumer can compact unread data to the
/// front before `push_back_fetch_block`.
pub struct FetchBlock<T> {
    pub(super) data: Vec<T>,
    pub(super) available: usize,
    pub(super) pos: usize,
    pub(super) owner: u64,
}

impl<T> FetchBlock<T> {
    /// Number of published elements visible through this token
    pub fn available_len(&self) -> usize {
        self.available
    }
}

impl<T> Deref for FetchBlock<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data[..self.available]
    }
}

impl<T> DerefMut for FetchBlock<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data[..self.available]
    }
}

/// Point-in-time snapshot of an exchange buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExchangeStats {
    pub capacity: usize,
    pub block_size: usize,
    pub occupied: usize,
    pub feed_block_out: bool,
    pub fetch_block_out: bool,
    pub waiting_feeder: usize,
    pub waiting_fetcher: usize,
}
