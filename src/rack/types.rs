/*!
 * Rack Types
 * Slot storage shared by the scatter and gather rings, plus stats
 */

use crate::core::types::{Flag, SeqIndex};
use serde::{Deserialize, Serialize};

/// Fixed physical storage position holding at most one in-flight payload
///
/// `payload == None` means the slot is empty; `index` and `flag` are only
/// meaningful while occupied.
pub(super) struct Slot<T> {
    pub payload: Option<T>,
    pub index: SeqIndex,
    pub flag: Flag,
}

impl<T> Slot<T> {
    pub fn new(flag: Flag) -> Self {
        Self {
            payload: None,
            index: 0,
            flag,
        }
    }
}

/// Point-in-time snapshot of a scatter or gather ring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RackStats {
    pub capacity: usize,
    pub occupied: usize,
    /// Next sequence index the producing side will assign (scatter only;
    /// mirrors the watermark on the gather side)
    pub next_index: SeqIndex,
    /// Next sequence index the consuming side will yield
    pub watermark: SeqIndex,
    pub waiting_consumers: usize,
    pub waiting_producers: usize,
}
