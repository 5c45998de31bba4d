//! Cooperative tensor-load gating and TenB/TensorFMA pairing (spec
//! §4.6.1/§4.6.4): a cooperative `TensorLoad` registers with a group keyed
//! by `coop_id`, and a `TensorWait` on that id blocks until every hart in
//! the group's `{minion_mask, neigh_mask}` has posted.

use crate::error::TensorError;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
struct CoopGroup {
    minion_mask: u64,
    neigh_mask: u32,
    posted: HashSet<u32>,
}

/// Tracks in-flight cooperative tensor loads, one group per `coop_id`.
#[derive(Debug, Clone, Default)]
pub struct CoopTracker {
    groups: HashMap<u8, CoopGroup>,
}

impl CoopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `minion_id` has posted for `coop_id`, creating the
    /// group (and pinning its expected mask) on the first post.
    pub fn post(&mut self, coop_id: u8, minion_mask: u64, neigh_mask: u32, minion_id: u32) {
        let group = self.groups.entry(coop_id).or_insert_with(|| CoopGroup {
            minion_mask,
            neigh_mask,
            posted: HashSet::new(),
        });
        group.posted.insert(minion_id);
    }

    /// Whether every minion named in the group's mask has posted.
    pub fn all_posted(&self, coop_id: u8) -> bool {
        match self.groups.get(&coop_id) {
            Some(group) => {
                let expected = (0..64).filter(|bit| group.minion_mask & (1 << bit) != 0).count();
                group.posted.len() >= expected && expected > 0
            }
            None => false,
        }
    }

    pub fn clear(&mut self, coop_id: u8) {
        self.groups.remove(&coop_id);
    }
}

/// A single core's pending "setupb" `TensorLoad`, staged for a later
/// `TensorFMA(tenb=1)` to consume as its B operand.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenBPairing {
    pending: Option<(u8, u8)>, // (rows, cols)
}

impl TenBPairing {
    pub fn register_setupb(&mut self, rows: u8, cols: u8) {
        self.pending = Some((rows, cols));
    }

    /// Consumes the pending setupb load for a `TensorFMA(tenb=1)` whose
    /// shape is `(rows, cols)`. A shape mismatch, or no pending load at
    /// all, is `tensor_error.6`.
    pub fn consume(&mut self, rows: u8, cols: u8) -> Result<(), TensorError> {
        match self.pending.take() {
            Some((r, c)) if r == rows && c == cols => Ok(()),
            _ => Err(TensorError::TENB_MISMATCH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_completes_once_every_minion_posts() {
        let mut tracker = CoopTracker::new();
        let mask = 0b011;
        tracker.post(0, mask, 0, 0);
        assert!(!tracker.all_posted(0));
        tracker.post(0, mask, 0, 1);
        assert!(tracker.all_posted(0));
    }

    #[test]
    fn tenb_pairing_matches_shape() {
        let mut pairing = TenBPairing::default();
        pairing.register_setupb(4, 4);
        assert!(pairing.consume(4, 4).is_ok());
    }

    #[test]
    fn tenb_pairing_orphaned_errors() {
        let mut pairing = TenBPairing::default();
        assert_eq!(pairing.consume(4, 4), Err(TensorError::TENB_MISMATCH));
    }

    #[test]
    fn tenb_pairing_shape_mismatch_errors() {
        let mut pairing = TenBPairing::default();
        pairing.register_setupb(4, 4);
        assert_eq!(pairing.consume(4, 8), Err(TensorError::TENB_MISMATCH));
    }
}
