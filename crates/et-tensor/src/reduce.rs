//! `TensorReduce`: recursive-halving send/recv/broadcast/reduce over
//! minion index within a shire.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    FAdd,
    FMax,
    FMin,
    IAdd,
    IMax,
    IMin,
    /// Replaces the destination lane outright rather than combining.
    FGet,
}

impl ReduceOp {
    /// Combines `dest ⊕ src`, both given as raw 32-bit lane bits
    /// (reinterpreted as `f32` or `i32` depending on the op).
    pub fn combine(self, dest: u32, src: u32) -> u32 {
        match self {
            ReduceOp::FGet => src,
            ReduceOp::FAdd => et_softfloat::f32_add(f32::from_bits(dest), f32::from_bits(src)).to_bits(),
            ReduceOp::FMax => et_softfloat::f32_max_num(f32::from_bits(dest), f32::from_bits(src)).to_bits(),
            ReduceOp::FMin => et_softfloat::f32_min_num(f32::from_bits(dest), f32::from_bits(src)).to_bits(),
            ReduceOp::IAdd => ((dest as i32).wrapping_add(src as i32)) as u32,
            ReduceOp::IMax => ((dest as i32).max(src as i32)) as u32,
            ReduceOp::IMin => ((dest as i32).min(src as i32)) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceKind {
    Send,
    Recv,
    Broadcast,
    Reduce,
}

/// Per-minion state for the current reduce/broadcast step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Send,
    Recv,
    Skip,
}

/// Determines a minion's role at recursive-halving level `level`: the
/// receiver is the one whose index is `0 mod 2^(level+1)`, the sender is
/// the partner `2^level` lanes above it, everyone else sits this level out.
pub fn role_at_level(minion: u32, level: u32) -> State {
    let span = 1u32 << (level + 1);
    let half = 1u32 << level;
    if minion % span == 0 {
        State::Recv
    } else if minion % span == half {
        State::Send
    } else {
        State::Skip
    }
}

/// Transfers `sender_regs` into `receiver_regs` via `op`, truncating to the
/// shorter of the two register counts on a mismatch (spec: "mismatched
/// counts warn; the receiver truncates").
pub fn transfer(op: ReduceOp, sender_regs: &[u32], receiver_regs: &mut [u32]) {
    if sender_regs.len() != receiver_regs.len() {
        tracing::warn!(
            sent = sender_regs.len(),
            expected = receiver_regs.len(),
            "tensor reduce register count mismatch"
        );
    }
    let n = sender_regs.len().min(receiver_regs.len());
    for i in 0..n {
        receiver_regs[i] = op.combine(receiver_regs[i], sender_regs[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level0_pairs_adjacent_minions() {
        assert_eq!(role_at_level(0, 0), State::Recv);
        assert_eq!(role_at_level(1, 0), State::Send);
        assert_eq!(role_at_level(2, 0), State::Recv);
        assert_eq!(role_at_level(3, 0), State::Send);
    }

    #[test]
    fn level1_groups_by_four() {
        assert_eq!(role_at_level(0, 1), State::Recv);
        assert_eq!(role_at_level(1, 1), State::Skip);
        assert_eq!(role_at_level(2, 1), State::Send);
        assert_eq!(role_at_level(3, 1), State::Skip);
    }

    #[test]
    fn fadd_combines_float_lanes() {
        let dest = 1.0f32.to_bits();
        let src = 2.0f32.to_bits();
        let result = ReduceOp::FAdd.combine(dest, src);
        assert_eq!(f32::from_bits(result), 3.0);
    }

    #[test]
    fn fget_replaces_destination() {
        let result = ReduceOp::FGet.combine(1.0f32.to_bits(), 9.0f32.to_bits());
        assert_eq!(f32::from_bits(result), 9.0);
    }

    #[test]
    fn transfer_truncates_on_mismatch() {
        let sender = [1, 2, 3];
        let mut receiver = [10, 20];
        transfer(ReduceOp::IAdd, &sender, &mut receiver);
        assert_eq!(receiver, [11, 22]);
    }
}
