//! `TensorWait`: parks a hart until one of the named tensor resources
//! retires. The scheduler (`et-platform`) is what actually
//! suspends/wakes the hart; this module only tracks resource busy/idle
//! state and decides whether a wait should complete immediately.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitTarget {
    TensorLoad(u8),
    TensorLoadL2(u8),
    Prefetch(u8),
    CacheOp,
    TensorFma,
    TensorStore,
    TensorReduce,
    TensorQuant,
}

/// Per-hart `TensorWait` state. `TxFma` is a distinct waiting state from
/// plain `Wait` because a `TensorFMA` with `tenb=1` sleeps on a different
/// handshake (the paired TenB load retiring) than an ordinary resource
/// wait, matching "TensorFMA with tenb=1 likewise sleeps".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Wait,
    WaitReady,
    TxFma,
}

/// Tracks which tensor resources are currently busy. A resource starts an
/// operation with [`ResourceTracker::begin`] and retires it with
/// [`ResourceTracker::retire`]; [`ResourceTracker::poll`] is what
/// `TensorWait`'s start sequence consults.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    busy: std::collections::HashSet<WaitTarget>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, target: WaitTarget) {
        self.busy.insert(target);
    }

    pub fn retire(&mut self, target: WaitTarget) {
        self.busy.remove(&target);
    }

    pub fn is_busy(&self, target: WaitTarget) -> bool {
        self.busy.contains(&target)
    }

    /// Decides the immediate outcome of a `TensorWait` on `target`: ready
    /// resources transition straight back to `Idle`; a busy one parks the
    /// hart in `Wait` for the scheduler to resume later.
    pub fn poll(&self, target: WaitTarget) -> State {
        if self.is_busy(target) {
            State::Wait
        } else {
            State::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_resource_completes_wait_immediately() {
        let tracker = ResourceTracker::new();
        assert_eq!(tracker.poll(WaitTarget::TensorFma), State::Idle);
    }

    #[test]
    fn busy_resource_parks_the_wait() {
        let mut tracker = ResourceTracker::new();
        tracker.begin(WaitTarget::TensorLoad(0));
        assert_eq!(tracker.poll(WaitTarget::TensorLoad(0)), State::Wait);
        assert_eq!(tracker.poll(WaitTarget::TensorLoad(1)), State::Idle);
    }

    #[test]
    fn retiring_unblocks_subsequent_polls() {
        let mut tracker = ResourceTracker::new();
        tracker.begin(WaitTarget::TensorQuant);
        tracker.retire(WaitTarget::TensorQuant);
        assert_eq!(tracker.poll(WaitTarget::TensorQuant), State::Idle);
    }
}
