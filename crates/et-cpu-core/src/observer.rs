//! The checker/observability hook: coherent memory accesses and
//! the store-to-L2-scratchpad path notify an [`Observer`] so that tests can
//! see the order operations actually retired in, not just their end state.
//! Everyday execution uses [`NullObserver`], which the optimizer should
//! erase entirely; tests that need to assert ordering swap in
//! [`RecordingObserver`].

use et_types::{AccessType, Agent};

/// One coherence-visible event, in the order the interpreter produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedEvent {
    /// A coherent AMO, compare-swap, or byte/halfword RMW store retired.
    /// `local` mirrors the `l`/`g` suffix: `true` is shire-local ordering,
    /// `false` is globally totally-ordered.
    CoherentAccess { agent: Agent, access: AccessType, addr: u64, local: bool, old: u64, new: u64 },
    /// A `TENSOR_STORE` write landed in L2 scratchpad rather than DRAM.
    L2ScratchpadStore { agent: Agent, shire: u8, line: u32, offset: u32, len: u32 },
}

/// Receives [`ObservedEvent`]s as the interpreter retires them. Implementors
/// must not assume events arrive in any particular batch size: each event is
/// reported as soon as its access completes.
pub trait Observer {
    fn observe(&mut self, event: ObservedEvent);
}

/// The production default: discards every event at zero cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    #[inline]
    fn observe(&mut self, _event: ObservedEvent) {}
}

/// Collects every event in arrival order, for tests that assert on
/// interleaving (e.g. the global-AMO permutation scenario).
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<ObservedEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        RecordingObserver::default()
    }
}

impl Observer for RecordingObserver {
    fn observe(&mut self, event: ObservedEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use et_types::Privilege;

    #[test]
    fn recording_observer_keeps_arrival_order() {
        let mut obs = RecordingObserver::new();
        let agent = Agent::new(0, 0, Privilege::Machine);
        obs.observe(ObservedEvent::CoherentAccess {
            agent,
            access: AccessType::AmoGlobal,
            addr: 0x1000,
            local: false,
            old: 10,
            new: 15,
        });
        obs.observe(ObservedEvent::L2ScratchpadStore { agent, shire: 0, line: 3, offset: 0, len: 64 });
        assert_eq!(obs.events.len(), 2);
        assert!(matches!(obs.events[0], ObservedEvent::CoherentAccess { old: 10, new: 15, .. }));
    }

    #[test]
    fn null_observer_drops_everything() {
        let mut obs = NullObserver;
        let agent = Agent::new(0, 0, Privilege::Machine);
        obs.observe(ObservedEvent::CoherentAccess {
            agent,
            access: AccessType::AmoLocal,
            addr: 0,
            local: true,
            old: 0,
            new: 0,
        });
    }
}
