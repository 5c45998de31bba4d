//! Per-neighborhood PMU counters, grounded on `system.h`'s
//! `neigh_pmu_counters_t`/`neigh_pmu_events_t`: six configurable counters
//! per neighborhood, each counting one event per SMT thread slot across
//! the neighborhood's minions.

use et_types::topology::{THREADS_PER_MINION, THREADS_PER_NEIGH};
use serde::{Deserialize, Serialize};

pub const NUM_COUNTERS: usize = 6;

/// Event selector for one of a neighborhood's six counters. The reference
/// model's actual event encoding isn't in the retrieved sources; a handful
/// of the obviously-needed events are named explicitly and the rest are
/// carried as an opaque code so `et-cpu-core`/`et-tensor` can wire more in
/// without changing this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PmuEvent {
    Disabled,
    RetiredInstructions,
    CacheMiss,
    TensorFmaPass,
    TensorLoadBeat,
    Stall,
    Raw(u8),
}

impl PmuEvent {
    pub fn code(self) -> u8 {
        match self {
            PmuEvent::Disabled => 0,
            PmuEvent::RetiredInstructions => 1,
            PmuEvent::CacheMiss => 2,
            PmuEvent::TensorFmaPass => 3,
            PmuEvent::TensorLoadBeat => 4,
            PmuEvent::Stall => 5,
            PmuEvent::Raw(c) => c,
        }
    }
}

/// One neighborhood's PMU state: `counters[c][t]` is counter `c`'s tally
/// for minion-thread-slot `t` (`0..EMU_THREADS_PER_MINION`, summed across
/// the neighborhood's minions the way the reference struct lays it out);
/// `events[c][t]` is the per-thread event select feeding counter `c`
/// (`0..EMU_THREADS_PER_NEIGH`, one entry per thread in the neighborhood).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodPmu {
    counters: [[u64; THREADS_PER_MINION as usize]; NUM_COUNTERS],
    events: [[u8; THREADS_PER_NEIGH as usize]; NUM_COUNTERS],
}

impl NeighborhoodPmu {
    pub fn new() -> Self {
        NeighborhoodPmu {
            counters: [[0; THREADS_PER_MINION as usize]; NUM_COUNTERS],
            events: [[0; THREADS_PER_NEIGH as usize]; NUM_COUNTERS],
        }
    }

    pub fn set_event(&mut self, counter: usize, neigh_thread: usize, event: PmuEvent) {
        self.events[counter][neigh_thread] = event.code();
    }

    pub fn event(&self, counter: usize, neigh_thread: usize) -> u8 {
        self.events[counter][neigh_thread]
    }

    /// Ticks every counter whose event matches `fired`, for the minion at
    /// `minion_in_neigh` running thread slot `thread_in_minion`.
    pub fn tick(&mut self, minion_in_neigh: usize, thread_in_minion: usize, fired: PmuEvent) {
        let neigh_thread = minion_in_neigh * THREADS_PER_MINION as usize + thread_in_minion;
        for counter in 0..NUM_COUNTERS {
            if self.events[counter].get(neigh_thread).copied() == Some(fired.code()) {
                self.counters[counter][thread_in_minion] =
                    self.counters[counter][thread_in_minion].wrapping_add(1);
            }
        }
    }

    pub fn counter(&self, counter: usize, thread_in_minion: usize) -> u64 {
        self.counters[counter][thread_in_minion]
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for NeighborhoodPmu {
    fn default() -> Self {
        Self::new()
    }
}

/// All PMU state for the whole system, one [`NeighborhoodPmu`] per
/// neighborhood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmuFile {
    neighborhoods: Vec<NeighborhoodPmu>,
}

impl PmuFile {
    pub fn new(num_neighborhoods: usize) -> Self {
        PmuFile {
            neighborhoods: (0..num_neighborhoods).map(|_| NeighborhoodPmu::new()).collect(),
        }
    }

    pub fn neigh(&self, index: usize) -> &NeighborhoodPmu {
        &self.neighborhoods[index]
    }

    pub fn neigh_mut(&mut self, index: usize) -> &mut NeighborhoodPmu {
        &mut self.neighborhoods[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_increments_matching_counter_only() {
        let mut pmu = NeighborhoodPmu::new();
        pmu.set_event(0, 0, PmuEvent::RetiredInstructions);
        pmu.set_event(1, 0, PmuEvent::CacheMiss);
        pmu.tick(0, 0, PmuEvent::RetiredInstructions);
        pmu.tick(0, 0, PmuEvent::RetiredInstructions);
        assert_eq!(pmu.counter(0, 0), 2);
        assert_eq!(pmu.counter(1, 0), 0);
    }

    #[test]
    fn minions_share_thread_slot_counters() {
        let mut pmu = NeighborhoodPmu::new();
        pmu.set_event(0, 0, PmuEvent::Stall);
        pmu.set_event(0, THREADS_PER_MINION as usize, PmuEvent::Stall);
        pmu.tick(0, 0, PmuEvent::Stall);
        pmu.tick(1, 0, PmuEvent::Stall);
        assert_eq!(pmu.counter(0, 0), 2);
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut pmu = NeighborhoodPmu::new();
        pmu.set_event(0, 0, PmuEvent::RetiredInstructions);
        pmu.tick(0, 0, PmuEvent::RetiredInstructions);
        pmu.reset();
        assert_eq!(pmu.counter(0, 0), 0);
    }

    #[test]
    fn pmu_file_indexes_by_neighborhood() {
        let mut file = PmuFile::new(4);
        file.neigh_mut(2).set_event(0, 0, PmuEvent::CacheMiss);
        file.neigh_mut(2).tick(0, 0, PmuEvent::CacheMiss);
        assert_eq!(file.neigh(2).counter(0, 0), 1);
        assert_eq!(file.neigh(0).counter(0, 0), 0);
    }
}
