use bitflags::bitflags;

bitflags! {
    /// `dmctrl`/`spdmctrl` control bits, RISC-V debug spec `dmcontrol`
    /// subset actually wired by the reference model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmControl: u32 {
        const DMACTIVE          = 1 << 0;
        const NDMRESET          = 1 << 1;
        const HARTRESET         = 1 << 2;
        const HALTREQ           = 1 << 3;
        const RESUMEREQ         = 1 << 4;
        const ACKHAVERESET      = 1 << 5;
        const SETRESETHALTREQ   = 1 << 6;
        const CLRRESETHALTREQ   = 1 << 7;
    }
}

/// Per-hart debug status tracked by the debug module so `andortree{0,1,2}`
/// reads can aggregate across a selected set of harts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HartDebugStatus {
    pub halted: bool,
    pub running: bool,
    pub havereset: bool,
    pub resethaltreq: bool,
}

/// One shire's debug module: a `dmctrl` register plus the status of every
/// hart it controls. Applying a control write triggers the matching
/// reset/halt/resume transition on the selected harts, mirroring the
/// RISC-V debug spec's `dmcontrol` semantics rather than the SoC-specific
/// parts of `dmctrl`.
#[derive(Debug, Clone)]
pub struct DebugModule {
    pub control: DmControl,
    pub harts: Vec<HartDebugStatus>,
}

impl DebugModule {
    pub fn new(num_harts: usize) -> Self {
        DebugModule {
            control: DmControl::empty(),
            harts: vec![HartDebugStatus::default(); num_harts],
        }
    }

    /// Applies a `dmctrl` write, updating every hart's status per the bits
    /// that were set. `hartsel` selects which hart the request targets;
    /// `None` (broadcast) applies it to every hart in the module.
    pub fn write_control(&mut self, value: DmControl, hartsel: Option<usize>) {
        self.control = value;
        let targets: Vec<usize> = match hartsel {
            Some(i) if i < self.harts.len() => vec![i],
            Some(_) => vec![],
            None => (0..self.harts.len()).collect(),
        };
        for i in targets {
            let hart = &mut self.harts[i];
            if value.contains(DmControl::HALTREQ) {
                hart.halted = true;
                hart.running = false;
            }
            if value.contains(DmControl::RESUMEREQ) {
                hart.halted = false;
                hart.running = true;
            }
            if value.contains(DmControl::HARTRESET) || value.contains(DmControl::NDMRESET) {
                hart.havereset = true;
                hart.running = false;
                hart.halted = false;
            }
            if value.contains(DmControl::ACKHAVERESET) {
                hart.havereset = false;
            }
            if value.contains(DmControl::SETRESETHALTREQ) {
                hart.resethaltreq = true;
            }
            if value.contains(DmControl::CLRRESETHALTREQ) {
                hart.resethaltreq = false;
            }
        }
    }

    /// `andortree0`: `anyhalted`/`allhalted` aggregated over every hart.
    pub fn andortree0(&self) -> (bool, bool) {
        let any = self.harts.iter().any(|h| h.halted);
        let all = !self.harts.is_empty() && self.harts.iter().all(|h| h.halted);
        (any, all)
    }

    /// `andortree1`: `anyrunning`/`allrunning`.
    pub fn andortree1(&self) -> (bool, bool) {
        let any = self.harts.iter().any(|h| h.running);
        let all = !self.harts.is_empty() && self.harts.iter().all(|h| h.running);
        (any, all)
    }

    /// `andortree2`: `anyhavereset`/`allhavereset`.
    pub fn andortree2(&self) -> (bool, bool) {
        let any = self.harts.iter().any(|h| h.havereset);
        let all = !self.harts.is_empty() && self.harts.iter().all(|h| h.havereset);
        (any, all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haltreq_halts_selected_hart_only() {
        let mut dm = DebugModule::new(4);
        dm.write_control(DmControl::DMACTIVE | DmControl::HALTREQ, Some(2));
        assert!(dm.harts[2].halted);
        assert!(!dm.harts[0].halted);
        let (any, all) = dm.andortree0();
        assert!(any);
        assert!(!all);
    }

    #[test]
    fn broadcast_resume_sets_all_running() {
        let mut dm = DebugModule::new(3);
        dm.write_control(DmControl::RESUMEREQ, None);
        let (any, all) = dm.andortree1();
        assert!(any && all);
    }
}
