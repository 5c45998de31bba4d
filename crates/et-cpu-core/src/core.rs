//! Shared per-core state: the two harts forming an SMT pair share
//! one MMU root, one pair of cache-control CSRs, the exclusive-mode latch,
//! and all tensor-engine state. Modelling these fields once on `Core` rather
//! than once per `Hart` is what gives "sibling propagation" for free — a
//! write from either hart is immediately visible to the other because both
//! point at the same `Core`.

use crate::tensor_ctl::TensorStaging;
use et_mmu::TranslationState;
use et_tensor::TensorUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreId {
    pub shire: u8,
    pub index: u8,
}

pub struct Core {
    pub id: CoreId,
    /// `matp`-driven M-mode translation root, shared by both sibling harts.
    pub matp: TranslationState,
    pub mcache_control: u64,
    pub ucache_control: u64,
    pub menable_shadows: u64,
    /// Set by a write to `EXCL_MODE`; while set, coherent local atomics on
    /// this core run with global ordering instead.
    pub excl_mode: bool,
    pub tensor: TensorUnit,
    pub tensor_staging: TensorStaging,
    pub shire_cooperative: bool,
}

impl Core {
    pub fn new(id: CoreId) -> Self {
        Core {
            id,
            matp: TranslationState::bare(),
            mcache_control: 0,
            ucache_control: 0,
            menable_shadows: 0,
            excl_mode: false,
            tensor: TensorUnit::new(),
            tensor_staging: TensorStaging::default(),
            shire_cooperative: false,
        }
    }

    pub fn set_excl_mode(&mut self, value: u64) {
        self.excl_mode = value & 1 != 0;
    }
}
