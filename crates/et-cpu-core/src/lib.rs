//! Per-hart/per-core state and the fetch/decode/execute/trap loop. This
//! crate owns everything `et-platform`'s scheduler needs to advance a hart
//! by one step: register files, CSRs, the tensor-engine control surface,
//! and trap delivery. It has no notion of the wider system (other shires,
//! device MMIO, the scheduler's quantum bookkeeping) — those live in
//! `et-platform`, which calls [`interp::step`] once per hart per quantum.

pub mod core;
pub mod csr;
pub mod exec;
pub mod hart;
pub mod interp;
pub mod observer;
pub mod tensor_ctl;
pub mod trap;

pub use core::{Core, CoreId};
pub use exec::Outcome;
pub use hart::{Hart, HartId, HartOutcome};
pub use observer::{NullObserver, ObservedEvent, Observer, RecordingObserver};
