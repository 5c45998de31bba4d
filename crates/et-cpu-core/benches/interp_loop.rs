use criterion::{criterion_group, criterion_main, Criterion};
use et_cpu_core::core::{Core, CoreId};
use et_cpu_core::hart::{Hart, HartId};
use et_cpu_core::interp;
use et_cpu_core::observer::NullObserver;
use et_mem::MemoryBus;

/// `addi x5, x0, 1`, repeated: a minimal hot-loop workload that exercises
/// fetch, decode, and the integer-arithmetic dispatch path without ever
/// trapping or branching.
fn bench_addi_step(c: &mut Criterion) {
    let mut mem = MemoryBus::new(1024 * 1024);
    mem.write(
        et_types::Agent::new(0, 0, et_types::Privilege::Machine),
        et_types::AccessType::Store,
        0,
        &0x0010_0293u32.to_le_bytes(),
    )
    .unwrap();

    let mut hart = Hart::new(HartId { shire: 0, thread: 0 });
    let mut core = Core::new(CoreId { shire: 0, index: 0 });
    let mut observer = NullObserver;

    c.bench_function("interp_step_addi", |b| {
        b.iter(|| {
            hart.pc = 0;
            interp::step(&mut hart, &mut core, &mut mem, &mut observer)
        })
    });
}

criterion_group!(benches, bench_addi_step);
criterion_main!(benches);
