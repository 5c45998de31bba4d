use criterion::{criterion_group, criterion_main, Criterion};
use et_mmu::{translate_address, TranslationContext, TranslationState};
use et_types::{AccessType, Agent, Privilege};

fn bench_bare_translate(c: &mut Criterion) {
    let state = TranslationState::bare();
    let ctx = TranslationContext {
        privilege: Privilege::Machine,
        access: AccessType::Load,
        mxr: false,
        sum: false,
    };
    let mut mem = et_mem::MemoryBus::new(1024 * 1024);
    let agent = Agent::new(0, 0, Privilege::Machine);

    c.bench_function("translate_bare", |b| {
        b.iter(|| translate_address(&state, &ctx, 0x1000, 8, &mut mem, agent))
    });
}

criterion_group!(benches, bench_bare_translate);
criterion_main!(benches);
