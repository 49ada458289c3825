//! Appliance state machine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tvctl_core::ApplianceState;
use tvctl_protocol::Command;

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    group.throughput(Throughput::Elements(1));

    group.bench_function("toggle", |b| {
        let mut state = ApplianceState::new();
        b.iter(|| black_box(state.execute(Command::TurnOnOrOff)));
    });

    group.bench_function("channel_up", |b| {
        let mut state = ApplianceState::new();
        state.execute(Command::TurnOn);
        b.iter(|| black_box(state.execute(Command::ChannelUp)));
    });

    group.bench_function("help", |b| {
        let mut state = ApplianceState::new();
        b.iter(|| black_box(state.execute(Command::Help)));
    });

    group.finish();
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
